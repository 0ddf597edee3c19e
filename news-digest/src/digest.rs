use crate::types::{DigestItem, Result};
use crate::utils::time::parse_pub_date;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use tracing::info;

/// Newest first. Items whose `pubDate` does not parse go after every dated
/// item and keep their acceptance order among themselves.
pub fn rank(mut items: Vec<DigestItem>) -> Vec<DigestItem> {
    items.sort_by(|a, b| {
        match (parse_pub_date(&a.pub_date), parse_pub_date(&b.pub_date)) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    items
}

/// Serialize the digest as a pretty JSON array, replacing whatever is at `path`
pub fn write_digest(path: &Path, items: &[DigestItem]) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    fs::write(path, json)?;
    info!("Wrote {} digest items to {}", items.len(), path.display());
    Ok(())
}

/// Rank then write
pub fn finalize(path: &Path, items: Vec<DigestItem>) -> Result<Vec<DigestItem>> {
    let ranked = rank(items);
    write_digest(path, &ranked)?;
    Ok(ranked)
}
