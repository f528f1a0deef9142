//! Comment markers embedded in catalog column comments

/// Excludes the column from generation
pub const DEPRECATED: &str = "@deprecated";

/// Adds an `i18n` tag carrying the column name
pub const I18N: &str = "@i18n";

/// Case-insensitive substring test for a marker inside a comment
pub fn has_marker(comment: &str, marker: &str) -> bool {
    if marker.is_empty() {
        return false;
    }
    comment.to_lowercase().contains(&marker.to_lowercase())
}
