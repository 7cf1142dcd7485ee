//! Cache key construction.

/// Separator placed between key parts.
pub const KEY_DELIMITER: &str = ":";

/// Joins identifying parts into one cache key, e.g. `["product", "42"]`
/// becomes `"product:42"`.
///
/// Keys are compared by exact match, so callers should build every key for
/// a resource through this helper.
pub fn cache_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            key.push_str(KEY_DELIMITER);
        }
        key.push_str(part.as_ref());
    }
    key
}
