//! Tag normalization shared by upload and update.

/// Split a comma separated tag list into trimmed, lowercase, non-empty tags.
pub fn parse_manual_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Union of manual and detected tags, lowercased and de-duplicated.
///
/// Manual tags come first; the first occurrence of each tag keeps its position.
pub fn merge_tags<I, J>(manual: I, detected: J) -> Vec<String>
where
    I: IntoIterator<Item = String>,
    J: IntoIterator<Item = String>,
{
    let mut merged: Vec<String> = Vec::new();
    for tag in manual.into_iter().chain(detected) {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !merged.contains(&tag) {
            merged.push(tag);
        }
    }
    merged
}

/// Normalize a raw manual tag string into a de-duplicated tag list.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    merge_tags(parse_manual_tags(raw), std::iter::empty())
}
