/// Collapse whitespace runs to single spaces, trim and lower-case.
///
/// This is the cache key and comparison form used by the extractors and the
/// validator.
pub fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Document ids replace whitespace runs with a single underscore.
pub fn normalize_doc_id(doc_id: &str) -> String {
    doc_id.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_lowercases() {
        assert_eq!(normalize_text("  Senior   Software\n Engineer "), "senior software engineer");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn doc_ids_use_underscores() {
        assert_eq!(normalize_doc_id("John  Doe CV"), "John_Doe_CV");
        assert_eq!(normalize_doc_id("single"), "single");
    }
}
