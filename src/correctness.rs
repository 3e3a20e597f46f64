//! Answer verification.

/// Compares an answer with the expected answer, if one is recorded.
///
/// `None` means nothing is known yet. Comparison is exact: no trimming, no numeric coercion.
pub fn classify(answer: &str, expected: Option<&str>) -> Option<bool> {
    expected.map(|expected| expected == answer)
}

#[cfg(test)]
mod tests {
    use super::classify;

    #[test]
    fn three_states() {
        assert_eq!(classify("142", Some("142")), Some(true));
        assert_eq!(classify("141", Some("142")), Some(false));
        assert_eq!(classify("142", None), None);
    }

    #[test]
    fn exact_string_equality() {
        assert_eq!(classify("142 ", Some("142")), Some(false));
        assert_eq!(classify("0142", Some("142")), Some(false));
        assert_eq!(classify("", Some("142")), Some(false));
    }
}
