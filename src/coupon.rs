use regex::Regex;
use std::sync::OnceLock;

/// Keyword is case-insensitive; the code token itself must be uppercase
/// letters or digits, at least four of them, ending on a word boundary.
///
/// The token stays case-sensitive so that `"no code here"` is not a coupon
/// (`here` would otherwise pass as a code). As a consequence mixed-case codes
/// such as `"Code: Save2024"` are not detected.
const COUPON_PATTERN: &str = r"(?i:\b(?:cupom|código|code))[:\s]*([A-Z0-9]{4,})\b";

fn coupon_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(COUPON_PATTERN).expect("coupon pattern is valid"))
}

/// Return the first coupon code found in `text`, if any.
pub fn extract(text: &str) -> Option<&str> {
    coupon_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Whether `text` carries a coupon code marker.
pub fn detect(text: &str) -> bool {
    extract(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_keyword_with_colon() {
        assert!(detect("Use cupom: SAVE20"));
        assert_eq!(extract("Use cupom: SAVE20"), Some("SAVE20"));
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        assert!(detect("CODE ABC1"));
        assert!(detect("Code: 1234"));
        assert!(detect("CÓDIGO XYZ9 vale até domingo"));
        assert!(detect("código:DESC10"));
    }

    #[test]
    fn test_lowercase_token_does_not_match() {
        assert!(!detect("no code here"));
        assert!(!detect("cupom save20"));
        assert!(!detect("Code: Save2024"));
        assert!(detect("Code: SAVE2024"));
    }

    #[test]
    fn test_token_needs_four_characters() {
        assert!(!detect("cupom AB1"));
        assert!(detect("cupom AB12"));
    }

    #[test]
    fn test_separators_are_optional_and_repeatable() {
        assert!(detect("code1234"));
        assert!(detect("cupom : \t PROMO2024"));
        assert_eq!(extract("cupom : \t PROMO2024"), Some("PROMO2024"));
    }

    #[test]
    fn test_keyword_needs_word_boundary() {
        assert!(!detect("promocode SAVE20"));
        assert!(!detect("barcode ABCD"));
    }

    #[test]
    fn test_token_must_end_on_word_boundary() {
        assert!(!detect("cupom SAVE20off"));
        assert!(detect("cupom SAVE20!"));
    }

    #[test]
    fn test_unrelated_or_empty_text() {
        assert!(!detect(""));
        assert!(!detect("discount ABCD"));
        assert!(!detect("🎉🎉 obrigado! 🎉🎉"));
    }

    #[test]
    fn test_match_later_in_text() {
        let text = "Amei a loja 😍 e ainda ganhei o código BEMVINDA15 na primeira compra";
        assert_eq!(extract(text), Some("BEMVINDA15"));
    }
}
