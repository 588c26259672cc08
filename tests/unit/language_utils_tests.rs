/*!
 * Tests for ISO language code utilities
 */

use booktrans::language_utils::{
    display_name, get_language_name, language_codes_match, normalize_code, validate_language_code,
};

#[test]
fn test_validateLanguageCode_withValidCodes_shouldSucceed() {
    for code in ["en", "EN", "eng", "fre", "fra", "de", "ger", "zh", "ja"] {
        assert!(validate_language_code(code).is_ok(), "{} should be valid", code);
    }
}

#[test]
fn test_validateLanguageCode_withInvalidCodes_shouldFail() {
    for code in ["", "x", "zz9", "english", "x1y"] {
        assert!(validate_language_code(code).is_err(), "{} should be invalid", code);
    }
}

#[test]
fn test_normalizeCode_shouldPreferTwoLetterCodes() {
    assert_eq!(normalize_code("spa").unwrap(), "es");
    assert_eq!(normalize_code("dut").unwrap(), "nl");
    assert!(normalize_code("zz9").is_err());
}

#[test]
fn test_languageCodesMatch_shouldCompareAcrossForms() {
    assert!(language_codes_match("de", "ger"));
    assert!(language_codes_match("es", "SPA"));
    assert!(!language_codes_match("es", "pt"));
    assert!(!language_codes_match("es", "unknown"));
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("es").unwrap(), "Spanish");
    assert_eq!(get_language_name("ger").unwrap(), "German");
    assert_eq!(display_name("q9"), "q9");
}
