/*!
 * Tests for language markers and the translation validator
 */

use booktrans::validation::{
    LanguageMarkerDetector, LanguageMarkerTable, Rejection, TranslationValidator, ValidationConfig,
};

const ENGLISH: &str = "The old man walked slowly to the house at the end of the road, and he thought about all of the years that had passed since his youth.";
const SPANISH: &str = "El anciano caminó despacio hasta la casa al final del camino, y pensó en todos los años que habían pasado desde su juventud.";

#[test]
fn test_isLikelyTranslated_withRealTranslation_shouldAccept() {
    let validator = TranslationValidator::default();
    assert!(validator.is_likely_translated(ENGLISH, SPANISH, "en", "es"));
}

#[test]
fn test_check_withSourceEcho_shouldRejectAsIdentical() {
    let validator = TranslationValidator::default();
    let echoed = format!("  {}  ", ENGLISH.to_uppercase());
    assert_eq!(
        validator.check(ENGLISH, &echoed, "en", "es"),
        Err(Rejection::IdenticalToSource)
    );
}

#[test]
fn test_check_withEmptyCandidate_shouldReject() {
    let validator = TranslationValidator::default();
    assert_eq!(validator.check(ENGLISH, " \n ", "en", "es"), Err(Rejection::Empty));
}

#[test]
fn test_check_withShortCandidate_shouldAcceptUnjudged() {
    let validator = TranslationValidator::default();
    assert!(validator.check("Hello.", "Hello.", "en", "es").is_ok());
}

#[test]
fn test_check_withSameLanguagePair_shouldAccept() {
    let validator = TranslationValidator::default();
    assert!(validator.check(ENGLISH, ENGLISH, "en", "eng").is_ok());
}

#[test]
fn test_check_withLightEdit_shouldRejectAsTooSimilar() {
    let validator = TranslationValidator::default();
    let lightly_edited = ENGLISH.replace("old man", "elderly gentleman");
    assert!(matches!(
        validator.check(ENGLISH, &lightly_edited, "en", "es"),
        Err(Rejection::TooSimilar { .. })
    ));
}

#[test]
fn test_check_withLooserThreshold_shouldStillCatchResidualEnglish() {
    let config = ValidationConfig::default().with_similarity_threshold(1.0);
    let validator = TranslationValidator::new(config);
    let lightly_edited = ENGLISH.replace("old man", "elderly gentleman");

    assert!(matches!(
        validator.check(ENGLISH, &lightly_edited, "en", "es"),
        Err(Rejection::ResidualSourceLanguage { .. })
    ));
}

#[test]
fn test_readsAsLanguage_shouldTellEnglishFromSpanish() {
    let validator = TranslationValidator::default();
    assert!(validator.reads_as_language(ENGLISH, "en"));
    assert!(!validator.reads_as_language(SPANISH, "en"));
    assert!(!validator.reads_as_language(ENGLISH, "xx"));
}

#[test]
fn test_detectLanguage_withSpanishText_shouldPickSpanish() {
    let detector = LanguageMarkerDetector::new();
    let detected = detector.detect_language(SPANISH, None);

    assert_eq!(detected.code, "es");
    assert!(detected.confidence > 0.0 && detected.confidence <= 1.0);
}

#[test]
fn test_detectLanguage_withCandidates_shouldOnlyConsiderThem() {
    let detector = LanguageMarkerDetector::new();
    let detected = detector.detect_language(SPANISH, Some(&["en", "de"]));
    assert_ne!(detected.code, "es");
}

#[test]
fn test_detectLanguage_withNoMarkers_shouldBeUnknown() {
    let detector = LanguageMarkerDetector::new();
    let detected = detector.detect_language("12345 67890", None);

    assert!(!detected.is_known());
    assert_eq!(detected.confidence, 0.0);
}

#[test]
fn test_supportedCodes_shouldIncludeCoreLanguages() {
    let codes = LanguageMarkerTable::supported_codes();
    for code in ["en", "es", "fr", "de"] {
        assert!(codes.contains(&code), "missing {}", code);
    }
}

#[test]
fn test_allTables_shouldMarkCjkAsCharacterBased() {
    let tables = LanguageMarkerTable::all();
    assert_eq!(tables.len(), LanguageMarkerTable::supported_codes().len());

    for table in tables {
        let expected = matches!(table.code, "zh" | "ja" | "ko");
        assert_eq!(table.is_character_based(), expected, "wrong script for {}", table.code);
    }
}
