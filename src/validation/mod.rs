/*!
 * Checks that a model reply is a translation and not something else.
 *
 * - `markers`: per-language marker word tables and marker-based detection
 * - `translation`: acceptance rules for a single translated chunk
 */

pub mod markers;
pub mod translation;

pub use markers::{DetectedLanguage, LanguageMarkerDetector, LanguageMarkerTable, MarkerMatch};
pub use translation::{Rejection, TranslationValidator, ValidationConfig};
