//! Language detection for ad copy.
//!
//! Wraps `whatlang` trigram detection and reports two-letter ISO 639-1 codes
//! (`en`, `es`, ...) through `isolang`. A language with no two-letter code
//! (`cmn`, `pes`) keeps its ISO 639-3 code. Empty text or text without enough
//! signal yields `"undetected"`.

use isolang::Language;

use crate::config::UNDETECTED_LANG;

fn to_iso_639_1(code: &str) -> String {
    Language::from_639_3(code)
        .and_then(|lang| lang.to_639_1())
        .unwrap_or(code)
        .to_string()
}

pub fn detect_language(text: &str) -> String {
    if text.trim().is_empty() {
        return UNDETECTED_LANG.to_string();
    }

    whatlang::detect(text)
        .map(|info| to_iso_639_1(info.lang().code()))
        .unwrap_or_else(|| UNDETECTED_LANG.to_string())
}
