//! Display language preference.
//!
//! Only the preference is handled here: which language is active and where
//! that choice came from. Messages themselves are English.

use std::env;

use log::debug;

use crate::config::{Config, ConfigStore};
use crate::error::{Error, Result};

/// Supported language codes with their native names
pub const SUPPORTED_LANGUAGES: [(&str, &str); 3] =
    [("en", "English"), ("zh", "中文"), ("ja", "日本語")];
pub const DEFAULT_LANGUAGE: &str = "en";

/// Overrides the language detected from the locale
pub const LANGUAGE_OVERRIDE_ENV: &str = "QUICK_SH_LANG";
const LOCALE_ENV_VARS: [&str; 4] = ["LC_ALL", "LC_MESSAGES", "LANG", "LANGUAGE"];

#[must_use]
pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(supported, _)| *supported == code)
}

#[must_use]
pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(supported, _)| *supported == code)
        .map(|(_, name)| *name)
}

fn supported_list() -> String {
    SUPPORTED_LANGUAGES
        .iter()
        .map(|(code, _)| *code)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Maps a locale string such as `zh_CN.UTF-8` to a supported code.
#[must_use]
pub fn language_from_locale(locale: &str) -> &'static str {
    let prefix = locale
        .split(['_', '.', '-'])
        .next()
        .unwrap_or_default()
        .to_lowercase();

    match prefix.as_str() {
        "en" | "english" => "en",
        "zh" | "chinese" => "zh",
        "ja" | "japanese" => "ja",
        _ => DEFAULT_LANGUAGE,
    }
}

fn detect_from<F>(lookup: F) -> &'static str
where
    F: Fn(&str) -> Option<String>,
{
    let locale = std::iter::once(LANGUAGE_OVERRIDE_ENV)
        .chain(LOCALE_ENV_VARS)
        .find_map(|name| lookup(name).filter(|value| !value.is_empty()));

    match locale {
        Some(locale) => {
            debug!("Detected locale `{locale}`");
            language_from_locale(&locale)
        }
        None => DEFAULT_LANGUAGE,
    }
}

/// Detects the language from the environment.
#[must_use]
pub fn detect_system_language() -> &'static str {
    detect_from(|name| env::var(name).ok())
}

/// Where the active language came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageSource {
    Configured,
    Detected,
}

/// The language in effect for `config`.
///
/// A stored but unsupported preference is ignored in favour of detection.
#[must_use]
pub fn current_language(config: &Config) -> (String, LanguageSource) {
    match config.language.as_deref().filter(|code| is_supported(code)) {
        Some(code) => (code.to_string(), LanguageSource::Configured),
        None => (
            detect_system_language().to_string(),
            LanguageSource::Detected,
        ),
    }
}

/// Stores `code` as the preferred language.
///
/// # Errors
///
/// - [`Error::UnsupportedLanguage`] if `code` is not supported
/// - errors from [`ConfigStore::write`]
pub fn set_language(store: &ConfigStore, code: &str) -> Result<()> {
    if !is_supported(code) {
        return Err(Error::UnsupportedLanguage {
            given: code.to_string(),
            supported: supported_list(),
        });
    }

    let mut config = store.read();
    config.language = Some(code.to_string());
    store.write(&config)
}
