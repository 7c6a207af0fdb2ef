//! Bundled default content: configuration defaults, localized texts and the
//! system submission statuses, read from the `locales/` files.

use anyhow::Result;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

/// Structured defaults the normalizer reconciles a database against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppData {
    /// Every known tenant configuration key with its default value.
    pub config: Vec<(String, serde_json::Value)>,
    /// Keys stored per language in `ConfigL10N`.
    pub localized_keys: Vec<String>,
    /// language → key → text
    pub localized: BTreeMap<String, BTreeMap<String, String>>,
    pub submission_statuses: Vec<StatusDefault>,
}

impl AppData {
    pub fn config_default(&self, key: &str) -> Option<&serde_json::Value> {
        self.config.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_known_config_key(&self, key: &str) -> bool {
        self.config_default(key).is_some()
    }

    /// Localized default for `key` in `lang`, falling back to English.
    pub fn localized_text(&self, lang: &str, key: &str) -> Option<&str> {
        self.localized
            .get(lang)
            .or_else(|| self.localized.get("en"))
            .and_then(|texts| texts.get(key))
            .map(String::as_str)
    }
}

/// A status every tenant must carry.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusDefault {
    pub system_usage: String,
    pub presentation_order: i64,
    /// language → label
    pub label: serde_json::Value,
}

/// Source of default content and of the languages the running release
/// ships translations for.
pub trait DefaultsProvider: Send + Sync {
    fn load_defaults(&self) -> Result<AppData>;

    fn supported_language_codes(&self) -> BTreeSet<String>;
}

pub const LOCALIZED_KEYS: [&str; 4] = [
    "header_title_homepage",
    "presentation",
    "footer",
    "disclaimer_text",
];

pub const SYSTEM_STATUSES: [&str; 3] = ["new", "opened", "closed"];

/// Defaults compiled into the binary from the `locales/` directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledDefaults;

impl DefaultsProvider for BundledDefaults {
    fn load_defaults(&self) -> Result<AppData> {
        let languages = self.supported_language_codes();

        let localized = languages
            .iter()
            .map(|lang| {
                let texts = LOCALIZED_KEYS
                    .iter()
                    .map(|key| ((*key).to_string(), localized_default(lang, key)))
                    .collect();
                (lang.clone(), texts)
            })
            .collect();

        Ok(AppData {
            config: config_defaults(),
            localized_keys: LOCALIZED_KEYS.iter().map(ToString::to_string).collect(),
            localized,
            submission_statuses: system_statuses(&languages),
        })
    }

    fn supported_language_codes(&self) -> BTreeSet<String> {
        rust_i18n::available_locales!()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }
}

fn config_defaults() -> Vec<(String, serde_json::Value)> {
    [
        ("name", json!("")),
        ("default_language", json!("en")),
        ("enable_signup", json!(false)),
        ("threshold", json!(0)),
        ("two_factor_required", json!(false)),
        ("version", json!("")),
        ("latest_version", json!("")),
        ("version_db", json!(0)),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

fn localized_default(lang: &str, key: &str) -> String {
    let text = match key {
        "header_title_homepage" => t!("defaults.header_title_homepage", locale = lang),
        "presentation" => t!("defaults.presentation", locale = lang),
        "footer" => t!("defaults.footer", locale = lang),
        "disclaimer_text" => t!("defaults.disclaimer_text", locale = lang),
        _ => return String::new(),
    };
    text.into_owned()
}

fn status_label(lang: &str, usage: &str) -> String {
    let text = match usage {
        "new" => t!("statuses.new", locale = lang),
        "opened" => t!("statuses.opened", locale = lang),
        "closed" => t!("statuses.closed", locale = lang),
        _ => return usage.to_string(),
    };
    text.into_owned()
}

/// The system-defined submission statuses labelled in every given language.
pub fn system_statuses(languages: &BTreeSet<String>) -> Vec<StatusDefault> {
    SYSTEM_STATUSES
        .iter()
        .zip(0_i64..)
        .map(|(usage, order)| {
            let label: serde_json::Map<String, serde_json::Value> = languages
                .iter()
                .map(|lang| (lang.clone(), json!(status_label(lang, usage))))
                .collect();
            StatusDefault {
                system_usage: (*usage).to_string(),
                presentation_order: order,
                label: serde_json::Value::Object(label),
            }
        })
        .collect()
}
