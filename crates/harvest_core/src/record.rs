//! Catalog records and the English-locale filter/normalizer.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An open field-name → value mapping as returned by the catalog API.
pub type Record = Map<String, Value>;

pub const ENGLISH_SUFFIX: &str = "_en";
pub const ENGLISH_MARKER: &str = "en";

/// Probed in order; only the first one present is forced to English.
const LANGUAGE_FIELDS: [&str; 3] = ["language", "lang", "locale"];

/// Always take the English variant for these, even if a base value exists.
const PRIMARY_FIELDS: [&str; 5] = ["title", "name", "description", "category", "brand"];

/// Which records are eligible for the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocaleFilter {
    /// Every record is kept; the English signal is only reported.
    #[default]
    AcceptAll,
    /// Records without any English signal are dropped.
    EnglishOnly,
}

impl LocaleFilter {
    pub fn admits(self, record: &Record) -> bool {
        match self {
            LocaleFilter::AcceptAll => true,
            LocaleFilter::EnglishOnly => is_english(record),
        }
    }
}

/// True if any key carries the English suffix, or the record's language
/// field names an English locale.
pub fn is_english(record: &Record) -> bool {
    if record.keys().any(|key| key.ends_with(ENGLISH_SUFFIX)) {
        return true;
    }
    let language = LANGUAGE_FIELDS
        .iter()
        .filter_map(|field| record.get(*field))
        .find(|value| is_truthy(value));
    match language {
        Some(Value::String(lang)) => lang.trim().to_lowercase().starts_with(ENGLISH_MARKER),
        _ => false,
    }
}

/// Fold every `_en` field into its base name. English values replace base
/// values; the first string-valued language field is forced to `"en"`.
pub fn normalize(record: &Record) -> Record {
    let mut out = Record::new();
    for (key, value) in record {
        match key.strip_suffix(ENGLISH_SUFFIX) {
            Some(base) => {
                out.insert(base.to_string(), value.clone());
            }
            None => {
                if !out.contains_key(key) {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
    }

    for base in PRIMARY_FIELDS {
        if let Some(value) = record.get(&format!("{base}{ENGLISH_SUFFIX}")) {
            out.insert(base.to_string(), value.clone());
        }
    }

    if let Some(field) = LANGUAGE_FIELDS
        .iter()
        .find(|field| matches!(record.get(**field), Some(Value::String(_))))
    {
        out.insert(
            (*field).to_string(),
            Value::String(ENGLISH_MARKER.to_string()),
        );
    }

    out
}

/// Null, false, zero and empty values count as absent.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
