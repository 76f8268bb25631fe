//! Required client settings loaded at startup.

use crate::client::{PHRASE_KEY, TIMEOUT_KEY};
use crate::loader;
use crate::types::{Error, Result};
use crate::value::{ConfigRecord, Value};
use std::path::Path;

/// Validated startup values: a positive interval and a non-empty phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Milliseconds between work cycles.
    pub interval_ms: i64,
    pub phrase: String,
}

impl ClientSettings {
    /// Load the application's record from disk and extract the settings.
    pub fn load(path: &Path) -> Result<Self> {
        let record = loader::load_record(path)?;
        Self::from_record(&record)
            .map_err(|e| match e {
                Error::MissingRequiredField(msg) => {
                    Error::missing_field(format!("{} in {}", msg, path.display()))
                }
                other => other,
            })
    }

    pub fn from_record(record: &ConfigRecord) -> Result<Self> {
        let interval_ms = match record.get(TIMEOUT_KEY) {
            Some(Value::Integer(ms)) if *ms > 0 => *ms,
            Some(Value::Integer(ms)) => {
                return Err(Error::missing_field(format!(
                    "{} must be positive, got {}",
                    TIMEOUT_KEY, ms
                )))
            }
            Some(other) => {
                return Err(Error::missing_field(format!(
                    "{} must be an integer, got {}",
                    TIMEOUT_KEY,
                    other.kind()
                )))
            }
            None => return Err(Error::missing_field(TIMEOUT_KEY)),
        };

        let phrase = match record.get(PHRASE_KEY) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) => {
                return Err(Error::missing_field(format!("{} must not be empty", PHRASE_KEY)))
            }
            Some(other) => {
                return Err(Error::missing_field(format!(
                    "{} must be a string, got {}",
                    PHRASE_KEY,
                    other.kind()
                )))
            }
            None => return Err(Error::missing_field(PHRASE_KEY)),
        };

        Ok(Self { interval_ms, phrase })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn test_load_valid_settings() {
        let file = write(r#"{"Timeout": 500, "TimeoutPhrase": "hello", "Extra": 1.5}"#);
        let settings = ClientSettings::load(file.path()).unwrap();
        assert_eq!(
            settings,
            ClientSettings {
                interval_ms: 500,
                phrase: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_missing_phrase_is_fatal() {
        let file = write(r#"{"Timeout": 500}"#);
        let err = ClientSettings::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField(ref m) if m.contains("TimeoutPhrase")));
    }

    #[test]
    fn test_invalid_interval_is_fatal() {
        for contents in [
            r#"{"TimeoutPhrase": "hello"}"#,
            r#"{"Timeout": 0, "TimeoutPhrase": "hello"}"#,
            r#"{"Timeout": -5, "TimeoutPhrase": "hello"}"#,
            r#"{"Timeout": "500", "TimeoutPhrase": "hello"}"#,
            r#"{"Timeout": 1.5, "TimeoutPhrase": "hello"}"#,
        ] {
            let file = write(contents);
            let err = ClientSettings::load(file.path()).unwrap_err();
            assert!(matches!(err, Error::MissingRequiredField(_)), "{contents}: {err:?}");
        }
    }

    #[test]
    fn test_empty_phrase_is_fatal() {
        let file = write(r#"{"Timeout": 500, "TimeoutPhrase": ""}"#);
        assert!(matches!(
            ClientSettings::load(file.path()),
            Err(Error::MissingRequiredField(_))
        ));
    }

    #[test]
    fn test_unreadable_and_unparseable() {
        let missing = ClientSettings::load(Path::new("/nonexistent/app.json"));
        assert!(matches!(missing, Err(Error::ConfigUnreadable(_))));

        let file = write("{ broken");
        assert!(matches!(ClientSettings::load(file.path()), Err(Error::ConfigParse(_))));
    }
}
