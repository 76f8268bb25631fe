//! Strongly-typed identifiers.
//!
//! Both identifiers are validated at construction time, so anything holding
//! one can rely on it being structurally valid on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default object path prefix under which configuration objects live.
pub const DEFAULT_OBJECT_PATH_PREFIX: &str = "/com/system/configurationManager/Application";

fn is_element_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Macro to define a validated string newtype.
///
/// Generates: struct, `as_str()`, Display, AsRef<str>, Serialize, Deserialize.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        // Hash/Eq derive from the inner String, so lookups by &str agree.
        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = &'static str;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::from_string(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

define_id!(AppId);
define_id!(ObjectPath);

impl AppId {
    /// Accept an identifier that is already a valid path element.
    pub fn from_string(s: String) -> Result<Self, &'static str> {
        if s.is_empty() {
            return Err("AppId cannot be empty");
        }
        if !s.chars().all(is_element_char) {
            return Err("AppId may only contain [A-Za-z0-9_]");
        }
        Ok(Self(s))
    }

    /// Derive an identifier from a configuration filename stem.
    ///
    /// Every character outside `[A-Za-z0-9_]` becomes `_`.
    pub fn derive(stem: &str) -> Result<Self, &'static str> {
        let sanitized: String = stem
            .chars()
            .map(|c| if is_element_char(c) { c } else { '_' })
            .collect();
        Self::from_string(sanitized)
    }
}

impl ObjectPath {
    /// Accept an absolute path of non-empty `[A-Za-z0-9_]` elements.
    pub fn from_string(s: String) -> Result<Self, &'static str> {
        let Some(rest) = s.strip_prefix('/') else {
            return Err("ObjectPath must start with '/'");
        };
        if rest.is_empty() {
            return Err("ObjectPath must have at least one element");
        }
        for element in rest.split('/') {
            if element.is_empty() {
                return Err("ObjectPath cannot contain empty elements");
            }
            if !element.chars().all(is_element_char) {
                return Err("ObjectPath elements may only contain [A-Za-z0-9_]");
            }
        }
        Ok(Self(s))
    }

    /// `<prefix>/<app_id>`. A trailing slash on the prefix is ignored.
    pub fn for_app(prefix: &str, app_id: &AppId) -> Result<Self, &'static str> {
        Self::from_string(format!("{}/{}", prefix.trim_end_matches('/'), app_id))
    }
}
