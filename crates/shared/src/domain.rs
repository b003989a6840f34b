use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// One untyped entry from the API's JSON response body.
///
/// Field order follows the response (serde_json is built with
/// `preserve_order`), so iterating a record or a collection of records
/// never reorders what the server sent.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Logical identifier for a backend resource collection, e.g. `shelters`.
///
/// Only bare collection names are representable. Characters that could
/// smuggle path segments, query strings or credentials into the request
/// target (`/`, `:`, `?`, `#`, `@`, whitespace) are rejected at
/// construction, so a validated name can be joined onto the API base
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointName(String);

impl EndpointName {
    pub fn new(name: impl Into<String>) -> Result<Self, FetchError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(FetchError::InvalidEndpoint { name });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Singular form used to tag rendered fragments: `shelters` -> `shelter`.
    /// Names without a trailing `s` are used as-is.
    pub fn singular(&self) -> &str {
        self.0
            .strip_suffix('s')
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
