//! API version parsing and the supported compatibility window.
//!
//! Manifest documents carry a mandatory `api_version` field of the form
//! `domain.dev/vMAJOR` (for example `domain.dev/v1`). The group identifies
//! the manifest dialect; the major number gates structural compatibility.
//! Minor and patch drift is absorbed by the document model itself
//! (unknown-but-well-formed optional fields are tolerated), so only the
//! major participates in the window check.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The manifest dialect group this engine understands.
pub const SUPPORTED_API_GROUP: &str = "domain.dev";

/// The API major version this engine resolves.
pub const SUPPORTED_API_MAJOR: u32 = 1;

/// Errors from parsing an `api_version` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ApiVersionError {
    /// The string is not of the form `<group>/v<major>`.
    #[error("malformed api version '{value}': expected '<group>/v<major>'")]
    Malformed {
        /// The offending string.
        value: String,
    },

    /// The group is not a dialect this engine understands.
    #[error("unsupported api group '{group}': this engine supports '{SUPPORTED_API_GROUP}'")]
    UnsupportedGroup {
        /// The declared group.
        group: String,
    },

    /// The major version is outside the supported window.
    #[error("unsupported api major {major}: this engine supports major {SUPPORTED_API_MAJOR}")]
    UnsupportedMajor {
        /// The declared major version.
        major: u32,
    },
}

/// A parsed `api_version` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    /// The dialect group (e.g. `domain.dev`).
    pub group: String,

    /// The major version number.
    pub major: u32,
}

impl ApiVersion {
    /// Parses an `api_version` string without checking the support window.
    ///
    /// # Errors
    ///
    /// Returns [`ApiVersionError::Malformed`] if the string does not match
    /// `<group>/v<major>`.
    pub fn parse(value: &str) -> Result<Self, ApiVersionError> {
        let malformed = || ApiVersionError::Malformed {
            value: value.to_string(),
        };

        let (group, version) = value.split_once('/').ok_or_else(malformed)?;
        if group.is_empty() || !version.starts_with('v') {
            return Err(malformed());
        }
        let major: u32 = version[1..].parse().map_err(|_| malformed())?;

        Ok(Self {
            group: group.to_string(),
            major,
        })
    }

    /// Parses an `api_version` string and checks it against the supported
    /// compatibility window.
    ///
    /// # Errors
    ///
    /// Returns [`ApiVersionError::UnsupportedGroup`] or
    /// [`ApiVersionError::UnsupportedMajor`] for out-of-window versions, and
    /// [`ApiVersionError::Malformed`] for unparseable strings.
    pub fn parse_supported(value: &str) -> Result<Self, ApiVersionError> {
        let parsed = Self::parse(value)?;
        if parsed.group != SUPPORTED_API_GROUP {
            return Err(ApiVersionError::UnsupportedGroup {
                group: parsed.group,
            });
        }
        if parsed.major != SUPPORTED_API_MAJOR {
            return Err(ApiVersionError::UnsupportedMajor {
                major: parsed.major,
            });
        }
        Ok(parsed)
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/v{}", self.group, self.major)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_version() {
        let v = ApiVersion::parse("domain.dev/v1").unwrap();
        assert_eq!(v.group, "domain.dev");
        assert_eq!(v.major, 1);
        assert_eq!(v.to_string(), "domain.dev/v1");
    }

    #[test]
    fn parse_supported_accepts_current_major() {
        assert!(ApiVersion::parse_supported("domain.dev/v1").is_ok());
    }

    #[test]
    fn parse_supported_rejects_future_major() {
        assert!(matches!(
            ApiVersion::parse_supported("domain.dev/v2"),
            Err(ApiVersionError::UnsupportedMajor { major: 2 })
        ));
    }

    #[test]
    fn parse_supported_rejects_foreign_group() {
        assert!(matches!(
            ApiVersion::parse_supported("other.dev/v1"),
            Err(ApiVersionError::UnsupportedGroup { .. })
        ));
    }

    #[test]
    fn parse_rejects_malformed_strings() {
        for value in ["", "domain.dev", "domain.dev/1", "/v1", "domain.dev/vx"] {
            assert!(
                matches!(
                    ApiVersion::parse(value),
                    Err(ApiVersionError::Malformed { .. })
                ),
                "expected malformed for {value:?}"
            );
        }
    }
}
