/// Typed OCI client errors and the distribution error envelope.
use serde::Deserialize;

use super::raw::Warnings;
use super::www_authenticate::{AuthScheme, WwwAuthenticateError};

/// Error codes enumerated by the OCI distribution spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DistributionErrorCode {
    #[serde(rename = "BLOB_UNKNOWN")]
    BlobUnknown,
    #[serde(rename = "BLOB_UPLOAD_INVALID")]
    BlobUploadInvalid,
    #[serde(rename = "BLOB_UPLOAD_UNKNOWN")]
    BlobUploadUnknown,
    #[serde(rename = "DIGEST_INVALID")]
    DigestInvalid,
    #[serde(rename = "MANIFEST_BLOB_UNKNOWN")]
    ManifestBlobUnknown,
    #[serde(rename = "MANIFEST_INVALID")]
    ManifestInvalid,
    #[serde(rename = "MANIFEST_UNKNOWN")]
    ManifestUnknown,
    #[serde(rename = "NAME_INVALID")]
    NameInvalid,
    #[serde(rename = "NAME_UNKNOWN")]
    NameUnknown,
    #[serde(rename = "SIZE_INVALID")]
    SizeInvalid,
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized,
    #[serde(rename = "DENIED")]
    Denied,
    #[serde(rename = "UNSUPPORTED")]
    Unsupported,
    #[serde(rename = "TOOMANYREQUESTS")]
    TooManyRequests,
    /// Registries emit codes beyond the spec's list.
    #[serde(other)]
    Other,
}

/// One entry of the `{"errors": [...]}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct DistributionError {
    pub code: DistributionErrorCode,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub errors: Vec<DistributionError>,
}

impl ErrorEnvelope {
    /// Best-effort decode; bodies that are not a valid envelope yield an
    /// empty one.
    pub fn decode_lossy(body: &[u8]) -> ErrorEnvelope {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

impl std::fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "(no error detail)");
        }
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{:?}: {}", e.code, e.message)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OciError {
    #[error("invalid OCI name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid OCI digest {digest:?}: {reason}")]
    InvalidDigest { digest: String, reason: String },

    #[error("invalid OCI tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("invalid OCI reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    /// The registry demanded authentication and every advertised
    /// challenge failed. A recoverable state during the auth flow; final
    /// when surfaced.
    #[error("authentication required by {endpoint} ({status})")]
    AuthenticationRequired {
        endpoint: String,
        status: u16,
        schemes: Vec<AuthScheme>,
        envelope: ErrorEnvelope,
        warnings: Warnings,
    },

    /// A non-2xx response with a decoded distribution error envelope.
    #[error("registry error ({status}): {envelope}")]
    Registry {
        status: u16,
        envelope: ErrorEnvelope,
        warnings: Warnings,
    },

    /// The response shape violates the distribution spec.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid WWW-Authenticate challenge")]
    Challenge(#[from] WwwAuthenticateError),

    #[error("transport error")]
    Transport(#[from] reqwest::Error),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl OciError {
    /// Whether the error is the auth-required state, which the auth flow
    /// may recover from and `check` absorbs for Bearer challenges.
    pub fn is_authentication_required(&self) -> bool {
        matches!(self, OciError::AuthenticationRequired { .. })
    }
}
