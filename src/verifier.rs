/// Concurrent OpenPGP verification of provider release signatures.
///
/// A verifier is built from one armored public key and a metadata API.
/// `verify_provider` downloads the SHA256SUMS document and its detached
/// signature for the most recently stored versions of a provider and
/// returns the versions whose signature validates under the key.
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use pgp::composed::{Deserializable, SignedPublicKey, StandaloneSignature};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::address::ProviderAddr;
use crate::metadata::{MetadataError, MetadataStore, ProviderVersion};
use crate::retry::{retry, RetryError};

const DOWNLOAD_TRIES: usize = 3;
const DOWNLOAD_WAIT: Duration = Duration::from_millis(400);

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The configured armored key failed to parse.
    #[error("invalid verification key")]
    Key(#[source] pgp::errors::Error),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A checksums or signature document could not be fetched. Aborts
    /// the whole verification.
    #[error("failed to download {url}")]
    Download {
        url: String,
        #[source]
        source: RetryError<FetchError>,
    },

    #[error("verification cancelled")]
    Cancelled,

    #[error("failed to construct HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// A single failed HTTP fetch attempt.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport failure")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),
}

#[derive(Debug, Clone)]
pub struct VerifierOptions {
    /// How many stored versions to examine, from the front of the stored
    /// list. The stored order is assumed newest-first by convention; no
    /// semver sort is applied.
    pub versions_to_check: usize,

    /// Upper bound on in-flight verification tasks.
    pub max_parallelism: usize,

    /// Replace the default TLS 1.3 client.
    pub http_client: Option<reqwest::Client>,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        VerifierOptions {
            versions_to_check: 10,
            max_parallelism: 10,
            http_client: None,
        }
    }
}

pub struct ProviderKeyVerifier {
    key: Arc<SignedPublicKey>,
    store: MetadataStore,
    http: reqwest::Client,
    versions_to_check: usize,
    max_parallelism: usize,
}

impl ProviderKeyVerifier {
    pub fn new(
        armored_key: &str,
        store: MetadataStore,
        options: VerifierOptions,
    ) -> Result<Self, VerifyError> {
        let (key, _headers) =
            SignedPublicKey::from_string(armored_key).map_err(VerifyError::Key)?;
        let http = match options.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .min_tls_version(reqwest::tls::Version::TLS_1_3)
                .build()
                .map_err(VerifyError::HttpClient)?,
        };
        Ok(ProviderKeyVerifier {
            key: Arc::new(key),
            store,
            http,
            versions_to_check: options.versions_to_check.max(1),
            max_parallelism: options.max_parallelism.max(1),
        })
    }

    /// Verify the provider's most recently stored versions.
    ///
    /// A signature that fails to validate excludes its version from the
    /// result but does not fail the call. A download failure cancels the
    /// remaining tasks and aborts. Result ordering is unspecified.
    pub async fn verify_provider(
        &self,
        addr: &ProviderAddr,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProviderVersion>, VerifyError> {
        let metadata = self.store.get_provider(addr, false).await?;
        let selected: Vec<ProviderVersion> = metadata
            .versions
            .into_iter()
            .take(self.versions_to_check)
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_parallelism));
        let verified = Arc::new(Mutex::new(Vec::new()));
        let child = cancel.child_token();
        let mut tasks = JoinSet::new();

        for version in selected {
            let key = Arc::clone(&self.key);
            let http = self.http.clone();
            let semaphore = Arc::clone(&semaphore);
            let verified = Arc::clone(&verified);
            let cancel = child.clone();
            let addr = addr.clone();

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    permit = semaphore.acquire_owned() => {
                        permit.map_err(|_| VerifyError::Cancelled)?
                    }
                    _ = cancel.cancelled() => return Err(VerifyError::Cancelled),
                };

                let shasums = download(&http, &cancel, &version.shasums_url).await?;
                let signature = download(&http, &cancel, &version.shasums_signature_url).await?;

                if signature_matches(&key, &shasums, &signature) {
                    debug!(
                        provider = %addr,
                        version = %version.version,
                        "signature verified"
                    );
                    verified.lock().await.push(version);
                } else {
                    info!(
                        provider = %addr,
                        version = %version.version,
                        "signature did not validate, skipping version"
                    );
                }
                Ok(())
            });
        }

        let mut first_error: Option<VerifyError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        // Remaining tasks observe the cancelled token and
                        // abort their downloads promptly.
                        child.cancel();
                        first_error = Some(e);
                    }
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        std::panic::resume_unwind(join_error.into_panic());
                    }
                }
            }
        }

        if let Some(e) = first_error {
            // A cancellation observed by a task after a real failure must
            // not mask that failure; the first error wins either way.
            return Err(e);
        }
        if cancel.is_cancelled() {
            return Err(VerifyError::Cancelled);
        }

        let mut result = verified.lock().await;
        Ok(std::mem::take(&mut *result))
    }
}

/// GET with retries. Non-200 is an error; the body is read to
/// completion. Any failure is considered retryable.
async fn download(
    http: &reqwest::Client,
    cancel: &CancellationToken,
    url: &str,
) -> Result<Vec<u8>, VerifyError> {
    let description = format!("download {}", url);
    retry(
        &description,
        cancel,
        DOWNLOAD_TRIES,
        DOWNLOAD_WAIT,
        |_| true,
        || async {
            let response = http.get(url).send().await?;
            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(FetchError::Status(status.as_u16()));
            }
            Ok(response.bytes().await?.to_vec())
        },
    )
    .await
    .map_err(|source| match source {
        RetryError::Cancelled { .. } => VerifyError::Cancelled,
        source => VerifyError::Download {
            url: url.to_string(),
            source,
        },
    })
}

/// Whether `signature` is a valid detached signature over `data` under
/// `key` or one of its subkeys. Malformed signature documents count as a
/// mismatch, not a transport failure.
fn signature_matches(key: &SignedPublicKey, data: &[u8], signature: &[u8]) -> bool {
    let parsed = if signature.starts_with(b"-----BEGIN") {
        match StandaloneSignature::from_armor_single(Cursor::new(signature)) {
            Ok((sig, _headers)) => sig,
            Err(e) => {
                debug!(error = %e, "signature document failed to parse");
                return false;
            }
        }
    } else {
        match StandaloneSignature::from_bytes(Cursor::new(signature)) {
            Ok(sig) => sig,
            Err(e) => {
                debug!(error = %e, "signature document failed to parse");
                return false;
            }
        }
    };

    if parsed.verify(key, data).is_ok() {
        return true;
    }
    key.public_subkeys
        .iter()
        .any(|subkey| parsed.verify(subkey, data).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = include_str!("../tests/fixtures/key1.asc");
    const OTHER_KEY: &str = include_str!("../tests/fixtures/key2.asc");
    const SHASUMS: &[u8] =
        include_bytes!("../tests/fixtures/terraform-provider-test_0.2.0_SHA256SUMS");
    const SIGNATURE: &[u8] =
        include_bytes!("../tests/fixtures/terraform-provider-test_0.2.0_SHA256SUMS.sig");

    fn parse_key(armor: &str) -> SignedPublicKey {
        SignedPublicKey::from_string(armor).unwrap().0
    }

    #[test]
    fn test_signature_matches_signing_key() {
        assert!(signature_matches(&parse_key(KEY), SHASUMS, SIGNATURE));
    }

    #[test]
    fn test_signature_rejected_for_other_key() {
        assert!(!signature_matches(&parse_key(OTHER_KEY), SHASUMS, SIGNATURE));
    }

    #[test]
    fn test_signature_rejected_for_tampered_data() {
        let mut tampered = SHASUMS.to_vec();
        tampered[0] ^= 0xff;
        assert!(!signature_matches(&parse_key(KEY), &tampered, SIGNATURE));
    }

    #[test]
    fn test_garbage_signature_is_a_mismatch() {
        assert!(!signature_matches(
            &parse_key(KEY),
            SHASUMS,
            b"not a signature"
        ));
    }
}
