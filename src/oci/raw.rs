/// Transport-level OCI Distribution client
///
/// Implements the `/v2/` API endpoints used by the toolkit:
/// - GET /v2/ - API version check
/// - GET /v2/<name>/tags/list - content discovery
/// - GET /v2/<name>/manifests/<reference> - fetch manifest
/// - GET /v2/<name>/blobs/<digest> - fetch blob
///
/// Authentication follows the Docker/OCI token flow:
/// 1. Try the resource with whatever bearer token is cached for its scope
/// 2. On 401/403, parse every WWW-Authenticate header
/// 3. For each Bearer challenge in order, request a token from its realm
/// 4. Retry the resource with the obtained token
use std::sync::Mutex;

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::address::{OciAddr, OciAddrWithDigest, OciAddrWithReference};
use super::credentials::{OciScope, ScopedCredentials};
use super::error::{ErrorEnvelope, OciError};
use super::manifest::{media_types, Manifest};
use super::www_authenticate::{self, AuthScheme};

/// Non-fatal registry notices parsed from `Warning:` response headers.
#[derive(Debug, Clone, Default)]
pub struct Warnings(pub Vec<String>);

impl Warnings {
    pub fn merge(&mut self, other: Warnings) {
        self.0.extend(other.0);
    }
}

/// Options for constructing a [`RawOciClient`].
#[derive(Debug, Clone, Default)]
pub struct RawClientOptions {
    /// Use `http://` base URLs instead of `https://`. Intended for tests
    /// and loopback registries only.
    pub plain_http: bool,

    /// Replace the default TLS 1.3 client, e.g. to pin a proxy.
    pub http_client: Option<reqwest::Client>,
}

/// A successful blob response. The caller owns the body stream and is
/// responsible for reading it to completion or dropping it.
#[derive(Debug)]
pub struct BlobResponse {
    pub content_type: Option<String>,
    pub response: Response,
    pub warnings: Warnings,
}

/// Tag listing from `/v2/<name>/tags/list`.
#[derive(Debug, Deserialize)]
pub struct TagList {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

impl TokenResponse {
    /// Some registries use `token`, others `access_token`.
    fn get_token(&self) -> Option<&str> {
        self.token.as_deref().or(self.access_token.as_deref())
    }
}

/// Transport-level OCI registry client with a per-scope credential map.
pub struct RawOciClient {
    http: reqwest::Client,
    credentials: Mutex<ScopedCredentials>,
    plain_http: bool,
}

impl RawOciClient {
    pub fn new(credentials: ScopedCredentials, options: RawClientOptions) -> Result<Self, OciError> {
        let http = match options.http_client {
            Some(client) => client,
            None => default_http_client()?,
        };
        Ok(RawOciClient {
            http,
            credentials: Mutex::new(credentials),
            plain_http: options.plain_http,
        })
    }

    fn base_url(&self, registry: &str) -> String {
        let scheme = if self.plain_http { "http" } else { "https" };
        format!("{}://{}/v2", scheme, registry)
    }

    /// GET `/v2/` to verify the registry speaks the distribution API.
    ///
    /// Registries such as ghcr.io deny even the base endpoint to
    /// anonymous clients, so an authentication failure whose challenge
    /// offers Bearer is treated as a successful check.
    pub async fn check(&self, registry: &str) -> Result<Warnings, OciError> {
        let url = format!("{}/", self.base_url(registry));
        let scope = OciScope::registry(registry);
        match self.request(&url, &scope, None).await {
            Ok(response) => Ok(parse_warnings(&response)),
            Err(OciError::AuthenticationRequired {
                schemes, warnings, ..
            }) if schemes.iter().any(|s| s.is_bearer()) => Ok(warnings),
            Err(e) => Err(e),
        }
    }

    /// GET `/v2/<name>/tags/list`.
    pub async fn content_discovery(&self, addr: &OciAddr) -> Result<(TagList, Warnings), OciError> {
        let url = format!("{}/{}/tags/list", self.base_url(&addr.registry), addr.name);
        let scope = OciScope::repository(&addr.registry, &addr.name);
        let response = self.request(&url, &scope, None).await?;
        let warnings = parse_warnings(&response);
        let tags: TagList = response.json().await?;
        Ok((tags, warnings))
    }

    /// GET `/v2/<name>/manifests/<reference>` and decode according to the
    /// Content-Type the registry declared.
    pub async fn get_manifest(
        &self,
        addr: &OciAddrWithReference,
    ) -> Result<(Manifest, Warnings), OciError> {
        let url = format!(
            "{}/{}/manifests/{}",
            self.base_url(&addr.addr.registry),
            addr.addr.name,
            addr.reference
        );
        let scope = OciScope::repository(&addr.addr.registry, &addr.addr.name);
        let response = self
            .request(&url, &scope, Some(&media_types::accept_header()))
            .await?;
        let warnings = parse_warnings(&response);

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                OciError::Protocol("manifest response carries no Content-Type".to_string())
            })?;

        let bytes = response.bytes().await?;
        let manifest = Manifest::parse(&bytes, &content_type)?;
        Ok((manifest, warnings))
    }

    /// GET `/v2/<name>/blobs/<digest>`, returning the unread body stream.
    pub async fn get_blob(&self, addr: &OciAddrWithDigest) -> Result<BlobResponse, OciError> {
        let url = format!(
            "{}/{}/blobs/{}",
            self.base_url(&addr.addr.registry),
            addr.addr.name,
            addr.digest
        );
        let scope = OciScope::repository(&addr.addr.registry, &addr.addr.name);
        let response = self.request(&url, &scope, None).await?;
        let warnings = parse_warnings(&response);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(BlobResponse {
            content_type,
            response,
            warnings,
        })
    }

    /// One GET with the authentication state machine wrapped around it.
    async fn request(
        &self,
        url: &str,
        scope: &OciScope,
        accept: Option<&str>,
    ) -> Result<Response, OciError> {
        let cached_bearer = {
            let creds = self.credentials.lock().expect("credential map poisoned");
            creds.lookup_bearer(scope).map(str::to_string)
        };

        let response = self.send(url, accept, cached_bearer.as_deref()).await?;
        let auth_error = match dispatch(url, response).await {
            Ok(response) => return Ok(response),
            Err(e @ OciError::AuthenticationRequired { .. }) => e,
            Err(e) => return Err(e),
        };

        let schemes = match &auth_error {
            OciError::AuthenticationRequired { schemes, .. } => schemes.clone(),
            _ => unreachable!(),
        };

        for scheme in schemes.iter().filter(|s| s.is_bearer()) {
            let token = match self.acquire_token(scheme, scope).await {
                Ok(token) => token,
                Err(e) => {
                    debug!(url, error = %e, "bearer token acquisition failed");
                    continue;
                }
            };

            {
                let mut creds = self.credentials.lock().expect("credential map poisoned");
                creds.put_bearer(scope, token.clone());
            }

            let response = self.send(url, accept, Some(&token)).await?;
            match dispatch(url, response).await {
                Ok(response) => return Ok(response),
                Err(e @ OciError::AuthenticationRequired { .. }) => {
                    debug!(url, error = %e, "token was not accepted");
                }
                Err(e) => return Err(e),
            }
        }

        Err(auth_error)
    }

    async fn send(
        &self,
        url: &str,
        accept: Option<&str>,
        bearer: Option<&str>,
    ) -> Result<Response, OciError> {
        let mut request = self.http.get(url);
        if let Some(accept) = accept {
            request = request.header("Accept", accept);
        }
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        Ok(request.send().await?)
    }

    /// Request a bearer token from the challenge's realm.
    ///
    /// The endpoint URL is `realm?<other-params-as-query>`; parameter
    /// values are passed through unencoded, matching what registries
    /// observed in the wild expect.
    async fn acquire_token(&self, scheme: &AuthScheme, scope: &OciScope) -> Result<String, OciError> {
        let realm = scheme.params.get("realm").ok_or_else(|| {
            OciError::Protocol("Bearer challenge carries no realm parameter".to_string())
        })?;

        let mut url = realm.clone();
        let query: Vec<String> = scheme
            .params
            .iter()
            .filter(|(k, _)| k.as_str() != "realm")
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query.join("&"));
        }

        debug!(%url, "requesting bearer token");

        let basic_header = {
            let creds = self.credentials.lock().expect("credential map poisoned");
            creds.lookup_basic(scope).map(|b| b.header_value())
        };

        let mut request = self.http.get(&url);
        if let Some(header) = basic_header {
            request = request.header("Authorization", header);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(OciError::Protocol(format!(
                "token endpoint {} answered {}",
                url,
                response.status()
            )));
        }

        let token_response: TokenResponse = response.json().await?;
        token_response
            .get_token()
            .map(str::to_string)
            .ok_or_else(|| OciError::Protocol("token endpoint returned no token".to_string()))
    }
}

/// Default client: TLS 1.3 or newer, no plaintext fallback.
fn default_http_client() -> Result<reqwest::Client, OciError> {
    Ok(reqwest::Client::builder()
        .min_tls_version(reqwest::tls::Version::TLS_1_3)
        .build()?)
}

/// Classify a response per the distribution spec. Success passes the
/// unread response through; every other branch consumes the body and
/// carries the response's warnings on the error.
async fn dispatch(url: &str, response: Response) -> Result<Response, OciError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let warnings = parse_warnings(&response);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let schemes = collect_challenges(&response)?;
        let body = response.bytes().await.unwrap_or_default();
        return Err(OciError::AuthenticationRequired {
            endpoint: url.to_string(),
            status: status.as_u16(),
            schemes,
            envelope: ErrorEnvelope::decode_lossy(&body),
            warnings,
        });
    }

    let body = response.bytes().await.unwrap_or_default();
    Err(OciError::Registry {
        status: status.as_u16(),
        envelope: ErrorEnvelope::decode_lossy(&body),
        warnings,
    })
}

/// Parse every WWW-Authenticate header on the response. RFC 7235 allows
/// several headers and several comma-separated challenges per header.
fn collect_challenges(response: &Response) -> Result<Vec<AuthScheme>, OciError> {
    let mut schemes = Vec::new();
    for value in response.headers().get_all("www-authenticate") {
        let text = value.to_str().map_err(|_| {
            OciError::Protocol("WWW-Authenticate header is not valid ASCII".to_string())
        })?;
        schemes.extend(www_authenticate::parse(text)?);
    }
    Ok(schemes)
}

/// Collect `Warning:` header values. The RFC 7234 shape is
/// `<code> <agent> "<text>"`; the quoted text is extracted when present,
/// otherwise the raw value is kept.
fn parse_warnings(response: &Response) -> Warnings {
    let mut warnings = Vec::new();
    for value in response.headers().get_all("warning") {
        let Ok(text) = value.to_str() else { continue };
        warnings.push(extract_warning_text(text));
    }
    Warnings(warnings)
}

fn extract_warning_text(value: &str) -> String {
    if let Some(start) = value.find('"') {
        let rest = &value[start + 1..];
        if let Some(end) = rest.rfind('"') {
            return rest[..end].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_text_extraction() {
        assert_eq!(
            extract_warning_text(r#"299 - "deprecated tag""#),
            "deprecated tag"
        );
        assert_eq!(extract_warning_text("bare text"), "bare text");
    }

    #[test]
    fn test_base_url_scheme() {
        let plain = RawOciClient::new(
            ScopedCredentials::new(),
            RawClientOptions {
                plain_http: true,
                http_client: None,
            },
        )
        .unwrap();
        assert_eq!(plain.base_url("localhost:5000"), "http://localhost:5000/v2");

        let tls = RawOciClient::new(ScopedCredentials::new(), RawClientOptions::default()).unwrap();
        assert_eq!(tls.base_url("ghcr.io"), "https://ghcr.io/v2");
    }
}
