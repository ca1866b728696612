/// Scoped registry credentials.
///
/// Credentials are keyed by scope string: `registry` or `registry/name`.
/// An empty or `*` name acts as a registry-wide wildcard. Lookup prefers
/// the most specific match; bearer tokens are preferred over basic when
/// both are set.
use std::collections::HashMap;

use base64::Engine;

/// The scope a credential is valid for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OciScope {
    pub registry: String,
    /// Repository name; empty or `*` means the whole registry.
    pub name: String,
}

impl OciScope {
    pub fn registry(registry: impl Into<String>) -> Self {
        OciScope {
            registry: registry.into(),
            name: String::new(),
        }
    }

    pub fn repository(registry: impl Into<String>, name: impl Into<String>) -> Self {
        OciScope {
            registry: registry.into(),
            name: name.into(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.name.is_empty() || self.name == "*"
    }

    /// The map key: `registry` for wildcard scopes, `registry/name`
    /// otherwise.
    pub fn scope_string(&self) -> String {
        if self.is_wildcard() {
            self.registry.clone()
        } else {
            format!("{}/{}", self.registry, self.name)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub basic: Option<BasicCredentials>,
    pub bearer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    /// `Basic <base64(user:pass)>` header value.
    pub fn header_value(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        format!("Basic {}", encoded)
    }
}

/// In-memory credential map. Tokens live here until the process exits or
/// a caller replaces them; no TTL is enforced.
#[derive(Debug, Clone, Default)]
pub struct ScopedCredentials {
    by_scope: HashMap<String, Credentials>,
}

impl ScopedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, scope: &OciScope, credentials: Credentials) {
        self.by_scope.insert(scope.scope_string(), credentials);
    }

    pub fn put_basic(&mut self, scope: &OciScope, username: &str, password: &str) {
        let entry = self.by_scope.entry(scope.scope_string()).or_default();
        entry.basic = Some(BasicCredentials {
            username: username.to_string(),
            password: password.to_string(),
        });
    }

    /// Record a bearer token under the scope of the request that acquired
    /// it. Last writer wins.
    pub fn put_bearer(&mut self, scope: &OciScope, token: String) {
        let entry = self.by_scope.entry(scope.scope_string()).or_default();
        entry.bearer = Some(token);
    }

    /// Most specific credentials for the scope: the exact
    /// `registry/name` entry when present, otherwise the registry-wide
    /// entry.
    pub fn lookup(&self, scope: &OciScope) -> Option<&Credentials> {
        if !scope.is_wildcard() {
            if let Some(found) = self.by_scope.get(&scope.scope_string()) {
                return Some(found);
            }
        }
        self.by_scope
            .get(&scope.registry)
            .or_else(|| self.by_scope.get(&format!("{}/*", scope.registry)))
    }

    /// Basic credentials for the scope, ignoring bearer tokens. Used for
    /// token acquisition.
    pub fn lookup_basic(&self, scope: &OciScope) -> Option<&BasicCredentials> {
        self.lookup(scope).and_then(|c| c.basic.as_ref())
    }

    /// Bearer token for the scope, ignoring basic credentials. Used for
    /// authenticated content requests.
    pub fn lookup_bearer(&self, scope: &OciScope) -> Option<&str> {
        self.lookup(scope).and_then(|c| c.bearer.as_deref())
    }
}
