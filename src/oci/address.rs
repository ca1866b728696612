/// OCI addresses, tags, digests, and references.
///
/// Validation follows the distribution spec grammars:
/// - name: `[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*` path components joined
///   by `/`
/// - digest: `algorithm:encoded`, lowercase algorithm, case-sensitive
///   encoded portion
/// - tag: `[A-Za-z0-9_][A-Za-z0-9._-]{0,127}`
use std::fmt;

use super::OciError;

/// A named repository on a registry host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OciAddr {
    pub registry: String,
    pub name: String,
}

impl OciAddr {
    pub fn new(registry: impl Into<String>, name: impl Into<String>) -> Result<Self, OciError> {
        let registry = registry.into();
        let name = name.into();
        if registry.is_empty() {
            return Err(OciError::InvalidName {
                name: registry,
                reason: "registry host must not be empty".to_string(),
            });
        }
        validate_name(&name)?;
        Ok(OciAddr { registry, name })
    }

    /// Extend with a tag-or-digest reference.
    pub fn with_reference(self, reference: &str) -> Result<OciAddrWithReference, OciError> {
        Ok(OciAddrWithReference {
            addr: self,
            reference: OciReference::parse(reference)?,
        })
    }

    /// Extend with a digest.
    pub fn with_digest(self, digest: &str) -> Result<OciAddrWithDigest, OciError> {
        Ok(OciAddrWithDigest {
            addr: self,
            digest: OciDigest::parse(digest)?,
        })
    }
}

impl fmt::Display for OciAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.name)
    }
}

/// An address plus a tag or digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciAddrWithReference {
    pub addr: OciAddr,
    pub reference: OciReference,
}

impl fmt::Display for OciAddrWithReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            OciReference::Tag(t) => write!(f, "{}:{}", self.addr, t),
            OciReference::Digest(d) => write!(f, "{}@{}", self.addr, d),
        }
    }
}

/// An address plus a digest only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciAddrWithDigest {
    pub addr: OciAddr,
    pub digest: OciDigest,
}

impl fmt::Display for OciAddrWithDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.addr, self.digest)
    }
}

/// A content digest, `algorithm:encoded`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OciDigest(String);

impl OciDigest {
    pub fn parse(input: &str) -> Result<Self, OciError> {
        let invalid = |reason: &str| OciError::InvalidDigest {
            digest: input.to_string(),
            reason: reason.to_string(),
        };

        let (algorithm, encoded) = input
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' separator"))?;

        // algorithm: lowercase alphanumeric components joined by +._-
        let mut last_was_component_char = false;
        if algorithm.is_empty() {
            return Err(invalid("empty algorithm"));
        }
        for c in algorithm.chars() {
            match c {
                'a'..='z' | '0'..='9' => last_was_component_char = true,
                '+' | '.' | '_' | '-' if last_was_component_char => {
                    last_was_component_char = false
                }
                _ => return Err(invalid("invalid algorithm")),
            }
        }
        if !last_was_component_char {
            return Err(invalid("algorithm ends with a separator"));
        }

        if encoded.is_empty()
            || !encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '=' | '_' | '-'))
        {
            return Err(invalid("invalid encoded portion"));
        }

        Ok(OciDigest(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OciDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tag name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OciTag(String);

impl OciTag {
    pub fn parse(input: &str) -> Result<Self, OciError> {
        let invalid = |reason: &str| OciError::InvalidTag {
            tag: input.to_string(),
            reason: reason.to_string(),
        };

        let mut chars = input.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphanumeric() || c == '_' => {}
            Some(_) => return Err(invalid("must start with [A-Za-z0-9_]")),
            None => return Err(invalid("must not be empty")),
        }
        if input.len() > 128 {
            return Err(invalid("must be at most 128 characters"));
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
            return Err(invalid("invalid character"));
        }
        Ok(OciTag(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OciTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Either a tag or a digest. Digests are recognized by the `:` they must
/// contain and tags must not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OciReference {
    Tag(OciTag),
    Digest(OciDigest),
}

impl OciReference {
    pub fn parse(input: &str) -> Result<Self, OciError> {
        if input.contains(':') {
            Ok(OciReference::Digest(OciDigest::parse(input).map_err(
                |e| OciError::InvalidReference {
                    reference: input.to_string(),
                    reason: e.to_string(),
                },
            )?))
        } else {
            Ok(OciReference::Tag(OciTag::parse(input).map_err(|e| {
                OciError::InvalidReference {
                    reference: input.to_string(),
                    reason: e.to_string(),
                }
            })?))
        }
    }
}

impl fmt::Display for OciReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OciReference::Tag(t) => write!(f, "{}", t),
            OciReference::Digest(d) => write!(f, "{}", d),
        }
    }
}

/// Validate a repository name: slash-separated path components, each
/// lowercase alphanumeric runs joined by `.`, `_`, `__`, or `-+`.
fn validate_name(name: &str) -> Result<(), OciError> {
    let invalid = |reason: String| OciError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty".to_string()));
    }
    for component in name.split('/') {
        validate_name_component(component)
            .map_err(|reason| invalid(format!("component {:?}: {}", component, reason)))?;
    }
    Ok(())
}

fn validate_name_component(component: &str) -> Result<(), String> {
    let bytes = component.as_bytes();
    let mut i = 0;

    let mut run = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && (bytes[*i].is_ascii_lowercase() || bytes[*i].is_ascii_digit()) {
            *i += 1;
        }
        *i > start
    };

    if !run(&mut i) {
        return Err("must start with [a-z0-9]".to_string());
    }
    while i < bytes.len() {
        // separator: '.', '_', '__', or one or more '-'
        match bytes[i] {
            b'.' => i += 1,
            b'_' => {
                i += 1;
                if i < bytes.len() && bytes[i] == b'_' {
                    i += 1;
                }
            }
            b'-' => {
                while i < bytes.len() && bytes[i] == b'-' {
                    i += 1;
                }
            }
            _ => return Err("invalid character".to_string()),
        }
        if !run(&mut i) {
            return Err("separator must be followed by [a-z0-9]".to_string());
        }
    }
    Ok(())
}
