//! `$RELIZA{...}` property and secret placeholders.
//!
//! Placeholders are discovered with [`parse_tokens`], the distinct keys are
//! collected into [`SecretProps`] for the external resolver, and the values it
//! returns are substituted back by a [`TokenResolver`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::constants::token;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("property {0} not set and no default declared")]
    UnresolvedProperty(String),

    #[error("secret {0} not set or not available and no default declared")]
    UnresolvedSecret(String),

    #[error("failed to materialize plain secret {key}: {reason}")]
    PlainSecret { key: String, reason: String },

    #[error("failed to read resolved values {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed resolved values {path}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Property,
    Secret,
    PlainSecret,
}

impl TokenKind {
    const ALL: [TokenKind; 3] = [TokenKind::Property, TokenKind::PlainSecret, TokenKind::Secret];

    fn prefix(self) -> &'static str {
        match self {
            TokenKind::Property => "PROPERTY.",
            TokenKind::Secret => "SECRET.",
            TokenKind::PlainSecret => "PLAINSECRET.",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches('.'))
    }
}

/// One placeholder occurrence within a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropSecretToken {
    pub kind: TokenKind,
    pub key: String,
    pub default: Option<String>,
    /// Exact text to replace, delimiters included
    pub whole_text: String,
}

/// Parse every placeholder in `line`
pub fn parse_tokens(line: &str) -> Vec<PropSecretToken> {
    let mut tokens = Vec::new();
    let mut rest = line;

    while let Some(start) = rest.find(token::MARKER) {
        let after_marker = &rest[start + token::MARKER.len()..];
        rest = after_marker;

        let Some(kind) = TokenKind::ALL
            .into_iter()
            .find(|kind| after_marker.starts_with(kind.prefix()))
        else {
            continue;
        };
        let body = &after_marker[kind.prefix().len()..];
        let Some(end) = body.find(token::CLOSE) else {
            continue;
        };
        let segment = &body[..end];

        let (key, default) = match segment.split_once(token::DEFAULT_SEPARATOR) {
            Some((key, default)) => (key, Some(default.to_string())),
            None => (segment, None),
        };

        tokens.push(PropSecretToken {
            kind,
            key: key.to_string(),
            default,
            whole_text: format!("{}{}{}{}", token::MARKER, kind.prefix(), segment, token::CLOSE),
        });
        rest = &body[end + 1..];
    }

    tokens
}

/// Distinct property and secret keys referenced by a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretProps {
    pub properties: BTreeSet<String>,
    pub secrets: BTreeSet<String>,
}

impl SecretProps {
    /// Collect the keys referenced anywhere in `content`
    pub fn scan(content: &str) -> Self {
        let mut sp = Self::default();
        sp.extend_from(content);
        sp
    }

    pub fn extend_from(&mut self, content: &str) {
        for psp in content.lines().flat_map(parse_tokens) {
            match psp.kind {
                TokenKind::Property => self.properties.insert(psp.key),
                TokenKind::Secret | TokenKind::PlainSecret => self.secrets.insert(psp.key),
            };
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.secrets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedProperty {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSecret {
    pub key: String,
    #[serde(rename = "value")]
    pub secret: String,
    #[serde(rename = "lastUpdated", default)]
    pub timestamp: i64,
}

/// Values returned by the external resolver for a [`SecretProps`] query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolvedValues {
    #[serde(default)]
    pub properties: Vec<ResolvedProperty>,
    #[serde(default)]
    pub secrets: Vec<ResolvedSecret>,
}

impl ResolvedValues {
    pub fn load(path: &Path) -> Result<Self, TokenError> {
        let content = std::fs::read_to_string(path).map_err(|source| TokenError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| TokenError::Malformed {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Turns a sealed secret into plaintext within a namespace
pub trait PlainSecretMaterializer {
    fn materialize(&self, sealed: &str, namespace: &str) -> anyhow::Result<String>;
}

/// Materializer used when no cluster is available
pub struct NoMaterializer;

impl PlainSecretMaterializer for NoMaterializer {
    fn materialize(&self, _sealed: &str, _namespace: &str) -> anyhow::Result<String> {
        anyhow::bail!("no plain secret materializer is configured")
    }
}

/// Substitutes placeholders using pre-resolved tables
pub struct TokenResolver<'a> {
    properties: HashMap<String, String>,
    secrets: HashMap<String, ResolvedSecret>,
    for_diff: bool,
    namespace: String,
    materializer: &'a dyn PlainSecretMaterializer,
}

impl<'a> TokenResolver<'a> {
    pub fn new(values: &ResolvedValues, materializer: &'a dyn PlainSecretMaterializer) -> Self {
        Self {
            properties: values
                .properties
                .iter()
                .map(|p| (p.key.clone(), p.value.clone()))
                .collect(),
            secrets: values
                .secrets
                .iter()
                .map(|s| (s.key.clone(), s.clone()))
                .collect(),
            for_diff: false,
            namespace: String::from("default"),
            materializer,
        }
    }

    /// Substitute secret timestamps instead of secret values
    pub fn with_for_diff(mut self, for_diff: bool) -> Self {
        self.for_diff = for_diff;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Replace every placeholder in `line`
    pub fn resolve_line(&self, line: &str) -> Result<String, TokenError> {
        let mut resolved = line.to_string();
        for psp in parse_tokens(line) {
            let value = self.resolve_token(&psp)?;
            resolved = resolved.replace(&psp.whole_text, &value);
        }
        Ok(resolved)
    }

    fn resolve_token(&self, psp: &PropSecretToken) -> Result<String, TokenError> {
        match psp.kind {
            TokenKind::Property => {
                let value = self.properties.get(&psp.key).filter(|v| !v.is_empty());
                match (value, &psp.default) {
                    (Some(value), _) => Ok(value.clone()),
                    (None, Some(default)) => Ok(default.clone()),
                    (None, None) => self
                        .properties
                        .get(&psp.key)
                        .cloned()
                        .ok_or_else(|| TokenError::UnresolvedProperty(psp.key.clone())),
                }
            }
            TokenKind::Secret | TokenKind::PlainSecret => {
                let secret = self.secrets.get(&psp.key);
                let usable = secret.filter(|s| !s.secret.is_empty());
                let secret = match (usable, &psp.default) {
                    (Some(secret), _) => secret,
                    (None, Some(default)) => {
                        debug!("Using default value for secret {}", psp.key);
                        return Ok(default.clone());
                    }
                    (None, None) => {
                        secret.ok_or_else(|| TokenError::UnresolvedSecret(psp.key.clone()))?
                    }
                };

                if self.for_diff {
                    return Ok(secret.timestamp.to_string());
                }
                if psp.kind == TokenKind::Secret {
                    return Ok(secret.secret.clone());
                }
                self.materializer
                    .materialize(&secret.secret, &self.namespace)
                    .map_err(|e| TokenError::PlainSecret {
                        key: psp.key.clone(),
                        reason: format!("{:#}", e),
                    })
            }
        }
    }
}
