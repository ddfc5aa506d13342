//! Resolved image coordinates and the substitution map built from them.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::constants::registry;


/// A fully resolved image coordinate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    pub registry: String,
    pub image: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl Substitution {
    /// Parse a digested reference such as `registry/image:tag@sha256:...`
    pub fn parse(reference: &str) -> Self {
        let (without_digest, digest) = match reference.split_once('@') {
            Some((before, after)) => (before, Some(after.to_string())),
            None => (reference, None),
        };

        // A colon followed by a path is a registry port, not a tag
        let (image_part, tag) = match without_digest.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => (before, Some(after.to_string())),
            _ => (without_digest, None),
        };

        let (registry, image) = match image_part.split_once('/') {
            None => (
                registry::DEFAULT.to_string(),
                format!("{}{}", registry::LIBRARY_NAMESPACE, image_part),
            ),
            Some((first, rest)) if is_registry_host(first) => (first.to_string(), rest.to_string()),
            Some(_) => (registry::DEFAULT.to_string(), image_part.to_string()),
        };

        Self {
            registry,
            image,
            tag: tag.filter(|t| !t.is_empty()),
            digest: digest.filter(|d| !d.is_empty()),
        }
    }

    pub fn has_digest(&self) -> bool {
        self.digest.is_some()
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.image)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

fn is_registry_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

/// Strip scheme, tag and digest from a reference, leaving the key it is indexed by
pub fn strip_image_hash_tag(reference: &str) -> String {
    let mut stripped = reference.to_string();
    for scheme in registry::SCHEMES {
        stripped = stripped.replace(scheme, "");
    }
    if let Some((name, _)) = stripped.split_once('@') {
        stripped = name.to_string();
    }
    match stripped.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => name.to_string(),
        _ => stripped,
    }
}

/// Strip the implicit Docker Hub prefixes so equivalent references compare equal
pub fn normalize_docker_hub(reference: &str) -> &str {
    reference
        .strip_prefix(registry::LIBRARY_PREFIX)
        .or_else(|| reference.strip_prefix(registry::DEFAULT_PREFIX))
        .unwrap_or(reference)
}

/// A substitution map entry annotated with its key length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueSorted {
    pub key: String,
    pub value: Substitution,
    pub length: usize,
}

/// Substitutions indexed by the stripped reference they replace
#[derive(Debug, Clone, Default)]
pub struct SubstitutionMap {
    entries: HashMap<String, Substitution>,
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `reference` under its stripped key, replacing any earlier entry
    pub fn insert_reference(&mut self, reference: &str) {
        let key = strip_image_hash_tag(reference);
        if key.is_empty() {
            warn!("Ignoring tag source entry with no image name: {}", reference);
            return;
        }
        self.entries.insert(key, Substitution::parse(reference));
    }

    pub fn get(&self, key: &str) -> Option<&Substitution> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the entries whose key satisfies `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|key, _| keep(key));
    }

    /// Entries ordered so that longer, more specific keys are tried first
    pub fn sorted(&self) -> Vec<KeyValueSorted> {
        let mut sorted: Vec<KeyValueSorted> = self
            .entries
            .iter()
            .map(|(key, value)| KeyValueSorted {
                key: key.clone(),
                value: value.clone(),
                length: key.len(),
            })
            .collect();
        sorted.sort_by(|a, b| b.length.cmp(&a.length).then_with(|| a.key.cmp(&b.key)));
        sorted
    }
}
