//! Partial CycloneDX schema covering the fields needed to locate container images.

use serde::{Deserialize, Serialize};

use super::SourceError;
use crate::constants::cyclonedx;
use crate::substitution::strip_image_hash_tag;

/// CycloneDX bill of materials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bom {
    pub components: Option<Vec<Component>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub component_type: String,
    pub name: String,
    pub purl: Option<String>,
    #[serde(default)]
    pub hashes: Vec<Hash>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hash {
    pub alg: String,
    pub content: String,
}

impl Bom {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SourceError> {
        serde_json::from_slice(bytes).map_err(SourceError::MalformedBom)
    }

    /// Digested image references of every container component
    pub fn container_references(&self) -> Result<Vec<String>, SourceError> {
        let components = self
            .components
            .as_ref()
            .ok_or(SourceError::MissingComponents)?;

        Ok(components
            .iter()
            .filter(|c| c.component_type == cyclonedx::CONTAINER)
            .map(Component::image_reference)
            .collect())
    }
}

impl Component {
    /// Prefer the package URL, then a SHA-256 hash with the name, then the bare name
    pub fn image_reference(&self) -> String {
        if let Some(purl) = &self.purl {
            return purl_to_reference(purl);
        }

        if let Some(hash) = self.hashes.iter().find(|h| h.alg == cyclonedx::SHA256_ALG) {
            return format!("{}@sha256:{}", strip_image_hash_tag(&self.name), hash.content);
        }

        self.name.clone()
    }
}

/// Convert `pkg:docker/name@digest?repository_url=registry` into `registry/name@digest`
fn purl_to_reference(purl: &str) -> String {
    let purl = purl.replace(cyclonedx::PURL_PREFIX, "");
    let (path, qualifiers) = match purl.split_once('?') {
        Some((path, qualifiers)) => (path, Some(qualifiers)),
        None => (purl.as_str(), None),
    };
    let path = path.replace("%3A", ":").replace("%3a", ":");

    let repository_url = qualifiers.and_then(|q| {
        q.split('&')
            .find_map(|pair| pair.strip_prefix(cyclonedx::REPOSITORY_URL))
    });

    match repository_url {
        Some(registry) => format!("{}/{}", registry.trim_end_matches('/'), path),
        None => path,
    }
}
