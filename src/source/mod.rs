//! Building the substitution map from a tag source and an optional definition file.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::substitution::SubstitutionMap;

pub mod cyclonedx;
pub mod definition;

pub use cyclonedx::Bom;
pub use definition::scan_definitions;


#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read tag source {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CycloneDX BOM")]
    MalformedBom(#[source] serde_json::Error),

    #[error("CycloneDX BOM components are empty")]
    MissingComponents,
}

/// Format of a tag source document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// CycloneDX JSON bill of materials
    #[default]
    Cyclonedx,
    /// One image reference per line
    Text,
}

/// Parse tag source bytes into a substitution map
pub fn parse_tag_source(bytes: &[u8], kind: SourceKind) -> Result<SubstitutionMap, SourceError> {
    let references = match kind {
        SourceKind::Cyclonedx => Bom::from_slice(bytes)?.container_references()?,
        SourceKind::Text => String::from_utf8_lossy(bytes)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect(),
    };

    let mut map = SubstitutionMap::new();
    for reference in &references {
        debug!("Tag source entry: {}", reference);
        map.insert_reference(reference);
    }
    Ok(map)
}

/// Read a tag source file into a substitution map
pub fn read_tag_source(path: &Path, kind: SourceKind) -> Result<SubstitutionMap, SourceError> {
    let bytes = std::fs::read(path).map_err(|source| SourceError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_tag_source(&bytes, kind)
}

/// Narrow `map` to the images declared in a rendered definition
pub fn restrict_to_definitions(map: &mut SubstitutionMap, definition_content: &str) {
    info!("Scanning definition references...");
    let definitions = scan_definitions(definition_content);
    map.retain(|key| definitions.contains_key(key));
    info!(
        "{} substitution(s) match the definition references",
        map.len()
    );
}
