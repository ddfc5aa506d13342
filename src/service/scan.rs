//! Token scan service
//!
//! Lists the property and secret keys a manifest or directory references, in
//! the shape the external resolver is queried with.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use super::files::{read_manifest_file, read_manifest_tree};
use crate::tokens::SecretProps;

pub struct ScanService;

impl ScanService {
    pub fn scan(path: &Path) -> Result<SecretProps> {
        let mut tokens = SecretProps::default();
        if path.is_dir() {
            for file in read_manifest_tree(path)? {
                if let Some(text) = file.content.as_text() {
                    tokens.extend_from(text);
                }
            }
        } else {
            tokens.extend_from(&read_manifest_file(path)?);
        }

        info!(
            "Found {} property(ies) and {} secret(s) in {}",
            tokens.properties.len(),
            tokens.secrets.len(),
            path.display()
        );
        Ok(tokens)
    }
}
