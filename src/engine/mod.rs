//! Line-oriented image reference rewriting.
//!
//! Manifests are treated as raw text. Each line is matched against the
//! substitution map with the longest keys first, so `myorg/foo-ext` is never
//! rewritten through the shorter `myorg/foo` entry. Split image blocks are
//! handled by the [`bitnami`] state machine before lines reach
//! [`substitute_line`].

use std::fmt;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::constants::registry;
use crate::substitution::KeyValueSorted;

pub mod bitnami;

pub use bitnami::{BlockParser, SplitImageBlock};


static IMAGE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*image:").unwrap());
/// An `image:` key carrying a value; bare block headers never fail strict mode
static STRICT_IMAGE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*image:\s*\S").unwrap());

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("parse mode is set to 'strict' and cannot find artifact in substitution map: {0}")]
    StrictMiss(String),
}

/// How aggressively lines are treated as image references
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Only rewrite lines starting with an `image:` key
    Simple,
    /// Rewrite any line containing a known image
    #[default]
    Extended,
    /// Like extended, but fail on `image:` lines with no known image
    Strict,
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseMode::Simple => "simple",
            ParseMode::Extended => "extended",
            ParseMode::Strict => "strict",
        };
        f.write_str(name)
    }
}

/// Rewrite a single line, returning the new line and whether it was substituted
pub fn substitute_line(
    line: &str,
    sorted: &[KeyValueSorted],
    mode: ParseMode,
) -> Result<(String, bool), EngineError> {
    for kvs in sorted {
        let Some(base) = base_image_text(line, &kvs.key, mode) else {
            continue;
        };

        // `foo:` headers and `foo: bar` keys name the image, they don't reference it
        if line.ends_with(':') || line.contains(&format!("{}: ", base)) {
            continue;
        }
        if mode == ParseMode::Simple && !IMAGE_LINE.is_match(line) {
            continue;
        }

        let Some(start) = line.find(base) else {
            continue;
        };
        let prefix = &line[..start];
        let prefix = prefix.strip_suffix('"').unwrap_or(prefix);
        let prefix = prefix.strip_suffix('\'').unwrap_or(prefix);

        let replacement = kvs.value.to_string();
        debug!("Substituting {} with {}", kvs.key, replacement);
        return Ok((format!("{}{}", prefix, replacement), true));
    }

    if mode == ParseMode::Strict && STRICT_IMAGE_LINE.is_match(line) {
        return Err(EngineError::StrictMiss(line.trim().to_string()));
    }
    Ok((line.to_string(), false))
}

/// Locate the text within `line` that refers to `key`, trying the implicit
/// Docker Hub forms when the full key is absent
fn base_image_text<'k>(line: &str, key: &'k str, mode: ParseMode) -> Option<&'k str> {
    let references = |text: &str| {
        line.contains(&format!("{}:", text))
            || line.contains(&format!("{}@", text))
            || line.ends_with(text)
    };

    if references(key) {
        return Some(key);
    }

    let without_registry = key.strip_prefix(registry::DEFAULT_PREFIX).unwrap_or(key);
    if references(without_registry) {
        return Some(without_registry);
    }

    // The bare library name is short enough to hit unrelated text, so it is
    // only trusted outside URLs and, in simple mode, right after `image:`
    let library = key.strip_prefix(registry::LIBRARY_PREFIX).unwrap_or(key);
    if line.contains(&format!("//{}", library)) {
        return None;
    }
    let lowered = line.to_lowercase();
    let after_image_key = lowered.contains(&format!("image: {}", library))
        || lowered.contains(&format!("image:{}", library));
    let tagged = line.contains(&format!("{}:", library)) || line.contains(&format!("{}@", library));

    let matched = match mode {
        ParseMode::Simple => after_image_key,
        ParseMode::Extended | ParseMode::Strict => after_image_key || tagged,
    };
    matched.then_some(library)
}

/// Rewrite every line of a manifest
pub fn rewrite_lines<'a>(
    lines: impl IntoIterator<Item = &'a str>,
    sorted: &[KeyValueSorted],
    mode: ParseMode,
) -> Result<Vec<String>, EngineError> {
    let mut parser = BlockParser::new(sorted, mode);
    let mut out = Vec::new();
    for line in lines {
        parser.push(line, &mut out)?;
    }
    parser.finish(&mut out)?;
    Ok(out)
}
