//! Split image blocks as used by Bitnami-style Helm charts:
//!
//! ```yaml
//! image:
//!   registry: docker.io
//!   repository: bitnami/redis
//!   tag: 7.0.5
//!   digest: ""
//!   pullPolicy: IfNotPresent
//! ```
//!
//! The four coordinate lines are rewritten together or not at all.

use tracing::debug;

use super::{substitute_line, EngineError, ParseMode};
use crate::substitution::{normalize_docker_hub, KeyValueSorted, Substitution};

const BLOCK_START: &str = "image:";
const MIN_BLOCK_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Registry,
    Repository,
    Tag,
    Digest,
}

impl Field {
    const ALL: [Field; 4] = [Field::Registry, Field::Repository, Field::Tag, Field::Digest];

    fn prefix(self) -> &'static str {
        match self {
            Field::Registry => "registry: ",
            Field::Repository => "repository: ",
            Field::Tag => "tag: ",
            Field::Digest => "digest: ",
        }
    }

    /// Recognize a buffered line, returning the field and its raw value
    fn of(line: &str) -> Option<(Field, &str)> {
        let trimmed = line.trim_matches(' ');
        Field::ALL
            .into_iter()
            .find_map(|field| trimmed.strip_prefix(field.prefix()).map(|v| (field, v)))
    }
}

/// A buffer confirmed to hold all four image coordinate fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitImageBlock {
    lines: Vec<String>,
    registry: String,
    repository: String,
}

impl SplitImageBlock {
    /// Validate buffered lines, the first of which is the `image:` header
    pub fn from_lines(lines: &[String]) -> Option<Self> {
        if lines.len() < MIN_BLOCK_LINES {
            return None;
        }

        let mut seen = [false; 4];
        let mut registry = String::new();
        let mut repository = String::new();
        for (field, value) in lines.iter().filter_map(|line| Field::of(line)) {
            seen[field as usize] = true;
            match field {
                Field::Registry => registry = unquote(value).to_string(),
                Field::Repository => repository = unquote(value).to_string(),
                Field::Tag | Field::Digest => {}
            }
        }

        if !seen.iter().all(|s| *s) {
            return None;
        }
        Some(Self {
            lines: lines.to_vec(),
            registry,
            repository,
        })
    }

    pub fn matching_key(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Find the substitution for this block's image
    pub fn lookup<'s>(&self, sorted: &'s [KeyValueSorted]) -> Option<&'s Substitution> {
        let key = self.matching_key();
        let wanted = normalize_docker_hub(&key);
        sorted
            .iter()
            .find(|kvs| normalize_docker_hub(&kvs.key) == wanted)
            .map(|kvs| &kvs.value)
    }

    /// Rewrite the coordinate lines with `subst`, leaving siblings untouched
    pub fn rewrite(&self, subst: &Substitution) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| {
                let Some((field, _)) = Field::of(line) else {
                    return line.clone();
                };
                let value = match field {
                    Field::Registry => subst.registry.as_str(),
                    Field::Repository => subst.image.as_str(),
                    Field::Tag => subst.tag.as_deref().unwrap_or_default(),
                    Field::Digest => subst.digest.as_deref().unwrap_or_default(),
                };
                let key = line.split(": ").next().unwrap_or(line);
                if value.is_empty() {
                    format!("{}: \"\"", key)
                } else {
                    format!("{}: {}", key, value)
                }
            })
            .collect()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'')
}

#[derive(Debug)]
enum State {
    Idle,
    Buffering { indent: usize, lines: Vec<String> },
}

/// Buffers candidate split image blocks in front of [`substitute_line`]
pub struct BlockParser<'a> {
    sorted: &'a [KeyValueSorted],
    mode: ParseMode,
    state: State,
}

impl<'a> BlockParser<'a> {
    pub fn new(sorted: &'a [KeyValueSorted], mode: ParseMode) -> Self {
        Self {
            sorted,
            mode,
            state: State::Idle,
        }
    }

    pub fn is_buffering(&self) -> bool {
        matches!(self.state, State::Buffering { .. })
    }

    /// Feed one line, appending any lines that are ready to `out`
    pub fn push(&mut self, line: &str, out: &mut Vec<String>) -> Result<(), EngineError> {
        if let State::Buffering { indent, lines } = &mut self.state {
            if is_at_indent(line, *indent) {
                lines.push(line.to_string());
                return Ok(());
            }
            self.flush(out)?;
        }

        if let Some(indent) = block_start_indent(line) {
            self.state = State::Buffering {
                indent,
                lines: vec![line.to_string()],
            };
            return Ok(());
        }

        let (rewritten, _) = substitute_line(line, self.sorted, self.mode)?;
        out.push(rewritten);
        Ok(())
    }

    /// Flush anything still buffered at end of input
    pub fn finish(mut self, out: &mut Vec<String>) -> Result<(), EngineError> {
        self.flush(out)
    }

    fn flush(&mut self, out: &mut Vec<String>) -> Result<(), EngineError> {
        let State::Buffering { lines, .. } = std::mem::replace(&mut self.state, State::Idle) else {
            return Ok(());
        };

        let Some(block) = SplitImageBlock::from_lines(&lines) else {
            for line in &lines {
                let (rewritten, _) = substitute_line(line, self.sorted, self.mode)?;
                out.push(rewritten);
            }
            return Ok(());
        };

        match block.lookup(self.sorted) {
            Some(subst) if subst.has_digest() => {
                debug!("Rewriting split image block {} with {}", block.matching_key(), subst);
                out.extend(block.rewrite(subst));
            }
            None if self.mode == ParseMode::Strict => {
                return Err(EngineError::StrictMiss(block.matching_key()));
            }
            _ => {
                debug!("No pinned digest for split image block {}", block.matching_key());
                out.extend(block.into_lines());
            }
        }
        Ok(())
    }
}

/// Indentation expected for the children of an `image:` header line
fn block_start_indent(line: &str) -> Option<usize> {
    if line.trim_matches(' ') != BLOCK_START {
        return None;
    }
    Some(line.find(BLOCK_START).unwrap_or(0) + 2)
}

fn is_at_indent(line: &str, indent: usize) -> bool {
    let leading = line.chars().take_while(|c| c.is_whitespace()).count();
    leading == indent && leading < line.chars().count()
}
