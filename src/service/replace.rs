//! Replace-tags service
//!
//! Builds the substitution map and resolved token tables once, then rewrites a
//! single manifest or a whole directory tree with them.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::files::{read_manifest_file, read_manifest_tree, ManifestContent};
use crate::{
    engine::{rewrite_lines, ParseMode},
    provenance::{self, ProvenanceSource},
    source::{read_tag_source, restrict_to_definitions, SourceKind},
    substitution::KeyValueSorted,
    tokens::{PlainSecretMaterializer, ResolvedValues, SecretProps, TokenResolver},
};

/// Where manifests are read from and written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// One manifest, written to `outfile` or returned for stdout
    File {
        infile: PathBuf,
        outfile: Option<PathBuf>,
    },
    /// Every file below `indir`, mirrored into `outdir`
    Directory { indir: PathBuf, outdir: PathBuf },
}

impl Target {
    /// Validate the input/output combination given on the command line
    pub fn from_paths(
        infile: Option<PathBuf>,
        outfile: Option<PathBuf>,
        indir: Option<PathBuf>,
        outdir: Option<PathBuf>,
    ) -> Result<Self> {
        match (infile, indir) {
            (Some(infile), None) => Ok(Target::File { infile, outfile }),
            (None, Some(indir)) => {
                if outfile.is_some() {
                    warn!("--outfile is ignored when --indirectory is used; use --outdirectory");
                }
                let outdir = outdir.context(
                    "--outdirectory is required when using --indirectory",
                )?;
                Ok(Target::Directory { indir, outdir })
            }
            _ => anyhow::bail!("Must supply either --infile or --indirectory (but not both)"),
        }
    }
}

/// Everything a replace-tags run needs, fixed before any file is touched
#[derive(Debug, Clone)]
pub struct ReplaceRequest {
    pub tag_source: PathBuf,
    pub source_kind: SourceKind,
    pub definition: Option<PathBuf>,
    pub target: Target,
    pub parse_mode: ParseMode,
    pub for_diff: bool,
    pub provenance: bool,
    pub provenance_source: ProvenanceSource,
    pub namespace: String,
    pub resolved: Option<PathBuf>,
}

/// Result of a replace-tags run
#[derive(Debug)]
pub struct ReplaceResult {
    /// Rendered manifest when no output file was given
    pub stdout: Option<String>,
    pub files_written: usize,
}

/// Service for rewriting manifests against a tag source
pub struct ReplaceService;

impl ReplaceService {
    pub fn run(
        request: &ReplaceRequest,
        materializer: &dyn PlainSecretMaterializer,
    ) -> Result<ReplaceResult> {
        let sorted = Self::load_substitutions(request)?;
        let values = match &request.resolved {
            Some(path) => ResolvedValues::load(path)?,
            None => ResolvedValues::default(),
        };
        let resolver = TokenResolver::new(&values, materializer)
            .with_for_diff(request.for_diff)
            .with_namespace(request.namespace.clone());
        let renderer = Renderer {
            sorted: &sorted,
            resolver: &resolver,
            parse_mode: request.parse_mode,
            header: Self::provenance_header(request),
        };

        match &request.target {
            Target::File { infile, outfile } => {
                let content = read_manifest_file(infile)?;
                Self::log_tokens(&SecretProps::scan(&content));
                let rendered = renderer
                    .render(&content)
                    .with_context(|| format!("Failed to parse infile '{}'", infile.display()))?;

                match outfile {
                    Some(outfile) => {
                        std::fs::write(outfile, rendered).with_context(|| {
                            format!("Failed to write outfile: {}", outfile.display())
                        })?;
                        info!("Wrote {}", outfile.display());
                        Ok(ReplaceResult {
                            stdout: None,
                            files_written: 1,
                        })
                    }
                    None => Ok(ReplaceResult {
                        stdout: Some(rendered),
                        files_written: 0,
                    }),
                }
            }
            Target::Directory { indir, outdir } => {
                let files = read_manifest_tree(indir)?;
                let mut tokens = SecretProps::default();
                for text in files.iter().filter_map(|f| f.content.as_text()) {
                    tokens.extend_from(text);
                }
                Self::log_tokens(&tokens);

                // Render everything before writing so a failure leaves no partial output
                let mut rendered = Vec::with_capacity(files.len());
                for file in &files {
                    let output = match &file.content {
                        ManifestContent::Text(text) => renderer
                            .render(text)
                            .with_context(|| {
                                format!(
                                    "Failed to parse infile '{}'",
                                    indir.join(&file.relative_path).display()
                                )
                            })?
                            .into_bytes(),
                        ManifestContent::Binary(bytes) => bytes.clone(),
                    };
                    rendered.push((outdir.join(&file.relative_path), output));
                }

                for (path, output) in &rendered {
                    Self::write_mirrored(path, output)?;
                }
                info!(
                    "Wrote {} file(s) to {}",
                    rendered.len(),
                    outdir.display()
                );
                Ok(ReplaceResult {
                    stdout: None,
                    files_written: rendered.len(),
                })
            }
        }
    }

    /// Build the sorted substitution list shared by every manifest of the run
    fn load_substitutions(request: &ReplaceRequest) -> Result<Vec<KeyValueSorted>> {
        info!("Reading tag source {}", request.tag_source.display());
        let mut map = read_tag_source(&request.tag_source, request.source_kind)?;

        if let Some(definition) = &request.definition {
            let content = std::fs::read_to_string(definition).with_context(|| {
                format!("Failed to read definition file: {}", definition.display())
            })?;
            restrict_to_definitions(&mut map, &content);
        }

        info!(
            "Loaded {} substitution(s), parse mode {}",
            map.len(),
            request.parse_mode
        );
        Ok(map.sorted())
    }

    fn provenance_header(request: &ReplaceRequest) -> Option<(String, String)> {
        if request.for_diff || !request.provenance {
            return None;
        }
        Some(provenance::render(
            env!("CARGO_PKG_VERSION"),
            &request.provenance_source,
            chrono::Utc::now(),
        ))
    }

    fn write_mirrored(path: &Path, output: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
        std::fs::write(path, output)
            .with_context(|| format!("Failed to write outfile: {}", path.display()))
    }

    fn log_tokens(tokens: &SecretProps) {
        if !tokens.is_empty() {
            info!(
                "Resolving {} property(ies) and {} secret(s)",
                tokens.properties.len(),
                tokens.secrets.len()
            );
        }
    }
}

/// Renders manifests with one fixed set of substitutions and resolved tokens
pub struct Renderer<'a> {
    pub sorted: &'a [KeyValueSorted],
    pub resolver: &'a TokenResolver<'a>,
    pub parse_mode: ParseMode,
    pub header: Option<(String, String)>,
}

impl Renderer<'_> {
    /// Resolve tokens, rewrite images and prepend provenance
    pub fn render(&self, content: &str) -> Result<String> {
        let resolved = content
            .lines()
            .map(|line| self.resolver.resolve_line(line))
            .collect::<Result<Vec<_>, _>>()?;
        let lines = rewrite_lines(resolved.iter().map(String::as_str), self.sorted, self.parse_mode)?;

        let mut output = String::new();
        if let Some((line1, line2)) = &self.header {
            output.push_str(line1);
            output.push('\n');
            output.push_str(line2);
            output.push('\n');
        }
        for line in lines {
            output.push_str(&line);
            output.push('\n');
        }
        Ok(output)
    }
}
