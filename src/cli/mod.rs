use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::ParseMode;
use crate::source::SourceKind;

#[derive(Parser)]
#[command(name = "retag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a config file (defaults to ~/.config/retag/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replace image tags in k8s, helm or compose files
    ReplaceTags(ReplaceTagsArgs),

    /// List the property and secret keys referenced by a file or directory
    ScanTokens {
        /// File or directory to scan
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
pub struct ReplaceTagsArgs {
    /// Input file to parse, such as a helm values file or docker compose file
    #[arg(long, conflicts_with = "indirectory")]
    pub infile: Option<PathBuf>,

    /// Output file (writes to stdout if not supplied)
    #[arg(long)]
    pub outfile: Option<PathBuf>,

    /// Directory of input files to parse
    #[arg(long)]
    pub indirectory: Option<PathBuf>,

    /// Directory to write output files to (required with --indirectory)
    #[arg(long)]
    pub outdirectory: Option<PathBuf>,

    /// Source file with resolved image tags
    #[arg(long, value_name = "FILE")]
    pub tagsource: PathBuf,

    /// Type of the tag source file
    #[arg(long = "type", value_enum)]
    pub source_type: Option<SourceKind>,

    /// Definition file limiting which images are replaced (e.g. helm template output)
    #[arg(long, value_name = "FILE")]
    pub defsource: Option<PathBuf>,

    /// How aggressively lines are treated as image references
    #[arg(long, value_enum)]
    pub parsemode: Option<ParseMode>,

    /// JSON file with resolved properties and secrets
    #[arg(long, value_name = "FILE")]
    pub resolved: Option<PathBuf>,

    /// Substitute secret timestamps instead of values (disables provenance)
    #[arg(long)]
    pub fordiff: bool,

    /// Add provenance comments to the beginning of the output
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    pub provenance: Option<bool>,

    /// Namespace used to materialize plain secrets
    #[arg(long, env = "RETAG_NAMESPACE")]
    pub namespace: Option<String>,

    #[command(flatten)]
    pub origin: OriginArgs,
}

/// Where the tag source was exported from, recorded in provenance
#[derive(Args, Default)]
pub struct OriginArgs {
    /// Environment the tags were taken from
    #[arg(long = "env")]
    pub environment: Option<String>,

    /// Instance UUID the tags were taken from
    #[arg(long)]
    pub instance: Option<String>,

    /// Instance URI the tags were taken from
    #[arg(long)]
    pub instanceuri: Option<String>,

    /// Instance revision the tags were taken from
    #[arg(long)]
    pub revision: Option<String>,

    /// Bundle the tags were taken from
    #[arg(long)]
    pub bundle: Option<String>,

    /// Bundle version the tags were taken from
    #[arg(long = "bundle-version")]
    pub bundle_version: Option<String>,

    /// API key id used to export the tags
    #[arg(long, env = "RETAG_APIKEYID")]
    pub apikeyid: Option<String>,
}

impl OriginArgs {
    /// Whether any origin was given, making the tag source an export of it
    pub fn is_given(&self) -> bool {
        [
            &self.environment,
            &self.instance,
            &self.instanceuri,
            &self.revision,
            &self.bundle,
            &self.bundle_version,
            &self.apikeyid,
        ]
        .into_iter()
        .any(|value| value.as_deref().is_some_and(|v| !v.is_empty()))
    }
}
