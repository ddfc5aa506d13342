use anyhow::Result;
use clap::Parser;
use retag::{
    cli::{Cli, Commands, ReplaceTagsArgs},
    config::Config,
    provenance::ProvenanceSource,
    service::{ReplaceRequest, ReplaceService, ScanService, Target},
    tokens::NoMaterializer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::ReplaceTags(args) => {
            let request = build_request(args, &config)?;
            let result = ReplaceService::run(&request, &NoMaterializer)?;

            // Print only the rendered manifest to stdout
            if let Some(rendered) = result.stdout {
                print!("{}", rendered);
            } else {
                info!("Replaced tags in {} file(s)", result.files_written);
            }
        }
        Commands::ScanTokens { path } => {
            let tokens = ScanService::scan(&path)?;
            println!("{}", serde_json::to_string_pretty(&tokens)?);
        }
        Commands::Version => {
            println!("retag {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Merge command line arguments over config defaults
fn build_request(args: ReplaceTagsArgs, config: &Config) -> Result<ReplaceRequest> {
    let target = Target::from_paths(args.infile, args.outfile, args.indirectory, args.outdirectory)?;

    // An origin describes where the tag source file was exported from
    let tag_source_file = (!args.origin.is_given()).then(|| args.tagsource.display().to_string());
    let provenance_source = ProvenanceSource {
        tag_source_file,
        environment: args.origin.environment,
        bundle: args.origin.bundle,
        version: args.origin.bundle_version,
        instance: args.origin.instance,
        instance_uri: args.origin.instanceuri,
        revision: args.origin.revision,
        api_key_id: args.origin.apikeyid,
    };

    Ok(ReplaceRequest {
        tag_source: args.tagsource,
        source_kind: args.source_type.unwrap_or(config.replace.source_type),
        definition: args.defsource,
        target,
        parse_mode: args.parsemode.unwrap_or(config.replace.parse_mode),
        for_diff: args.fordiff,
        provenance: args.provenance.unwrap_or(config.replace.provenance),
        provenance_source,
        namespace: args
            .namespace
            .unwrap_or_else(|| config.tokens.namespace.clone()),
        resolved: args.resolved.or_else(|| config.tokens.resolved.clone()),
    })
}
