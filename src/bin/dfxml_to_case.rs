//! Convert a DFXML file into a CASE/UCO graph.

use std::path::PathBuf;

use case_dfxml::cli::{self, CommonArgs};
use case_dfxml::config::CliOverrides;
use case_dfxml::error::AppError;
use case_dfxml::pipeline;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Convert DFXML to a CASE/UCO graph")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Prefix label for the knowledge-base namespace.
    #[arg(long)]
    kb_prefix_label: Option<String>,

    /// Namespace IRI for generated individuals. Must end with '/' or '#'.
    #[arg(long)]
    kb_prefix_iri: Option<String>,

    /// json-ld, turtle, xml, or nt. Guessed from OUT_GRAPH's extension when omitted.
    #[arg(long)]
    output_format: Option<String>,

    /// Derive facet and hash identifiers from their owners and values.
    #[arg(long)]
    use_inherent_uuids: bool,

    /// Draw identifiers from a seeded sequence instead of random UUIDs.
    #[arg(long)]
    deterministic: bool,

    #[arg(value_name = "IN_DFXML")]
    in_dfxml: PathBuf,

    #[arg(value_name = "OUT_GRAPH")]
    out_graph: PathBuf,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let args = Args::parse();
    let config = cli::bootstrap(
        &args.common,
        &CliOverrides {
            kb_prefix_label: args.kb_prefix_label.clone(),
            kb_prefix_iri: args.kb_prefix_iri.clone(),
            use_inherent_uuids: args.use_inherent_uuids,
            deterministic: args.deterministic,
        },
    )?;

    let stats = pipeline::dfxml_to_case(&config, &args.in_dfxml, &args.out_graph, args.output_format.as_deref())?;
    info!(
        volumes = stats.volumes,
        files = stats.files,
        hashes = stats.hashes,
        "conversion complete"
    );
    Ok(())
}
