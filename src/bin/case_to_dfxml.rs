//! Convert a CASE/UCO graph back into DFXML.

use std::path::PathBuf;

use case_dfxml::cli::{self, CommonArgs};
use case_dfxml::config::CliOverrides;
use case_dfxml::error::AppError;
use case_dfxml::pipeline;
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(version, about = "Convert a CASE/UCO graph to DFXML")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// json-ld, turtle, xml, or nt. Guessed from IN_GRAPH's extension when omitted.
    #[arg(long)]
    input_format: Option<String>,

    #[arg(value_name = "IN_GRAPH")]
    in_graph: PathBuf,

    #[arg(value_name = "OUT_DFXML")]
    out_dfxml: PathBuf,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let args = Args::parse();
    cli::bootstrap(&args.common, &CliOverrides::default())?;

    let reconstruction = pipeline::case_to_dfxml(
        &args.in_graph,
        &args.out_dfxml,
        args.input_format.as_deref(),
        Some(cli::command_line()),
    )?;
    for a in &reconstruction.ambiguities {
        warn!(
            file = %a.file,
            kept_in = %a.kept_in,
            also_claimed_by = %a.also_claimed_by,
            "file claimed by several file systems"
        );
    }
    info!(
        volumes = reconstruction.document.volumes().len(),
        files = reconstruction.document.file_count(),
        "reconstruction complete"
    );
    Ok(())
}
