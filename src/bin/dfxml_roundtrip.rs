//! Convert DFXML to a graph and back, and fail if anything was lost.

use std::path::PathBuf;

use case_dfxml::cli::{self, CommonArgs};
use case_dfxml::config::CliOverrides;
use case_dfxml::error::AppError;
use case_dfxml::graph::GraphFormat;
use case_dfxml::pipeline::{self, RoundTripOptions};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Check that DFXML survives a trip through CASE/UCO")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Derive facet and hash identifiers from their owners and values.
    #[arg(long)]
    use_inherent_uuids: bool,

    /// Serialization used for the intermediate graph.
    #[arg(long, default_value = "json-ld")]
    graph_format: String,

    /// Also write the intermediate graph here.
    #[arg(long, value_name = "PATH")]
    keep_graph: Option<PathBuf>,

    /// Also write the reconstructed DFXML here.
    #[arg(long, value_name = "PATH")]
    keep_dfxml: Option<PathBuf>,

    #[arg(value_name = "IN_DFXML")]
    in_dfxml: PathBuf,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let args = Args::parse();
    let graph_format = GraphFormat::from_name(&args.graph_format)?;
    let config = cli::bootstrap(
        &args.common,
        &CliOverrides { use_inherent_uuids: args.use_inherent_uuids, ..CliOverrides::default() },
    )?;

    let options = RoundTripOptions {
        graph_format,
        keep_graph: args.keep_graph,
        keep_dfxml: args.keep_dfxml,
    };
    let outcome = pipeline::round_trip(&config, &args.in_dfxml, &options)?;
    let report = outcome.report.into_result()?;
    info!(files = report.observed_files, "round trip faithful");
    println!("{report}");
    Ok(())
}
