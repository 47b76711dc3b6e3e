use std::env;
use std::path::PathBuf;

use bioidx_core::config::Config;
use bioidx_core::error::Error;
use bioidx_pipeline::{modes, RunSummary};
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq, Eq)]
struct Args {
    index_dir: PathBuf,
    mode: String,
}

fn usage(prog: &str) -> String {
    let mut text = format!("{prog} <index-output-location> <mode-code>\n\nModes:");
    for mode in modes::MODES {
        text.push_str(&format!("\n  {:<10} {}", mode.code, mode.description));
    }
    text
}

fn parse_args(args: &[String]) -> Result<Args, Error> {
    let prog = args.first().map(String::as_str).unwrap_or("bioidx-indexer");
    match args {
        [_, index_dir, mode] => Ok(Args { index_dir: PathBuf::from(index_dir), mode: mode.clone() }),
        _ => Err(Error::Usage(usage(prog))),
    }
}

fn run(args: &[String]) -> Result<RunSummary, Error> {
    let args = parse_args(args)?;
    let mode = modes::resolve(&args.mode)?;
    let config = Config::load().map_err(|e| Error::InvalidConfig(format!("{e:#}")))?;
    let settings = config.settings()?;
    bioidx_pipeline::run(&args.index_dir, mode.code, &settings)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    match run(&args) {
        Ok(summary) => {
            println!("✅ Indexing completed: {summary}");
        }
        Err(e) => {
            match &e {
                Error::Usage(text) => eprintln!("Usage: {text}"),
                Error::UnknownMode { .. } => {
                    let prog = args.first().map(String::as_str).unwrap_or("bioidx-indexer");
                    eprintln!("Error: {e}\n\nUsage: {}", usage(prog));
                }
                _ => tracing::error!(error = %e, "indexing failed"),
            }
            std::process::exit(e.exit_code());
        }
    }
}
