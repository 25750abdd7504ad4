use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use apmap::cli::{run, Cli};
use apmap::error::ApMapError;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(total) => {
            println!("{total:.1} tiles in total");
        }
        Err(err) => {
            let message = match &err {
                ApMapError::AllocationExhausted { automaton } => format!("{automaton} cannot be mapped"),
                _ => err.to_string(),
            };
            error!("{message}");
            eprintln!("{message}");
            std::process::exit(2);
        }
    }
}
