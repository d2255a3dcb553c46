//! chat-tabs - Tabbed, filterable chat client core
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::Level;

use chattabs_app::config::default_data_dir;

/// chat-tabs - Tabbed, filterable chat client core
#[derive(Parser, Debug)]
#[command(name = "chattabs")]
#[command(about = "Tabbed, filterable chat client core", long_about = None)]
struct Args {
    /// Directory holding config.toml, tabs.json and history/
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Run in headless mode (stdin commands, NDJSON output)
    #[arg(long)]
    headless: bool,

    /// Log at debug level (CHATTABS_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    chattabs_core::logging::init(Some(&data_dir), level)?;

    if !args.headless {
        eprintln!("No interactive frontend is built in.");
        eprintln!("Run with --headless to drive chat-tabs over stdin/stdout:");
        eprintln!("      chattabs --headless --data-dir {}", data_dir.display());
        std::process::exit(2);
    }

    chat_tabs::run_headless(&data_dir).await?;
    Ok(())
}
