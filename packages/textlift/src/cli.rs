//! Command line arguments backing the `textlift` binary.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "textlift",
  about = "Extract text and confidence scores from images over HTTP or locally",
  version
)]
pub struct Args {
  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// Run the HTTP service
  Serve {
    /// Address to bind (overrides SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides SERVER_PORT)
    #[arg(long, short = 'p')]
    port: Option<u16>,
  },
  /// Run images through the pipeline and print the batch result as JSON
  Scan {
    /// Image files to process, in order
    files: Vec<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
  },
}
