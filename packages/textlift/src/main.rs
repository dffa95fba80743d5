mod cli;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Commands};
use textlift::config::Config;
use textlift::image_result::ImageInput;
use textlift::pipeline::Pipeline;
use textlift::server::{self, AppState};
use textlift::telemetry::init_tracing;

#[tokio::main]
async fn main() {
  let args = Args::parse();

  if let Err(e) = run(args).await {
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
  }
}

async fn run(args: Args) -> Result<()> {
  if let Commands::Version = args.command {
    println!("textlift {}", env!("CARGO_PKG_VERSION"));
    return Ok(());
  }

  dotenvy::dotenv().ok();
  let config = Config::from_env().context("invalid configuration")?;
  init_tracing(config.log_format);

  match args.command {
    Commands::Version => Ok(()),
    Commands::Serve { host, port } => serve(config, host, port).await,
    Commands::Scan { files, pretty } => scan(config, files, pretty).await,
  }
}

async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
  if let Some(host) = host {
    config.server.host = host;
  }
  if let Some(port) = port {
    config.server.port = port;
  }

  tracing::info!("starting textlift v{}", env!("CARGO_PKG_VERSION"));
  let pipeline = Pipeline::from_config(&config).context("failed to initialize OCR engine")?;
  tracing::info!(engine = pipeline.engine_name(), "OCR engine initialized");

  let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
    .parse()
    .with_context(|| format!("invalid bind address {}:{}", config.server.host, config.server.port))?;

  let app = server::router(AppState::new(pipeline, config.upload.clone()));
  server::serve(app, addr).await.context("server error")
}

async fn scan(config: Config, files: Vec<PathBuf>, pretty: bool) -> Result<()> {
  if files.is_empty() {
    anyhow::bail!("no image files given");
  }

  let mut inputs = Vec::with_capacity(files.len());
  for (i, path) in files.iter().enumerate() {
    let bytes = tokio::fs::read(path)
      .await
      .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path.file_name().and_then(|n| n.to_str());
    inputs.push(ImageInput::new(i + 1, name, bytes));
  }

  let pipeline = Pipeline::from_config(&config).context("failed to initialize OCR engine")?;
  let batch = pipeline.process_batch(inputs).await?;

  let json = if pretty {
    serde_json::to_string_pretty(&batch)?
  } else {
    serde_json::to_string(&batch)?
  };
  println!("{}", json);
  Ok(())
}
