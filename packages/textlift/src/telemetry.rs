//! Tracing subscriber setup for the binary.
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "textlift=info,textlift_ocr=info,tower_http=info";

/// Installs the global subscriber. Logs go to stderr so `scan` output on
/// stdout stays machine readable.
pub fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
  let registry = tracing_subscriber::registry().with(filter);

  let installed = match format {
    LogFormat::Json => registry
      .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
      .try_init(),
    LogFormat::Text => registry
      .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
      .try_init(),
  };

  if let Err(e) = installed {
    eprintln!("tracing already initialized: {e}");
  }
}
