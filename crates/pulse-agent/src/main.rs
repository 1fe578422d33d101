//! pulse agent binary.
//!
//! Reads `pulse.toml` (or the path specified with `--config`), opens the
//! SQLite-backed durable queue, and runs the sampling/upload pipeline until
//! interrupted. `--set-participant` persists a participant identifier and
//! exits without collecting.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use pulse_agent::{
  AgentConfig,
  pipeline::{CollectionPipeline, SignalCells},
  sim,
};
use pulse_core::{lifecycle::SessionEvent, queue::SampleQueue as _};
use pulse_store_sqlite::SqliteQueue;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "pulse collection agent")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "pulse.toml")]
  config: PathBuf,

  /// Persist a participant identifier and exit.
  #[arg(long, value_name = "ID")]
  set_participant: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PULSE"))
    .build()
    .context("failed to read config file")?;

  let mut agent_cfg: AgentConfig = settings
    .try_deserialize()
    .context("failed to deserialise AgentConfig")?;
  agent_cfg.store_path = expand_tilde(&agent_cfg.store_path);

  // One-shot mode: persist the participant id and exit.
  if let Some(id) = cli.set_participant {
    let queue = SqliteQueue::open(&agent_cfg.store_path)
      .await
      .with_context(|| {
        format!("failed to open queue at {:?}", agent_cfg.store_path)
      })?;
    queue
      .set_participant_id(&id)
      .await
      .context("failed to persist participant id")?;
    tracing::info!(participant = %id, "participant configured");
    return Ok(());
  }

  let cells = SignalCells::default();
  let pipeline = CollectionPipeline::new(&agent_cfg, cells.clone())
    .await
    .context("failed to build pipeline")?;

  if let Some(id) = &agent_cfg.participant {
    pipeline.configure_participant(id).await?;
  }

  let feeders = sim::spawn_feeders(&cells);

  // The report timer runs for the whole process; the sampling timer is
  // gated by the session lifecycle.
  pipeline.start_reporting();
  pipeline.handle_session_event(SessionEvent::Started);
  tracing::info!(
    collector = %agent_cfg.collector_url,
    "collecting; press ctrl-c to stop"
  );

  tokio::signal::ctrl_c()
    .await
    .context("failed to listen for ctrl-c")?;

  pipeline.handle_session_event(SessionEvent::WillExpire);
  pipeline.handle_session_event(SessionEvent::Invalidated);
  pipeline.shutdown();
  for feeder in feeders {
    feeder.abort();
  }
  tracing::info!("shut down");

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
