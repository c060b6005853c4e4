use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "hws-otel-collector.log";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Service sessions have no console; their output goes to the rolling file only.
pub fn init_file_only(log_dir: &Path, cfg: &LoggingConfig) -> anyhow::Result<()> {
  init_impl(log_dir, cfg, false)
}

pub fn init_file_and_stderr(log_dir: &Path, cfg: &LoggingConfig) -> anyhow::Result<()> {
  init_impl(log_dir, cfg, true)
}

fn init_impl(log_dir: &Path, cfg: &LoggingConfig, stderr: bool) -> anyhow::Result<()> {
  fs::create_dir_all(log_dir)?;
  let pruned = prune_expired_logs(log_dir, cfg.retention_days);

  let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
  let _ = FILE_GUARD.set(guard);

  let filter = tracing_subscriber::EnvFilter::try_new(&cfg.level)
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

  let file_layer = tracing_subscriber::fmt::layer()
    .with_ansi(false)
    .with_writer(file_writer)
    .with_target(true);

  if stderr {
    let stderr_layer = tracing_subscriber::fmt::layer()
      .with_writer(std::io::stderr)
      .with_target(true);

    tracing_subscriber::registry()
      .with(filter)
      .with(file_layer)
      .with(stderr_layer)
      .try_init()?;
  } else {
    tracing_subscriber::registry()
      .with(filter)
      .with(file_layer)
      .try_init()?;
  }

  if pruned > 0 {
    tracing::info!(pruned, retention_days = cfg.retention_days, "removed expired collector logs");
  }
  Ok(())
}

/// Removes collector logs older than the retention window and returns how
/// many went. A window of zero days keeps everything.
fn prune_expired_logs(log_dir: &Path, retention_days: u64) -> usize {
  if retention_days == 0 {
    return 0;
  }
  let window = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60));
  let cutoff = SystemTime::now()
    .checked_sub(window)
    .unwrap_or(SystemTime::UNIX_EPOCH);

  expired_logs(log_dir, cutoff)
    .iter()
    .filter(|path| fs::remove_file(path).is_ok())
    .count()
}

fn expired_logs(log_dir: &Path, cutoff: SystemTime) -> Vec<PathBuf> {
  let Ok(entries) = fs::read_dir(log_dir) else {
    return Vec::new();
  };

  entries
    .flatten()
    .filter(|entry| is_collector_log_file(&entry.path()))
    .filter(|entry| {
      entry
        .metadata()
        .and_then(|md| md.modified())
        .is_ok_and(|modified| modified < cutoff)
    })
    .map(|entry| entry.path())
    .collect()
}

/// The live file or one of its dated rotations.
fn is_collector_log_file(path: &Path) -> bool {
  path
    .file_name()
    .and_then(|name| name.to_str())
    .and_then(|name| name.strip_prefix(LOG_FILE_NAME))
    .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
