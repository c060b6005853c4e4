use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "HWS_OTEL_HOME";

pub fn base_dir() -> PathBuf {
  if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
    return PathBuf::from(home);
  }
  platform_base_dir()
}

#[cfg(windows)]
fn platform_base_dir() -> PathBuf {
  let program_data = std::env::var("ProgramData").unwrap_or_else(|_| "C:\\ProgramData".into());
  PathBuf::from(program_data).join("Hardware Sentry OTel Collector")
}

#[cfg(not(windows))]
fn platform_base_dir() -> PathBuf {
  PathBuf::from("/var/lib/hws-otel-collector")
}

pub fn config_path(base: &Path) -> PathBuf {
  base.join("otel-config.toml")
}

pub fn logs_dir(base: &Path) -> PathBuf {
  base.join("logs")
}
