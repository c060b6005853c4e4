use crate::factory::ComponentKind;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub logging: LoggingConfig,
  pub receivers: Vec<ComponentConfig>,
  pub processors: Vec<ComponentConfig>,
  pub exporters: Vec<ComponentConfig>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      logging: LoggingConfig::default(),
      receivers: vec![ComponentConfig::new("heartbeat")],
      processors: vec![ComponentConfig::new("batch")],
      exporters: vec![ComponentConfig::new("logging")],
    }
  }
}

impl Config {
  pub fn components(&self, kind: ComponentKind) -> &[ComponentConfig] {
    match kind {
      ComponentKind::Receiver => &self.receivers,
      ComponentKind::Processor => &self.processors,
      ComponentKind::Exporter => &self.exporters,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_log_level")]
  pub level: String,

  #[serde(default = "default_retention_days")]
  pub retention_days: u64,
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_retention_days() -> u64 {
  14
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      retention_days: default_retention_days(),
    }
  }
}

/// One configured pipeline component, referenced by factory type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
  #[serde(rename = "type")]
  pub type_name: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  #[serde(default)]
  pub settings: toml::Table,
}

impl ComponentConfig {
  pub fn new(type_name: &str) -> Self {
    Self {
      type_name: type_name.to_string(),
      name: None,
      settings: toml::Table::new(),
    }
  }

  /// `type` or `type/name`.
  pub fn id(&self) -> String {
    match self.name.as_deref() {
      Some(name) if !name.is_empty() => format!("{}/{}", self.type_name, name),
      _ => self.type_name.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
  #[serde(default)]
  pub logging: Option<LoggingConfig>,

  #[serde(default)]
  pub receivers: Option<Vec<ComponentConfig>>,

  #[serde(default)]
  pub processors: Option<Vec<ComponentConfig>>,

  #[serde(default)]
  pub exporters: Option<Vec<ComponentConfig>>,
}

impl ConfigFile {
  fn normalize(self) -> Config {
    let defaults = Config::default();
    Config {
      logging: self.logging.unwrap_or(defaults.logging),
      receivers: self.receivers.unwrap_or(defaults.receivers),
      processors: self.processors.unwrap_or(defaults.processors),
      exporters: self.exporters.unwrap_or(defaults.exporters),
    }
  }
}

/// Loads the config, writing the defaults first when the file does not exist.
pub fn load_or_create_default(path: &Path) -> anyhow::Result<Config> {
  load_impl(path, true)
}

/// Loads the config without touching the filesystem; a missing file yields defaults.
pub fn load_readonly(path: &Path) -> anyhow::Result<Config> {
  load_impl(path, false)
}

fn load_impl(path: &Path, allow_writes: bool) -> anyhow::Result<Config> {
  if !path.exists() {
    let cfg = Config::default();
    if allow_writes {
      let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("config path has no parent: {}", path.display()))?;
      fs::create_dir_all(parent)
        .with_context(|| format!("create config directory {}", parent.display()))?;
      write_atomic(path, &toml::to_string_pretty(&to_config_file(&cfg))?)?;
    }
    return Ok(cfg);
  }

  let raw = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
  let cfg = parse(&raw).with_context(|| format!("invalid config at {}", path.display()))?;
  Ok(cfg)
}

pub fn parse(raw: &str) -> anyhow::Result<Config> {
  let file: ConfigFile = toml::from_str(raw)?;
  let cfg = file.normalize();
  validate(&cfg)?;
  Ok(cfg)
}

fn validate(cfg: &Config) -> anyhow::Result<()> {
  if cfg.receivers.is_empty() {
    anyhow::bail!("at least one receiver must be configured");
  }
  if cfg.exporters.is_empty() {
    anyhow::bail!("at least one exporter must be configured");
  }

  for kind in [
    ComponentKind::Receiver,
    ComponentKind::Processor,
    ComponentKind::Exporter,
  ] {
    let mut seen = BTreeSet::new();
    for component in cfg.components(kind) {
      if component.type_name.trim().is_empty() {
        anyhow::bail!("{kind} entry is missing its `type`");
      }
      if !seen.insert(component.id()) {
        anyhow::bail!("duplicate {kind} id {:?}", component.id());
      }
    }
  }

  Ok(())
}

fn to_config_file(cfg: &Config) -> ConfigFile {
  ConfigFile {
    logging: Some(cfg.logging.clone()),
    receivers: Some(cfg.receivers.clone()),
    processors: Some(cfg.processors.clone()),
    exporters: Some(cfg.exporters.clone()),
  }
}

fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
  let parent = path
    .parent()
    .ok_or_else(|| anyhow::anyhow!("file path has no parent: {}", path.display()))?;
  let tmp = parent.join(format!(
    ".{}.tmp",
    path.file_name().unwrap_or_default().to_string_lossy()
  ));

  fs::write(&tmp, contents)?;
  fs::rename(&tmp, path)?;
  Ok(())
}
