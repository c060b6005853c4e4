//! Process startup: assemble the factories, pick the execution mode once,
//! then hand over to exactly one runner.

use crate::build_info::BuildDescriptor;
use crate::cli::{self, CliOptions, Command};
use crate::config::{self, LoggingConfig};
use crate::engine::{EngineHandle, PipelineEngine};
use crate::error::BootstrapError;
use crate::factory::Factories;
use crate::interactive;
use crate::logging;
use crate::mode::{self, Mode, SessionProbe};
use crate::paths;
use crate::service;
use crate::settings::RunSettings;
use std::path::Path;
use std::sync::Arc;

/// What a distribution binary supplies.
pub struct Distribution {
  pub build: BuildDescriptor,
  pub components: fn() -> anyhow::Result<Factories>,
  pub engine: Box<dyn PipelineEngine>,
}

/// Process-global side effects, kept behind one seam so startup can be
/// exercised without a real console or service manager.
pub trait Host: SessionProbe {
  fn init_logging(&self, mode: Mode, log_dir: &Path, cfg: &LoggingConfig) -> anyhow::Result<()>;

  fn install_interrupt(&self, handle: Arc<dyn EngineHandle>) -> anyhow::Result<()>;

  fn run_managed(
    &self,
    settings: RunSettings,
    engine: Box<dyn PipelineEngine>,
  ) -> Result<(), BootstrapError>;
}

pub struct SystemHost {
  probe: Box<dyn SessionProbe>,
}

impl SystemHost {
  pub fn new() -> Self {
    Self {
      probe: mode::platform_probe(),
    }
  }
}

impl Default for SystemHost {
  fn default() -> Self {
    Self::new()
  }
}

impl SessionProbe for SystemHost {
  fn is_interactive_session(&self) -> anyhow::Result<bool> {
    self.probe.is_interactive_session()
  }
}

impl Host for SystemHost {
  fn init_logging(&self, mode: Mode, log_dir: &Path, cfg: &LoggingConfig) -> anyhow::Result<()> {
    match mode {
      Mode::Interactive => logging::init_file_and_stderr(log_dir, cfg),
      Mode::Managed => logging::init_file_only(log_dir, cfg),
    }
  }

  fn install_interrupt(&self, handle: Arc<dyn EngineHandle>) -> anyhow::Result<()> {
    interactive::install_ctrlc(handle)
  }

  fn run_managed(
    &self,
    settings: RunSettings,
    engine: Box<dyn PipelineEngine>,
  ) -> Result<(), BootstrapError> {
    service::run_managed(settings, engine)
  }
}

/// Entry point for distribution binaries.
pub fn run(dist: Distribution, args: &[String]) -> Result<(), BootstrapError> {
  let options = cli::parse_args(args).map_err(BootstrapError::StartupAssembly)?;
  let result = run_with(&SystemHost::new(), dist, &options);
  if let Err(e) = &result {
    tracing::error!(kind = e.kind(), error = ?e, "collector terminated with a fatal error");
  }
  result
}

pub fn run_with<H: Host>(
  host: &H,
  dist: Distribution,
  options: &CliOptions,
) -> Result<(), BootstrapError> {
  match options.command {
    Command::Version => {
      println!("{} version {}", dist.build.name, dist.build.version);
      return Ok(());
    }
    Command::Help => {
      cli::print_help(&dist.build);
      return Ok(());
    }
    Command::Run | Command::Components | Command::Validate => {}
  }

  let factories = (dist.components)()
    .map_err(|e| BootstrapError::StartupAssembly(e.context("failed to build components")))?;

  if options.command == Command::Components {
    cli::print_components(&factories);
    return Ok(());
  }

  let base = paths::base_dir();
  let config_path = options
    .config_path
    .clone()
    .unwrap_or_else(|| paths::config_path(&base));

  if options.command == Command::Validate {
    let cfg = config::load_readonly(&config_path).map_err(BootstrapError::StartupAssembly)?;
    let settings = RunSettings::new(dist.build, factories, cfg);
    dist
      .engine
      .build(&settings)
      .map_err(BootstrapError::StartupAssembly)?;
    println!("configuration {} is valid", config_path.display());
    return Ok(());
  }

  let mode = mode::select_mode(host)?;

  let cfg = config::load_or_create_default(&config_path).map_err(BootstrapError::StartupAssembly)?;
  host
    .init_logging(mode, &paths::logs_dir(&base), &cfg.logging)
    .map_err(|e| BootstrapError::StartupAssembly(e.context("failed to initialize logging")))?;

  let settings = RunSettings::new(dist.build, factories, cfg);
  tracing::info!(
    name = %settings.build.name,
    version = %settings.build.version,
    instance_id = %settings.instance_id,
    mode = ?mode,
    config = %config_path.display(),
    "starting {}",
    settings.build.description
  );

  match mode {
    Mode::Interactive => interactive::run_interactive(&settings, dist.engine.as_ref(), |handle| {
      host.install_interrupt(handle)
    }),
    Mode::Managed => host.run_managed(settings, dist.engine),
  }
}
