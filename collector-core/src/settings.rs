use crate::build_info::BuildDescriptor;
use crate::config::Config;
use crate::factory::Factories;

/// Everything a runner needs to build the pipeline. Assembled once per
/// process and owned by whichever runner was selected.
#[derive(Debug, Clone)]
pub struct RunSettings {
  pub build: BuildDescriptor,
  pub factories: Factories,
  pub config: Config,
  /// Unique per process start; attached to log records.
  pub instance_id: String,
}

impl RunSettings {
  pub fn new(build: BuildDescriptor, factories: Factories, config: Config) -> Self {
    Self {
      build,
      factories,
      config,
      instance_id: uuid::Uuid::new_v4().to_string(),
    }
  }
}
