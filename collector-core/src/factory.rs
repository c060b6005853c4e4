use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
  Receiver,
  Processor,
  Exporter,
}

impl fmt::Display for ComponentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ComponentKind::Receiver => "receiver",
      ComponentKind::Processor => "processor",
      ComponentKind::Exporter => "exporter",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
  Development,
  Alpha,
  Beta,
  Stable,
}

impl fmt::Display for Stability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Stability::Development => "development",
      Stability::Alpha => "alpha",
      Stability::Beta => "beta",
      Stability::Stable => "stable",
    })
  }
}

/// A running pipeline building block. `start` and `shutdown` are each called
/// at most once by the engine.
pub trait Component: Send {
  fn start(&mut self) -> anyhow::Result<()>;
  fn shutdown(&mut self) -> anyhow::Result<()>;
}

/// Per-instance settings handed to a constructor.
#[derive(Debug, Clone)]
pub struct ComponentSettings {
  /// `type` or `type/name`, unique per component kind.
  pub id: String,
  pub settings: toml::Table,
}

impl ComponentSettings {
  /// Decodes the free-form settings table into the component's own type.
  pub fn decode<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
    toml::Value::Table(self.settings.clone())
      .try_into()
      .map_err(|e| anyhow::anyhow!("invalid settings for {}: {e}", self.id))
  }
}

pub type Constructor = fn(&ComponentSettings) -> anyhow::Result<Box<dyn Component>>;

#[derive(Clone)]
pub struct Factory {
  pub kind: ComponentKind,
  pub type_name: &'static str,
  pub stability: Stability,
  pub constructor: Constructor,
}

impl Factory {
  pub fn new(
    kind: ComponentKind,
    type_name: &'static str,
    stability: Stability,
    constructor: Constructor,
  ) -> Self {
    Self {
      kind,
      type_name,
      stability,
      constructor,
    }
  }

  pub fn create(&self, settings: &ComponentSettings) -> anyhow::Result<Box<dyn Component>> {
    (self.constructor)(settings)
  }
}

impl fmt::Debug for Factory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Factory")
      .field("kind", &self.kind)
      .field("type_name", &self.type_name)
      .field("stability", &self.stability)
      .finish_non_exhaustive()
  }
}

/// Snapshot of every component factory compiled into the distribution.
#[derive(Debug, Clone, Default)]
pub struct Factories {
  by_key: BTreeMap<(ComponentKind, String), Factory>,
}

impl Factories {
  pub fn builder() -> FactoriesBuilder {
    FactoriesBuilder::default()
  }

  pub fn get(&self, kind: ComponentKind, type_name: &str) -> Option<&Factory> {
    self.by_key.get(&(kind, type_name.to_string()))
  }

  pub fn iter(&self) -> impl Iterator<Item = &Factory> {
    self.by_key.values()
  }

  pub fn len(&self) -> usize {
    self.by_key.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_key.is_empty()
  }
}

#[derive(Debug, Default)]
pub struct FactoriesBuilder {
  factories: Factories,
  duplicates: Vec<String>,
}

impl FactoriesBuilder {
  pub fn register(mut self, factory: Factory) -> Self {
    let key = (factory.kind, factory.type_name.to_string());
    if self.factories.by_key.contains_key(&key) {
      self
        .duplicates
        .push(format!("{} {:?}", factory.kind, factory.type_name));
    } else {
      self.factories.by_key.insert(key, factory);
    }
    self
  }

  pub fn build(self) -> anyhow::Result<Factories> {
    if !self.duplicates.is_empty() {
      anyhow::bail!(
        "duplicate component factories: {}",
        self.duplicates.join(", ")
      );
    }
    Ok(self.factories)
  }
}
