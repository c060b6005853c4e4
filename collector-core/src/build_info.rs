/// Identity of the running distribution. Created once in `main` and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
  pub name: String,
  pub description: String,
  pub version: String,
}

impl BuildDescriptor {
  pub fn new(
    name: impl Into<String>,
    description: impl Into<String>,
    version: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      description: description.into(),
      version: version.into(),
    }
  }
}

/// Appends `(Build <n> on <timestamp>)` when the build pipeline stamped those
/// values at compile time.
pub fn stamped_version(base: &str, build_number: Option<&str>, timestamp: Option<&str>) -> String {
  let build_number = build_number.map(str::trim).filter(|s| !s.is_empty());
  let timestamp = timestamp.map(str::trim).filter(|s| !s.is_empty());

  match (build_number, timestamp) {
    (Some(n), Some(ts)) => format!("{base} (Build {n} on {ts})"),
    (Some(n), None) => format!("{base} (Build {n})"),
    (None, Some(ts)) => format!("{base} (built on {ts})"),
    (None, None) => base.to_string(),
  }
}
