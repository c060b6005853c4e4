use crate::build_info::BuildDescriptor;
use crate::factory::Factories;
use crate::mode::NO_SERVICE_ENV;
use crate::paths::HOME_ENV;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  Run,
  Version,
  Help,
  Components,
  Validate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
  pub command: Command,
  pub config_path: Option<PathBuf>,
}

impl Default for CliOptions {
  fn default() -> Self {
    Self {
      command: Command::Run,
      config_path: None,
    }
  }
}

/// `args` is the full argv, program name included.
pub fn parse_args(args: &[String]) -> anyhow::Result<CliOptions> {
  let mut opts = CliOptions::default();
  let mut iter = args.iter().skip(1);

  while let Some(arg) = iter.next() {
    let command = match arg.as_str() {
      "--help" | "-h" => Command::Help,
      "--version" | "-v" => Command::Version,
      "--components" => Command::Components,
      "--validate" => Command::Validate,
      "--config" => {
        let path = iter
          .next()
          .ok_or_else(|| anyhow::anyhow!("`--config` expects a file path"))?;
        opts.config_path = Some(PathBuf::from(path));
        continue;
      }
      other => {
        if let Some(path) = other.strip_prefix("--config=") {
          if path.is_empty() {
            anyhow::bail!("`--config` expects a file path");
          }
          opts.config_path = Some(PathBuf::from(path));
          continue;
        }
        anyhow::bail!("unknown argument {other:?} (see --help)");
      }
    };

    opts.command = match (opts.command, command) {
      (Command::Help, _) | (_, Command::Help) => Command::Help,
      (Command::Run, c) => c,
      (current, c) if current == c => c,
      (current, c) => {
        anyhow::bail!("conflicting options: {current:?} and {c:?} cannot be combined")
      }
    };
  }

  Ok(opts)
}

pub fn print_help(build: &BuildDescriptor) {
  println!("{} {}", build.name, build.version);
  println!("{}", build.description);
  println!();
  println!("Usage: {} [--config <path>] [--validate | --components]", build.name);
  println!();
  println!("Options:");
  println!("  --config <path>   Pipeline configuration file (default: <home>/otel-config.toml)");
  println!("  --validate        Check the configuration and exit");
  println!("  --components      List the components compiled into this distribution");
  println!("  --version, -v     Print the version and exit");
  println!("  --help, -h        Print this help");
  println!();
  println!("Environment:");
  println!("  {HOME_ENV}        Base directory for configuration and logs");
  println!("  {NO_SERVICE_ENV}  Any value other than 0 skips service detection");
}

pub fn print_components(factories: &Factories) {
  println!("{:<10} {:<16} STABILITY", "KIND", "TYPE");
  for factory in factories.iter() {
    println!(
      "{:<10} {:<16} {}",
      factory.kind.to_string(),
      factory.type_name,
      factory.stability
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn argv(args: &[&str]) -> Vec<String> {
    std::iter::once("hws-otel-collector")
      .chain(args.iter().copied())
      .map(String::from)
      .collect()
  }

  #[test]
  fn no_arguments_runs_with_default_config() {
    assert_eq!(parse_args(&argv(&[])).unwrap(), CliOptions::default());
  }

  #[test]
  fn config_accepts_both_spellings() {
    let opts = parse_args(&argv(&["--config", "C:\\otel.toml"])).unwrap();
    assert_eq!(opts.config_path, Some(PathBuf::from("C:\\otel.toml")));

    let opts = parse_args(&argv(&["--validate", "--config=/etc/otel.toml"])).unwrap();
    assert_eq!(opts.command, Command::Validate);
    assert_eq!(opts.config_path, Some(PathBuf::from("/etc/otel.toml")));
  }

  #[test]
  fn config_without_value_is_an_error() {
    assert!(parse_args(&argv(&["--config"])).is_err());
    assert!(parse_args(&argv(&["--config="])).is_err());
  }

  #[test]
  fn help_wins_over_other_commands() {
    let opts = parse_args(&argv(&["--validate", "-h"])).unwrap();
    assert_eq!(opts.command, Command::Help);
  }

  #[test]
  fn conflicting_commands_are_rejected() {
    let err = parse_args(&argv(&["--validate", "--components"])).unwrap_err();
    assert!(err.to_string().contains("conflicting"));
  }

  #[test]
  fn unknown_arguments_are_rejected() {
    let err = parse_args(&argv(&["--console"])).unwrap_err();
    assert!(err.to_string().contains("--console"));
  }
}
