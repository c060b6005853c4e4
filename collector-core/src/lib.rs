pub mod bootstrap;
pub mod build_info;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod interactive;
pub mod logging;
pub mod mode;
pub mod paths;
pub mod service;
pub mod settings;

#[cfg(test)]
mod testing;

pub use bootstrap::{run, Distribution};
pub use build_info::BuildDescriptor;
pub use error::BootstrapError;
pub use factory::{Component, ComponentKind, ComponentSettings, Factories, Factory, Stability};
