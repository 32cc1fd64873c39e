pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Commands};

pub use config::{BootstrapConfig, CacheSettings, DatabaseSettings, EntrypointSettings};
pub use core::{
    checklist::{BootstrapContext, BootstrapStep, Checklist},
    entrypoint::Entrypoint,
    gate::ReadinessGate,
    verify::Verifier,
};
pub use utils::error::{OpsError, Result};
