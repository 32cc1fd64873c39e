#[cfg(feature = "cli")]
pub mod cli;
pub mod settings;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{Cli, Commands};
pub use settings::{CacheSettings, DatabaseSettings, EntrypointSettings};
pub use toml_config::BootstrapConfig;
