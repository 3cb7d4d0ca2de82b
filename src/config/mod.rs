pub mod session_store;
pub mod toml_config;

#[cfg(feature = "cli")]
pub mod cli;

pub use session_store::{FileSessionStore, MemorySessionStore};
pub use toml_config::AppConfig;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
