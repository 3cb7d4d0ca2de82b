pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{AppConfig, FileSessionStore, MemorySessionStore};
pub use core::{AuthHttpClient, Directory, DirectoryApi, HttpClientConfig};
pub use utils::error::{ClientError, Result};
