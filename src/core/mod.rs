pub mod api;
pub mod cache;
pub mod filters;
pub mod http;
pub mod pagination;
pub mod refresh;
pub mod schedule;

pub use crate::domain::ports::SessionStore;
pub use crate::utils::error::Result;
pub use api::{Directory, DirectoryApi, ReviewTarget};
pub use http::{ApiRequest, AuthHttpClient, HttpClientConfig};
pub use refresh::RefreshCoordinator;
