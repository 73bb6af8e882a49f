pub mod api;
pub mod config;
pub mod kb;
pub mod sessions;

pub use api::{ApiError, AppState};
pub use config::{ServerConfig, SessionLimits};
pub use kb::SharedKb;
pub use sessions::{SessionEntry, SessionStore};
