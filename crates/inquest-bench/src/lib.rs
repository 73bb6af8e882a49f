pub mod analytics;
pub mod arena;
pub mod config;
pub mod logging;
pub mod oracle;

pub use arena::{EvalRunner, RunSummary};
pub use config::EvalConfig;
pub use oracle::Oracle;
