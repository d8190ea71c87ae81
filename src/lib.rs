pub mod analysis;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod schema;
pub mod storage;
pub mod store;
pub mod tasks;
pub mod utils;
pub mod workers;
pub mod workspace;

pub use context::TenantContext;
pub use error::{AppError, AppResult, ErrorKind};
pub use workers::Worker;
pub use workspace::Workspace;
