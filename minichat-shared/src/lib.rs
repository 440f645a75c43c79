pub mod types;
pub mod errors;
pub mod middleware;
pub mod clients;
pub mod request_log;

pub use types::*;
pub use errors::{AppError, ErrorCode, ErrorKind, AppResult};
