pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod param;
pub mod principal;
pub mod tool_config;
pub mod webhook;

pub use config::Config;
pub use error::{CoreError, ErrorCode, Result};
pub use param::ParamValue;
pub use principal::{ApiKey, KeyType, Principal, Tenant};
