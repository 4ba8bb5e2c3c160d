pub mod manager;
pub mod truncation;

pub use manager::{
    ContextManager, ContextSummary, CreateContextRequest, UpdateContextRequest, UpdateMode,
    UpdateOptions,
};
pub use truncation::TruncationMethod;
