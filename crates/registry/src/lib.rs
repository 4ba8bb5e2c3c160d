pub mod discovery;
pub mod health;
pub mod openapi;
pub mod registry;

pub use registry::{
    ConfirmToolSelection, DiscoverToolRequest, ToolFilter, ToolRegistry, UpdateToolRequest,
};
