pub mod circuit_breaker;
pub mod executor;
pub mod retry;
pub mod schema;

pub use circuit_breaker::CircuitBreakerRegistry;
pub use executor::{ExecuteToolOutcome, ExecuteToolRequest, ToolExecutor};
