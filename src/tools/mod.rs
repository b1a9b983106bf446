//! Legal toolset: catalog, handlers and dispatch.

pub mod dispatcher;
pub mod error;
pub mod legal;
pub mod registry;
pub mod todo;
pub mod traits;

pub use dispatcher::Dispatcher;
pub use error::{ToolError, ToolErrorKind, ToolResult};
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolContext, ToolDefinition, ToolHandler, ToolOutput, ToolSettings};
