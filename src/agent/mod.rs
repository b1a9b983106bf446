pub mod context;
pub mod loop_;
pub mod system_prompt;

pub use context::{build_messages, ConversationContext};
pub use loop_::relay_turn;
pub use system_prompt::build_system_prompt;
