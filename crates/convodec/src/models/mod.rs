pub mod assistant;
pub mod content;
pub mod contentref;
pub mod conversation;
pub mod message;
pub mod names;
pub mod system;
pub mod tool;
pub mod user;

pub use content::{Content, ContentPart};
pub use conversation::{Conversation, Node, decode_batch, decode_conversation};
pub use message::{Channel, Message, Recipient, Role, Status};
pub use names::{ModelSlug, ToolName};
