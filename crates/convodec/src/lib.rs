#![forbid(unsafe_code)]

//! Strict decoder for conversational-AI chat exports: shape-migration
//! normalization, role- and content-discriminated validation with zero
//! tolerance for unknown fields, tree assembly with verified invariants,
//! deterministic traversal, and batch-wide identifier shortening.

pub mod accounting;
pub mod cli;
pub mod config;
pub mod decode;
pub mod error;
pub mod models;
pub mod normalize;
pub mod report;
pub mod shorten;
pub mod tree;
pub mod utils;

pub use cli::app::{Cli, Command};
pub use error::{DecodeError, DecodeResult};
pub use models::{Content, Conversation, Message, Node, Role, decode_batch, decode_conversation};
