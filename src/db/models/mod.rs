//! Database models, one file per table.

pub mod chat_message;
pub mod stream;

pub use self::chat_message::*;
pub use self::stream::*;
