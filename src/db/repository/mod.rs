pub mod chat_message;
pub mod stream;

pub use chat_message::ChatMessageRepository;
pub use stream::StreamRepository;
