pub mod chat;
pub mod help_requests;
pub mod init;
pub mod live_streams;
pub mod storage;
pub mod streams;
pub mod ttl_registry;
