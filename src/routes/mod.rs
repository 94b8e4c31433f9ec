pub mod chat;
pub mod expert;
pub mod extract;
pub mod health;
pub mod streams;
pub mod upload;
