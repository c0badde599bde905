pub mod adapter;
pub mod config;
pub mod conversation;
pub mod message;
pub mod session;
pub mod transport;
