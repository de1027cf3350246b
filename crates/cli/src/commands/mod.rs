pub mod chat;
pub mod config_cmd;
pub mod input;
pub mod memory;
pub mod slash;
