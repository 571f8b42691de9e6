//! Command implementations

pub mod cmd;
pub mod completions;
pub mod history;
pub mod import;
pub mod init;
pub mod node;
pub mod platform;
pub mod vendor;
