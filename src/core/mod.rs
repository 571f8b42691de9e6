//! Core module - storage, configuration and identity

pub mod actor;
pub mod config;
pub mod store;
pub mod workspace;

pub use actor::{Actor, Role};
pub use config::Config;
pub use store::{
    Command, CommandFilter, CommandView, GroupingNode, ImportRun, Method, NodeTree, Platform,
    Store, StoreError, StoreResult, Vendor,
};
pub use workspace::{Workspace, WorkspaceError};
