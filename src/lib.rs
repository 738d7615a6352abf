// Crate root library declaration and module exports.
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod layout;
pub mod matcher;
pub mod model;
pub mod paths;
pub mod pipeline;
pub mod policy;
pub mod session;
pub mod timewindow;
