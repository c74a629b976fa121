//! depshield - a safety layer for npm dependency changes
//!
//! Instead of installing whatever the registry says is newest, every
//! candidate version passes through a publish-age buffer, a security
//! scan, and explicit confirmation before a script-disabled install.

pub mod cli;
pub mod context;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod progress;
pub mod prompt;
pub mod registry;
pub mod resolver;
pub mod tools;
pub mod workflow;
