//! Subcommand implementations.

pub mod args;
pub mod db;
pub mod info;
pub mod misc;
pub mod node;
pub mod subcluster;
