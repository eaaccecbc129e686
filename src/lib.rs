//! Library interface for the jb binary and for testing

pub mod cli;
pub mod error;
pub mod manifest;
pub mod packages;
pub mod project;
pub mod utils;
