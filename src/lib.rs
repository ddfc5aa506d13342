pub mod cli;
pub mod config;
pub mod constants;
pub mod engine;
pub mod provenance;
pub mod service;
pub mod source;
pub mod substitution;
pub mod tokens;

pub use anyhow::Result;
