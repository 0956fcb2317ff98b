//! Utility helpers: deployment file operations and secret generation.
pub mod files;
pub mod secrets;

pub use secrets::{RandomSecretGenerator, SecretGenerator};
