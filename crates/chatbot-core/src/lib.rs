//! chatbot-core - Core types and traits for the course chatbot store
//!
//! This crate provides the row types, entity catalogue, configuration and
//! error handling shared by the storage layer and the command-line tool.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{ChatbotError, Result};
pub use traits::*;
pub use types::*;
