//! chatbot-store - SQLite storage layer for the course chatbot
//!
//! This crate owns the table definitions and the store handle used to reset
//! the schema and insert users, courses, enrollments, documents, segments,
//! embeddings, conversations and messages.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

// Re-export schema for testing
pub use schema::{drop_schema, SCHEMA};
