//! Core traits defining the interface to the relational store.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Conversation, Course, Document, Embedding, Enrollment, EntityKind, Message, Segment,
    TableView, User,
};

/// Storage layer trait.
///
/// Every insert runs in its own transaction: it either commits the one row it
/// returns, or rolls back and returns a typed error
/// (`DuplicateKey`, `MissingReference`, or a database failure).
#[async_trait]
pub trait Store: Send + Sync {
    // Schema operations
    async fn reset(&self) -> Result<()>;
    async fn table_names(&self) -> Result<Vec<String>>;
    async fn count_rows(&self, kind: EntityKind) -> Result<u64>;
    async fn list_table(&self, kind: EntityKind) -> Result<TableView>;

    // User operations
    async fn add_user(&self, user: User) -> Result<User>;
    async fn get_user(&self, email: &str) -> Result<Option<User>>;

    // Course operations
    async fn add_course(&self, course: Course) -> Result<Course>;
    async fn get_course(&self, course_id: i64) -> Result<Option<Course>>;
    async fn add_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment>;

    // Document operations
    async fn add_document(&self, document: Document) -> Result<Document>;
    async fn get_document(&self, document_id: i64) -> Result<Option<Document>>;
    async fn document_course_name(&self, document_id: i64) -> Result<Option<String>>;
    async fn add_segment(&self, segment: Segment) -> Result<Segment>;
    async fn add_embedding(&self, embedding: Embedding) -> Result<Embedding>;
    async fn get_embedding(&self, embedding_id: i64) -> Result<Option<Embedding>>;

    // Conversation operations
    async fn add_conversation(&self, conversation: Conversation) -> Result<Conversation>;
    async fn add_message(&self, message: Message) -> Result<Message>;
}
