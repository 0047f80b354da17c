//! Core domain types for the chatbot schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChatbotError, Result};

/// Role assigned to an enrollment when the caller does not name one.
pub const DEFAULT_ROLE: &str = "Student";

/// The tables known to the schema.
///
/// `ALL` lists them parents-first, which is the creation order; dropping walks
/// it in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Course,
    Enrollment,
    Document,
    Segment,
    Embedding,
    Conversation,
    Message,
}

impl EntityKind {
    /// Every entity, parents before children.
    pub const ALL: [EntityKind; 8] = [
        Self::User,
        Self::Course,
        Self::Enrollment,
        Self::Document,
        Self::Segment,
        Self::Embedding,
        Self::Conversation,
        Self::Message,
    ];

    /// SQL table name.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::User => "Users",
            Self::Course => "Courses",
            Self::Enrollment => "ParticipatesIn",
            Self::Document => "Documents",
            Self::Segment => "Segments",
            Self::Embedding => "Embeddings",
            Self::Conversation => "Conversations",
            Self::Message => "Messages",
        }
    }

    /// Primary-key columns, in key order.
    pub fn primary_key(&self) -> &'static [&'static str] {
        match self {
            Self::User => &["email"],
            Self::Course => &["course_id"],
            Self::Enrollment => &["email", "course_id"],
            Self::Document => &["document_id"],
            Self::Segment => &["segment_id"],
            Self::Embedding => &["embedding_id"],
            Self::Conversation => &["conversation_id"],
            Self::Message => &["message_id"],
        }
    }

    /// All columns, in declaration order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::User => &["email", "first_name", "last_name", "password"],
            Self::Course => &["course_id", "course_name"],
            Self::Enrollment => &["email", "course_id", "role"],
            Self::Document => &["document_id", "file_path", "document_type", "course_id"],
            Self::Segment => &["segment_id", "text", "document_id"],
            Self::Embedding => &["embedding_id", "vector", "segment_id"],
            Self::Conversation => &["conversation_id", "initiator"],
            Self::Message => &["message_id", "body", "timestamp", "conversation_id", "type"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for EntityKind {
    type Err = ChatbotError;

    /// Accepts the table name or the singular entity name, in any case.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| {
                let table = kind.table_name().to_lowercase();
                wanted == table || wanted == format!("{:?}", kind).to_lowercase()
            })
            .ok_or_else(|| ChatbotError::UnknownEntity {
                name: s.to_string(),
            })
    }
}

/// A registered user, identified by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Stored as given; no hashing is applied.
    pub password: String,
}

impl User {
    pub fn new(email: &str, first_name: &str, last_name: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: password.to_string(),
        }
    }
}

/// A course that users enroll in and documents belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: i64,
    pub course_name: String,
}

impl Course {
    pub fn new(course_id: i64, course_name: &str) -> Self {
        Self {
            course_id,
            course_name: course_name.to_string(),
        }
    }
}

/// Membership of a user in a course (the `ParticipatesIn` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub email: String,
    pub course_id: i64,
    pub role: String,
}

impl Enrollment {
    pub fn new(email: &str, course_id: i64, role: &str) -> Self {
        Self {
            email: email.to_string(),
            course_id,
            role: role.to_string(),
        }
    }

    /// Enrollment with the default "Student" role.
    pub fn student(email: &str, course_id: i64) -> Self {
        Self::new(email, course_id, DEFAULT_ROLE)
    }
}

/// A source document, optionally attached to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub document_id: i64,
    pub file_path: String,
    pub document_type: String,
    pub course_id: Option<i64>,
}

impl Document {
    pub fn new(
        document_id: i64,
        file_path: &str,
        document_type: &str,
        course_id: Option<i64>,
    ) -> Self {
        Self {
            document_id,
            file_path: file_path.to_string(),
            document_type: document_type.to_string(),
            course_id,
        }
    }
}

/// A chunk of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: i64,
    pub text: String,
    pub document_id: i64,
}

impl Segment {
    pub fn new(segment_id: i64, text: &str, document_id: i64) -> Self {
        Self {
            segment_id,
            text: text.to_string(),
            document_id,
        }
    }
}

/// A vector computed over one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub embedding_id: i64,
    pub vector: Vec<f32>,
    pub segment_id: i64,
}

impl Embedding {
    pub fn new(embedding_id: i64, vector: Vec<f32>, segment_id: i64) -> Self {
        Self {
            embedding_id,
            vector,
            segment_id,
        }
    }

    /// Text form stored in the `vector` column (a JSON array).
    ///
    /// JSON has no NaN or infinity, so non-finite components are rejected.
    pub fn vector_text(&self) -> Result<String> {
        if let Some(i) = self.vector.iter().position(|v| !v.is_finite()) {
            return Err(ChatbotError::invalid_argument(format!(
                "embedding {} has a non-finite component at index {}",
                self.embedding_id, i
            )));
        }
        Ok(serde_json::to_string(&self.vector)?)
    }

    /// Parse the stored text form back into a vector.
    pub fn parse_vector(text: &str) -> Result<Vec<f32>> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A conversation started by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: i64,
    /// Email of the initiating user.
    pub initiator: String,
}

impl Conversation {
    pub fn new(conversation_id: i64, initiator: &str) -> Self {
        Self {
            conversation_id,
            initiator: initiator.to_string(),
        }
    }
}

/// One message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub body: String,
    /// Free-form timestamp text, e.g. RFC 3339.
    pub timestamp: String,
    pub conversation_id: i64,
    #[serde(rename = "type")]
    pub message_type: String,
}

impl Message {
    pub fn new(
        message_id: i64,
        body: &str,
        timestamp: &str,
        conversation_id: i64,
        message_type: &str,
    ) -> Self {
        Self {
            message_id,
            body: body.to_string(),
            timestamp: timestamp.to_string(),
            conversation_id,
            message_type: message_type.to_string(),
        }
    }
}

/// All rows of one table, rendered to strings for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    /// Which table the rows came from.
    pub entity: EntityKind,

    /// Column headers.
    pub headers: Vec<String>,

    /// Row cells, one `Vec` per row, aligned with `headers`.
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// Render as a psql-style grid.
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let rule = |left: char, mid: char, right: char| {
            let inner: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
            format!("{}{}{}", left, inner.join(mid.to_string().as_str()), right)
        };
        let line = |cells: &[String]| {
            let padded: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let cell = cells.get(i).map(String::as_str).unwrap_or("");
                    let pad = w - cell.chars().count().min(*w);
                    format!(" {}{} ", cell, " ".repeat(pad))
                })
                .collect();
            format!("|{}|", padded.join("|"))
        };

        let mut out = Vec::with_capacity(self.rows.len() + 4);
        out.push(rule('+', '+', '+'));
        out.push(line(&self.headers));
        out.push(rule('|', '+', '|'));
        for row in &self.rows {
            out.push(line(row));
        }
        out.push(rule('+', '+', '+'));
        out.join("\n")
    }
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_from_str() {
        assert_eq!("Users".parse::<EntityKind>().unwrap(), EntityKind::User);
        assert_eq!("user".parse::<EntityKind>().unwrap(), EntityKind::User);
        assert_eq!(
            "participatesin".parse::<EntityKind>().unwrap(),
            EntityKind::Enrollment
        );
        assert_eq!(
            "enrollment".parse::<EntityKind>().unwrap(),
            EntityKind::Enrollment
        );
        assert!("widgets".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_entity_key_is_subset_of_columns() {
        for kind in EntityKind::ALL {
            for key in kind.primary_key() {
                assert!(kind.columns().contains(key), "{} missing {}", kind, key);
            }
        }
    }

    #[test]
    fn test_embedding_vector_text() {
        let embedding = Embedding::new(1, vec![0.5, -1.0, 2.25], 7);
        let text = embedding.vector_text().unwrap();
        assert_eq!(text, "[0.5,-1.0,2.25]");
        assert_eq!(Embedding::parse_vector(&text).unwrap(), embedding.vector);
    }

    #[test]
    fn test_embedding_vector_text_rejects_non_finite() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = Embedding::new(1, vec![1.0, bad], 7).vector_text().unwrap_err();
            assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        }
    }

    #[test]
    fn test_table_view_render() {
        let view = TableView {
            entity: EntityKind::Course,
            headers: vec!["course_id".to_string(), "course_name".to_string()],
            rows: vec![vec!["10".to_string(), "CS010A".to_string()]],
        };

        let rendered = view.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "+-----------+-------------+");
        assert_eq!(lines[1], "| course_id | course_name |");
        assert_eq!(lines[2], "|-----------+-------------|");
        assert_eq!(lines[3], "| 10        | CS010A      |");
        assert_eq!(lines[4], "+-----------+-------------+");
    }

    #[test]
    fn test_table_view_render_empty() {
        let view = TableView {
            entity: EntityKind::Enrollment,
            headers: vec!["email".to_string(), "course_id".to_string(), "role".to_string()],
            rows: Vec::new(),
        };
        assert_eq!(view.render().lines().count(), 4);
    }
}
