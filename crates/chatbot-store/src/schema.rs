//! Database schema definitions.

use chatbot_core::EntityKind;

/// Main schema SQL. Tables are listed parents-first.
pub const SCHEMA: &str = r#"
-- Users, keyed by email
CREATE TABLE IF NOT EXISTS Users (
    email TEXT PRIMARY KEY NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    password TEXT NOT NULL
);

-- Courses
CREATE TABLE IF NOT EXISTS Courses (
    course_id INTEGER PRIMARY KEY,
    course_name TEXT NOT NULL
);

-- Enrollment of users in courses
CREATE TABLE IF NOT EXISTS ParticipatesIn (
    email TEXT NOT NULL REFERENCES Users(email),
    course_id INTEGER NOT NULL REFERENCES Courses(course_id),
    role TEXT NOT NULL,
    PRIMARY KEY (email, course_id)
);

CREATE INDEX IF NOT EXISTS idx_participates_course ON ParticipatesIn(course_id);

-- Documents, optionally attached to a course
CREATE TABLE IF NOT EXISTS Documents (
    document_id INTEGER PRIMARY KEY,
    file_path TEXT NOT NULL,
    document_type TEXT NOT NULL,
    course_id INTEGER REFERENCES Courses(course_id)
);

CREATE INDEX IF NOT EXISTS idx_documents_course ON Documents(course_id);

-- Text segments of documents
CREATE TABLE IF NOT EXISTS Segments (
    segment_id INTEGER PRIMARY KEY,
    text TEXT NOT NULL,
    document_id INTEGER NOT NULL REFERENCES Documents(document_id)
);

CREATE INDEX IF NOT EXISTS idx_segments_document ON Segments(document_id);

-- Embedding vectors, serialized as JSON text
CREATE TABLE IF NOT EXISTS Embeddings (
    embedding_id INTEGER PRIMARY KEY,
    vector TEXT NOT NULL,
    segment_id INTEGER NOT NULL REFERENCES Segments(segment_id)
);

CREATE INDEX IF NOT EXISTS idx_embeddings_segment ON Embeddings(segment_id);

-- Conversations started by a user
CREATE TABLE IF NOT EXISTS Conversations (
    conversation_id INTEGER PRIMARY KEY,
    initiator TEXT NOT NULL REFERENCES Users(email)
);

CREATE INDEX IF NOT EXISTS idx_conversations_initiator ON Conversations(initiator);

-- Messages within a conversation
CREATE TABLE IF NOT EXISTS Messages (
    message_id INTEGER PRIMARY KEY,
    body TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    conversation_id INTEGER NOT NULL REFERENCES Conversations(conversation_id),
    type TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation ON Messages(conversation_id);
"#;

/// SQL dropping every known table, children before parents.
pub fn drop_schema() -> String {
    EntityKind::ALL
        .iter()
        .rev()
        .map(|kind| format!("DROP TABLE IF EXISTS \"{}\";\n", kind.table_name()))
        .collect()
}
