//! SQLite-based storage implementation.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{ffi, params, Connection, ErrorCode, OpenFlags, OptionalExtension, Params};
use tracing::{debug, info, warn};

use chatbot_core::{
    ChatbotError, Conversation, Course, DatabaseConfig, Document, Embedding, Enrollment,
    EntityKind, Message, Result, Segment, Store, TableView, User, SQLITE_SCHEME,
};

use crate::schema::{drop_schema, SCHEMA};

/// SQLite-based store implementation.
///
/// The handle owns its connection; there is no process-wide state. Pass it to
/// whatever needs the store and call [`SqliteStore::close`] when done (dropping
/// it also closes the connection).
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Mutex<Connection>,

    /// Redacted connection URL, for logs.
    url: String,
}

impl SqliteStore {
    /// Open the store described by `config`, creating missing tables.
    ///
    /// Existing rows are kept.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if config.scheme != SQLITE_SCHEME {
            return Err(ChatbotError::UnsupportedScheme {
                scheme: config.scheme.clone(),
            });
        }

        let conn = if config.is_memory() {
            Connection::open_in_memory().map_err(|e| {
                ChatbotError::database(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            let path = Path::new(&config.database);

            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| ChatbotError::database(format!("Failed to open database: {}", e)))?
        };

        Self::init(conn, config)
    }

    /// Open the store and drop and recreate every table.
    ///
    /// No rows survive this call. Run it once, before anything else uses the
    /// database.
    pub fn initialize(config: &DatabaseConfig) -> Result<Self> {
        let store = Self::open(config)?;
        store.reset_schema()?;
        Ok(store)
    }

    /// Open a private in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        Self::open(&DatabaseConfig::memory())
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection, config: &DatabaseConfig) -> Result<Self> {
        Self::configure_connection(&conn, config.busy_timeout_ms)?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| ChatbotError::database(format!("Failed to initialize schema: {}", e)))?;

        let url = config.redacted_url();
        info!("Database opened at {}", url);

        Ok(Self {
            conn: Mutex::new(conn),
            url,
        })
    }

    /// Configure the connection. Foreign keys are off by default in SQLite.
    fn configure_connection(conn: &Connection, busy_timeout_ms: u32) -> Result<()> {
        conn.execute_batch(&format!(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = {};
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
            busy_timeout_ms
        ))
        .map_err(|e| ChatbotError::database(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Redacted URL this store was opened with.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Close the connection, reporting any error SQLite raises while doing so.
    pub fn close(self) -> Result<()> {
        let url = self.url;
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| ChatbotError::internal(format!("Connection lock poisoned: {}", e)))?;

        conn.close()
            .map_err(|(_, e)| ChatbotError::database(format!("Failed to close database: {}", e)))?;

        info!("Database closed at {}", url);
        Ok(())
    }

    /// Drop every known table and create them again, in one transaction.
    fn reset_schema(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn
                .transaction()
                .map_err(|e| ChatbotError::database(format!("Failed to begin reset: {}", e)))?;

            tx.execute_batch(&drop_schema())
                .map_err(|e| ChatbotError::database(format!("Failed to drop tables: {}", e)))?;
            tx.execute_batch(SCHEMA)
                .map_err(|e| ChatbotError::database(format!("Failed to create tables: {}", e)))?;

            tx.commit()
                .map_err(|e| ChatbotError::database(format!("Failed to commit reset: {}", e)))?;

            info!("Schema reset: {} tables recreated", EntityKind::ALL.len());
            Ok(())
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ChatbotError::database(e.to_string()))?;
        f(&conn)
    }

    /// Execute a mutable blocking operation on the connection.
    fn with_conn_mut<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ChatbotError::database(e.to_string()))?;
        f(&mut conn)
    }

    /// Insert one row in its own transaction.
    ///
    /// On failure the transaction is rolled back and the SQLite error is
    /// mapped to `DuplicateKey` / `MissingReference` where it is a constraint
    /// violation. `missing` describes the parent that must exist.
    fn insert_row<P: Params>(
        &self,
        kind: EntityKind,
        key: &str,
        missing: &str,
        sql: &str,
        params: P,
    ) -> Result<()> {
        let table = kind.table_name();

        self.with_conn_mut(|conn| {
            let tx = conn
                .transaction()
                .map_err(|e| ChatbotError::database(format!("Failed to begin transaction: {}", e)))?;

            match tx.execute(sql, params) {
                Ok(_) => {
                    tx.commit().map_err(|e| {
                        ChatbotError::database(format!("Failed to commit insert: {}", e))
                    })?;
                    debug!("Inserted into {}: {}", table, key);
                    Ok(())
                }
                Err(e) => {
                    let err = Self::classify(e, table, key, missing);
                    if let Err(rollback) = tx.rollback() {
                        warn!("Rollback failed for {} {}: {}", table, key, rollback);
                    }
                    warn!("Insert into {} rolled back: {}", table, err);
                    Err(err)
                }
            }
        })
    }

    /// Map a SQLite error raised by an insert onto the error taxonomy.
    fn classify(err: rusqlite::Error, table: &str, key: &str, missing: &str) -> ChatbotError {
        if let rusqlite::Error::SqliteFailure(failure, _) = &err {
            if failure.code == ErrorCode::ConstraintViolation {
                match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                        return ChatbotError::duplicate_key(table, key);
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        return ChatbotError::missing_reference(table, missing);
                    }
                    _ => {}
                }
            }
        }

        ChatbotError::database(format!("Failed to insert into {}: {}", table, err))
    }
}

#[async_trait]
impl Store for SqliteStore {
    // Schema operations

    async fn reset(&self) -> Result<()> {
        self.reset_schema()
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )
                .map_err(|e| ChatbotError::database(e.to_string()))?;

            let names = stmt
                .query_map([], |row| row.get(0))
                .map_err(|e| ChatbotError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<String>, _>>()
                .map_err(|e| ChatbotError::database(e.to_string()))?;

            Ok(names)
        })
    }

    async fn count_rows(&self, kind: EntityKind) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM \"{}\"", kind.table_name()),
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| ChatbotError::database(e.to_string()))?;

            Ok(count as u64)
        })
    }

    async fn list_table(&self, kind: EntityKind) -> Result<TableView> {
        let quote = |cols: &[&str]| {
            cols.iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let sql = format!(
            "SELECT {} FROM \"{}\" ORDER BY {}",
            quote(kind.columns()),
            kind.table_name(),
            quote(kind.primary_key())
        );

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| ChatbotError::database(e.to_string()))?;

            let headers: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let width = headers.len();

            let rows = stmt
                .query_map([], |row| {
                    (0..width)
                        .map(|i| row.get_ref(i).map(Self::cell_text))
                        .collect::<rusqlite::Result<Vec<String>>>()
                })
                .map_err(|e| ChatbotError::database(e.to_string()))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| ChatbotError::database(e.to_string()))?;

            Ok(TableView {
                entity: kind,
                headers,
                rows,
            })
        })
    }

    // User operations

    async fn add_user(&self, user: User) -> Result<User> {
        if user.email.trim().is_empty() {
            return Err(ChatbotError::invalid_argument("email must not be empty"));
        }

        self.insert_row(
            EntityKind::User,
            &user.email,
            "referenced row must exist",
            "INSERT INTO Users (email, first_name, last_name, password) VALUES (?1, ?2, ?3, ?4)",
            params![user.email, user.first_name, user.last_name, user.password],
        )?;

        Ok(user)
    }

    async fn get_user(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT email, first_name, last_name, password FROM Users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(User {
                        email: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        password: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(|e| ChatbotError::database(e.to_string()))
        })
    }

    // Course operations

    async fn add_course(&self, course: Course) -> Result<Course> {
        self.insert_row(
            EntityKind::Course,
            &course.course_id.to_string(),
            "referenced row must exist",
            "INSERT INTO Courses (course_id, course_name) VALUES (?1, ?2)",
            params![course.course_id, course.course_name],
        )?;

        Ok(course)
    }

    async fn get_course(&self, course_id: i64) -> Result<Option<Course>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT course_id, course_name FROM Courses WHERE course_id = ?1",
                params![course_id],
                |row| {
                    Ok(Course {
                        course_id: row.get(0)?,
                        course_name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(|e| ChatbotError::database(e.to_string()))
        })
    }

    async fn add_enrollment(&self, enrollment: Enrollment) -> Result<Enrollment> {
        self.insert_row(
            EntityKind::Enrollment,
            &format!("({}, {})", enrollment.email, enrollment.course_id),
            "user and course must exist",
            "INSERT INTO ParticipatesIn (email, course_id, role) VALUES (?1, ?2, ?3)",
            params![enrollment.email, enrollment.course_id, enrollment.role],
        )?;

        Ok(enrollment)
    }

    // Document operations

    async fn add_document(&self, document: Document) -> Result<Document> {
        self.insert_row(
            EntityKind::Document,
            &document.document_id.to_string(),
            "course must exist",
            r#"
            INSERT INTO Documents (document_id, file_path, document_type, course_id)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                document.document_id,
                document.file_path,
                document.document_type,
                document.course_id,
            ],
        )?;

        Ok(document)
    }

    async fn get_document(&self, document_id: i64) -> Result<Option<Document>> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT document_id, file_path, document_type, course_id
                FROM Documents WHERE document_id = ?1
                "#,
                params![document_id],
                |row| {
                    Ok(Document {
                        document_id: row.get(0)?,
                        file_path: row.get(1)?,
                        document_type: row.get(2)?,
                        course_id: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(|e| ChatbotError::database(e.to_string()))
        })
    }

    async fn document_course_name(&self, document_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT c.course_name
                FROM Documents d
                JOIN Courses c ON c.course_id = d.course_id
                WHERE d.document_id = ?1
                "#,
                params![document_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ChatbotError::database(e.to_string()))
        })
    }

    async fn add_segment(&self, segment: Segment) -> Result<Segment> {
        self.insert_row(
            EntityKind::Segment,
            &segment.segment_id.to_string(),
            "document must exist",
            "INSERT INTO Segments (segment_id, text, document_id) VALUES (?1, ?2, ?3)",
            params![segment.segment_id, segment.text, segment.document_id],
        )?;

        Ok(segment)
    }

    async fn add_embedding(&self, embedding: Embedding) -> Result<Embedding> {
        let vector = embedding.vector_text()?;

        self.insert_row(
            EntityKind::Embedding,
            &embedding.embedding_id.to_string(),
            "segment must exist",
            "INSERT INTO Embeddings (embedding_id, vector, segment_id) VALUES (?1, ?2, ?3)",
            params![embedding.embedding_id, vector, embedding.segment_id],
        )?;

        Ok(embedding)
    }

    async fn get_embedding(&self, embedding_id: i64) -> Result<Option<Embedding>> {
        let stored = self.with_conn(|conn| {
            conn.query_row(
                "SELECT embedding_id, vector, segment_id FROM Embeddings WHERE embedding_id = ?1",
                params![embedding_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| ChatbotError::database(e.to_string()))
        })?;

        match stored {
            Some((id, vector, segment_id)) => Ok(Some(Embedding::new(
                id,
                Embedding::parse_vector(&vector)?,
                segment_id,
            ))),
            None => Ok(None),
        }
    }

    // Conversation operations

    async fn add_conversation(&self, conversation: Conversation) -> Result<Conversation> {
        self.insert_row(
            EntityKind::Conversation,
            &conversation.conversation_id.to_string(),
            "initiating user must exist",
            "INSERT INTO Conversations (conversation_id, initiator) VALUES (?1, ?2)",
            params![conversation.conversation_id, conversation.initiator],
        )?;

        Ok(conversation)
    }

    async fn add_message(&self, message: Message) -> Result<Message> {
        self.insert_row(
            EntityKind::Message,
            &message.message_id.to_string(),
            "conversation must exist",
            r#"
            INSERT INTO Messages (message_id, body, timestamp, conversation_id, type)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                message.message_id,
                message.body,
                message.timestamp,
                message.conversation_id,
                message.message_type,
            ],
        )?;

        Ok(message)
    }
}

// Helper methods
impl SqliteStore {
    /// Render one cell for display. NULL renders as an empty cell.
    fn cell_text(value: ValueRef<'_>) -> String {
        match value {
            ValueRef::Null => String::new(),
            ValueRef::Integer(i) => i.to_string(),
            ValueRef::Real(f) => f.to_string(),
            ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
            ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
        }
    }
}
