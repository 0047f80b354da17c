//! Chatbot CLI - set up and inspect the course chatbot store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use chatbot_core::{
    ChatbotConfig, ChatbotError, Course, Document, Enrollment, EntityKind, Store, User,
    DEFAULT_ROLE,
};
use chatbot_store::SqliteStore;

/// Chatbot - schema store for the course chatbot
#[derive(Parser)]
#[command(name = "chatbot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/ucr-chatbot/config.toml, then ./chatbot.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop and recreate every table. Destroys all existing rows.
    Setup {
        /// Insert sample rows and print the affected tables afterwards
        #[arg(long)]
        demo: bool,
    },

    /// Add a user
    AddUser {
        email: String,
        first_name: String,
        last_name: String,
        password: String,
    },

    /// Add a course
    AddCourse { course_id: i64, course_name: String },

    /// Add a document, optionally attached to a course
    AddDocument {
        document_id: i64,
        file_path: String,
        document_type: String,

        /// Course the document belongs to
        #[arg(long)]
        course_id: Option<i64>,
    },

    /// Enroll a user in a course
    Enroll {
        email: String,
        course_id: i64,

        /// Role within the course
        #[arg(long, default_value = DEFAULT_ROLE)]
        role: String,
    },

    /// Print every row of a table (users, courses, participatesin, documents, ...)
    List { entity: EntityKind },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = ChatbotConfig::resolve(cli.config.as_deref())?;

    let store = match cli.command {
        Commands::Setup { .. } => SqliteStore::initialize(&config.database)?,
        _ => SqliteStore::open(&config.database)?,
    };
    info!("Using database {}", store.url());

    let outcome = run(&store, cli.command).await;
    store.close()?;

    if let Err(e) = outcome {
        eprintln!("Error [{}]: {}", e.error_code(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(store: &dyn Store, command: Commands) -> Result<(), ChatbotError> {
    match command {
        Commands::Setup { demo } => {
            println!("Schema recreated.");
            if demo {
                run_demo(store).await?;
            }
        }
        Commands::AddUser {
            email,
            first_name,
            last_name,
            password,
        } => {
            let user = store
                .add_user(User::new(&email, &first_name, &last_name, &password))
                .await?;
            println!("New user added: {}", user.email);
        }
        Commands::AddCourse {
            course_id,
            course_name,
        } => {
            let course = store
                .add_course(Course::new(course_id, &course_name))
                .await?;
            println!("New course added: {} ({})", course.course_name, course.course_id);
        }
        Commands::AddDocument {
            document_id,
            file_path,
            document_type,
            course_id,
        } => {
            let document = store
                .add_document(Document::new(
                    document_id,
                    &file_path,
                    &document_type,
                    course_id,
                ))
                .await?;
            println!("Document added: {}", document.file_path);
        }
        Commands::Enroll {
            email,
            course_id,
            role,
        } => {
            let enrollment = store
                .add_enrollment(Enrollment::new(&email, course_id, &role))
                .await?;
            println!(
                "{} added to course {} as {}",
                enrollment.email, enrollment.course_id, enrollment.role
            );
        }
        Commands::List { entity } => {
            print_table(store, entity).await?;
        }
    }

    Ok(())
}

/// Sample sequence: one user, one course, and the resulting tables.
async fn run_demo(store: &dyn Store) -> Result<(), ChatbotError> {
    report(
        "user",
        store
            .add_user(User::new("student@example.edu", "Emily", "Clark", "mypassword"))
            .await
            .map(|u| u.email),
    );
    print_table(store, EntityKind::User).await?;

    report(
        "course",
        store
            .add_course(Course::new(10, "CS010A"))
            .await
            .map(|c| c.course_name),
    );
    print_table(store, EntityKind::User).await?;
    print_table(store, EntityKind::Enrollment).await?;

    Ok(())
}

fn report(what: &str, outcome: Result<String, ChatbotError>) {
    match outcome {
        Ok(key) => println!("New {} added: {}\n", what, key),
        Err(e) => eprintln!("Error adding {} [{}]: {}\n", what, e.error_code(), e),
    }
}

async fn print_table(store: &dyn Store, entity: EntityKind) -> Result<(), ChatbotError> {
    let view = store.list_table(entity).await?;
    println!("{}\n{}\n", entity, view);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_document_course() {
        let cli = Cli::try_parse_from([
            "chatbot",
            "add-document",
            "1",
            "/docs/syllabus.pdf",
            "pdf",
            "--course-id",
            "10",
        ])
        .unwrap();

        match cli.command {
            Commands::AddDocument {
                document_id,
                course_id,
                ..
            } => {
                assert_eq!(document_id, 1);
                assert_eq!(course_id, Some(10));
            }
            _ => panic!("expected add-document"),
        }
    }

    #[test]
    fn test_cli_enroll_default_role() {
        let cli = Cli::try_parse_from(["chatbot", "enroll", "a@b.com", "10"]).unwrap();
        match cli.command {
            Commands::Enroll { role, .. } => assert_eq!(role, "Student"),
            _ => panic!("expected enroll"),
        }
    }

    #[test]
    fn test_cli_list_entity() {
        let cli = Cli::try_parse_from(["chatbot", "list", "ParticipatesIn"]).unwrap();
        match cli.command {
            Commands::List { entity } => assert_eq!(entity, EntityKind::Enrollment),
            _ => panic!("expected list"),
        }
    }

    #[tokio::test]
    async fn test_demo_sequence() {
        let store = SqliteStore::open_memory().unwrap();
        run_demo(&store).await.unwrap();

        assert_eq!(store.count_rows(EntityKind::User).await.unwrap(), 1);
        assert_eq!(store.count_rows(EntityKind::Course).await.unwrap(), 1);
        assert_eq!(store.count_rows(EntityKind::Enrollment).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_reports_duplicate() {
        let store = SqliteStore::open_memory().unwrap();
        run(
            &store,
            Commands::AddCourse {
                course_id: 10,
                course_name: "CS010A".to_string(),
            },
        )
        .await
        .unwrap();

        let err = run(
            &store,
            Commands::AddCourse {
                course_id: 10,
                course_name: "CS010A".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_KEY");
    }
}
