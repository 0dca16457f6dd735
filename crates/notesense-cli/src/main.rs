//! notesense: command-line client for a NoteSense server.
//!
//! Signs in once, persists the credential, then lists, searches, edits and
//! moves notes on the kanban board.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notesense_client::{AuthClient, ClientConfig, FileClient, HttpNoteClient};
use notesense_core::{
    CreateNoteRequest, CredentialStore, FileCredentialStore, FileUploader, MemoryCredentialStore,
    Note, NoteId, NotePatch, NoteStatus, Session,
};
use notesense_sync::{BoardPosition, NotesWorkspace, SyncConfig};

#[derive(Parser)]
#[command(name = "notesense")]
#[command(author, version, about = "Command-line client for NoteSense notes")]
#[command(propagate_version = true)]
struct Cli {
    /// Server origin (overrides NOTESENSE_API_URL, NOTESENSE_AUTH_URL and NOTESENSE_FILES_URL)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Credential file (overrides NOTESENSE_CREDENTIALS)
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the credential
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Create an account and sign in
    Signup {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Sign out and forget the credential
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List notes, optionally searching
    List {
        /// Free-text query over title and content
        #[arg(short, long)]
        query: Option<String>,

        /// Only notes tagged with this category (can specify multiple)
        #[arg(short, long)]
        category: Vec<String>,
    },

    /// Print one note
    Show { id: String },

    /// Create a note
    Create {
        /// Title (default: "Untitled Note" with a random emoji)
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long, default_value = "")]
        content: String,

        #[arg(short, long)]
        emoji: Option<String>,

        /// Category tag (can specify multiple)
        #[arg(long)]
        category: Vec<String>,

        /// File to upload and attach (can specify multiple)
        #[arg(short, long)]
        attach: Vec<PathBuf>,
    },

    /// Change a note's title, content or emoji
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        #[arg(short, long)]
        emoji: Option<String>,
    },

    /// Delete a note
    Delete { id: String },

    /// Show the kanban board
    Board,

    /// Move a card to another column (backlog, todo, in-progress, done)
    Move {
        id: String,

        status: NoteStatus,

        /// Position in the target column (default: top)
        #[arg(short, long, default_value_t = 0)]
        index: usize,
    },

    /// Set a card's priority
    Priority {
        id: String,

        #[arg(value_parser = clap::value_parser!(u8).range(0..=3))]
        priority: u8,
    },

    /// Upload a file to the attachment service
    Upload { path: PathBuf },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Signup { .. } => "signup",
            Self::Logout => "logout",
            Self::Whoami => "whoami",
            Self::List { .. } => "list",
            Self::Show { .. } => "show",
            Self::Create { .. } => "create",
            Self::Edit { .. } => "edit",
            Self::Delete { .. } => "delete",
            Self::Board => "board",
            Self::Move { .. } => "move",
            Self::Priority { .. } => "priority",
            Self::Upload { .. } => "upload",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so command output stays pipeable.
///
/// `RUST_LOG` filters (default `notesense=info`); `NOTESENSE_LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "notesense=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let json = std::env::var("NOTESENSE_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::from_env();
    if let Some(server) = &cli.server {
        let credentials_path = config.credentials_path.take();
        config = ClientConfig::for_server(server);
        config.credentials_path = credentials_path;
    }
    if let Some(path) = &cli.credentials {
        config = config.with_credentials_path(path);
    }
    config.validate()?;
    Ok(config)
}

fn open_session(config: &ClientConfig) -> anyhow::Result<Session> {
    let store: Arc<dyn CredentialStore> = match &config.credentials_path {
        Some(path) => Arc::new(FileCredentialStore::new(path)),
        None => Arc::new(MemoryCredentialStore::new()),
    };
    let session = Session::new(store);
    session.restore().context("failed to read stored credential")?;
    Ok(session)
}

fn workspace(config: &ClientConfig, session: &Session) -> anyhow::Result<NotesWorkspace> {
    if !session.is_authenticated() {
        bail!("not signed in; run `notesense login` first");
    }
    let transport = HttpNoteClient::new(config, session.clone())?;
    let uploader = FileClient::new(config, session.clone())?;
    let mut workspace = NotesWorkspace::new(Arc::new(transport), SyncConfig::from_env())
        .with_uploader(Arc::new(uploader));
    workspace.bind_session(session);
    Ok(workspace)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    debug!(
        api_url = %config.api_url,
        auth_url = %config.auth_url,
        files_url = %config.files_url,
        "Configuration loaded"
    );
    let session = open_session(&config)?;
    let command = cli.command.name();
    let started = std::time::Instant::now();

    match cli.command {
        Commands::Login { email, password } => {
            let auth = AuthClient::new(&config, session)?;
            let credentials = auth.login(&email, &password).await?;
            println!("Signed in as {}", credentials.user.email);
        }
        Commands::Signup {
            name,
            email,
            password,
        } => {
            let auth = AuthClient::new(&config, session)?;
            let credentials = auth.signup(&name, &email, &password).await?;
            println!("Account created for {}", credentials.user.email);
        }
        Commands::Logout => {
            let auth = AuthClient::new(&config, session)?;
            if let Err(e) = auth.logout().await {
                warn!(error = %e, "Server logout failed; local credential cleared");
            }
            println!("Signed out");
        }
        Commands::Whoami => match session.user() {
            Some(user) if user.name.is_empty() => println!("{} ({})", user.email, user.id),
            Some(user) => println!("{} <{}> ({})", user.name, user.email, user.id),
            None => bail!("not signed in"),
        },
        Commands::List { query, category } => {
            let ws = workspace(&config, &session)?;
            ws.search(query.as_deref().unwrap_or(""), &category).await?;
            let notes = ws.notes();
            if notes.is_empty() {
                println!("No notes");
            }
            for note in &notes {
                print_summary(note);
            }
        }
        Commands::Show { id } => {
            let ws = workspace(&config, &session)?;
            let note = ws.open_note(&NoteId::new(id)).await?;
            print_note(&note);
        }
        Commands::Create {
            title,
            content,
            emoji,
            category,
            attach,
        } => {
            let ws = workspace(&config, &session)?;
            let mut req = match title {
                Some(title) => CreateNoteRequest::new(title, content),
                None => CreateNoteRequest {
                    content,
                    ..CreateNoteRequest::untitled()
                },
            }
            .with_categories(category);
            if let Some(emoji) = emoji {
                req = req.with_emoji(emoji);
            }
            let note = if attach.is_empty() {
                ws.create_note(req).await?
            } else {
                let paths: Vec<_> = attach.iter().map(PathBuf::as_path).collect();
                ws.create_note_with_files(req, &paths).await?
            };
            println!("Created {}", note.id);
        }
        Commands::Edit {
            id,
            title,
            content,
            emoji,
        } => {
            let patch = NotePatch {
                title,
                content,
                emoji,
                ..NotePatch::default()
            };
            if patch.is_empty() {
                bail!("nothing to change; pass --title, --content or --emoji");
            }
            let ws = workspace(&config, &session)?;
            let id = NoteId::new(id);
            ws.open_note(&id).await?;
            let note = ws.save(&id, patch).await?;
            print_summary(&note);
        }
        Commands::Delete { id } => {
            let ws = workspace(&config, &session)?;
            ws.delete_note(&NoteId::new(id.clone())).await?;
            println!("Deleted {id}");
        }
        Commands::Board => {
            let ws = workspace(&config, &session)?;
            ws.refresh_kanban().await?;
            for column in ws.board() {
                println!("== {} ({})", column.status.title(), column.notes.len());
                for note in &column.notes {
                    println!(
                        "  [P{}] {} {}  {}",
                        note.priority, note.emoji, note.title, note.id
                    );
                }
            }
        }
        Commands::Move { id, status, index } => {
            let ws = workspace(&config, &session)?;
            ws.refresh_kanban().await?;
            let id = NoteId::new(id);
            let from = ws
                .board()
                .iter()
                .find_map(|column| {
                    column
                        .notes
                        .iter()
                        .position(|n| n.id == id)
                        .map(|i| BoardPosition::new(column.status, i))
                })
                .ok_or_else(|| anyhow!("note {id} is not on the board"))?;
            match ws.move_card(from, BoardPosition::new(status, index)).await? {
                Some(note) => println!("{} is now in {}", note.id, note.status.title()),
                None => println!("{id} already there"),
            }
        }
        Commands::Priority { id, priority } => {
            let ws = workspace(&config, &session)?;
            let id = NoteId::new(id);
            ws.open_note(&id).await?;
            let note = ws.set_priority(&id, priority).await?;
            println!("{} priority {}", note.id, note.priority);
        }
        Commands::Upload { path } => {
            if !session.is_authenticated() {
                bail!("not signed in; run `notesense login` first");
            }
            let files = FileClient::new(&config, session)?;
            let file = files
                .upload(&path)
                .await
                .with_context(|| format!("failed to upload {}", path.display()))?;
            println!("{}  {}  {} bytes", file.id, file.name, file.size);
            if let Some(text) = file.ocr_text.filter(|t| !t.is_empty()) {
                println!("{text}");
            }
        }
    }
    debug!(
        command,
        duration_ms = started.elapsed().as_millis() as u64,
        "Command finished"
    );
    Ok(())
}

fn print_summary(note: &Note) {
    let tags = if note.categories.is_empty() {
        String::new()
    } else {
        format!("  [{}]", note.categories.join(", "))
    };
    println!("{} {} {}  {}{}", note.id, note.emoji, note.title, note.status, tags);
}

fn print_note(note: &Note) {
    println!("{} {}", note.emoji, note.title);
    println!("id:       {}", note.id);
    println!("status:   {} (priority {})", note.status.title(), note.priority);
    if !note.categories.is_empty() {
        println!("tags:     {}", note.categories.join(", "));
    }
    println!("updated:  {}", note.updated_at.format("%Y-%m-%d %H:%M"));
    if !note.content.is_empty() {
        println!();
        println!("{}", note.content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_move_parses_status_aliases() {
        let cli = Cli::try_parse_from(["notesense", "move", "n1", "in-progress", "-i", "2"]).unwrap();
        match cli.command {
            Commands::Move { id, status, index } => {
                assert_eq!(id, "n1");
                assert_eq!(status, NoteStatus::InProgress);
                assert_eq!(index, 2);
            }
            _ => panic!("expected move"),
        }
    }

    #[test]
    fn test_command_names() {
        let cli = Cli::try_parse_from(["notesense", "board"]).unwrap();
        assert_eq!(cli.command.name(), "board");
        let cli = Cli::try_parse_from(["notesense", "show", "n1"]).unwrap();
        assert_eq!(cli.command.name(), "show");
    }

    #[test]
    fn test_priority_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["notesense", "priority", "n1", "4"]).is_err());
    }

    #[test]
    fn test_server_flag_overrides_endpoints() {
        let cli = Cli::try_parse_from([
            "notesense",
            "--server",
            "https://notes.example.com/",
            "--credentials",
            "/tmp/creds.json",
            "whoami",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.api_url, "https://notes.example.com/api");
        assert_eq!(config.auth_url, "https://notes.example.com");
        assert_eq!(
            config.credentials_path,
            Some(PathBuf::from("/tmp/creds.json"))
        );
    }
}
