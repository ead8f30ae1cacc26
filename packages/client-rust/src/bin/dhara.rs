//! `dhara`: terminal console for the document engine API.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dhara_client::controller::{FileUpload, NewDatabase, Row};
use dhara_client::{
    render, ClientConfig, ControllerError, ErrorCategory, ListController, ResourceKind, Session,
};

/// Output format for list and read commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Browse and edit databases, collections, documents and blob buckets.
#[derive(Parser)]
#[command(name = "dhara", version, about = "Document database console")]
struct Cli {
    /// Base URL of the engine API
    #[arg(long, global = true, env = "DHARA_BASE_URL", default_value = "http://localhost:8000")]
    base_url: String,

    /// Bearer token sent with every request
    #[arg(long, global = true, env = "DHARA_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Send plain paths instead of encoded path tokens
    #[arg(long, global = true)]
    plain_paths: bool,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Log format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Query options shared by every list command.
#[derive(Args, Debug, Clone, Default)]
struct ListArgs {
    /// Page to show
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Sort by a field; repeat to click the header again
    #[arg(long = "sort")]
    sort: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Databases
    #[command(subcommand)]
    Db(DbCommands),
    /// Collections of a database
    #[command(subcommand)]
    Col(ColCommands),
    /// Documents of a collection
    #[command(subcommand)]
    Doc(DocCommands),
    /// Blob buckets of a database
    #[command(subcommand)]
    Bucket(BucketCommands),
    /// Files of a blob bucket
    #[command(subcommand)]
    File(FileCommands),
}

#[derive(Subcommand)]
enum DbCommands {
    List {
        #[command(flatten)]
        list: ListArgs,
        /// Only names containing this text
        #[arg(long)]
        search: Option<String>,
    },
    Create {
        name: String,
        /// First collection of the new database
        #[arg(long)]
        collection: String,
    },
    Drop {
        name: String,
        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ColCommands {
    List {
        db: String,
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        search: Option<String>,
    },
    Create {
        db: String,
        name: String,
    },
    Drop {
        db: String,
        name: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum DocCommands {
    List {
        db: String,
        col: String,
        #[command(flatten)]
        list: ListArgs,
        /// JSON filter, e.g. '{"status":"active"}'
        #[arg(long)]
        filter: Option<String>,
    },
    Get {
        db: String,
        col: String,
        id: String,
    },
    Create {
        db: String,
        col: String,
        /// Document as JSON text
        json: String,
    },
    Update {
        db: String,
        col: String,
        id: String,
        /// Replacement document as JSON text
        json: String,
    },
    Delete {
        db: String,
        col: String,
        id: String,
        #[arg(long)]
        yes: bool,
    },
    Export {
        db: String,
        col: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Import {
        db: String,
        col: String,
        /// A .json file holding a list or {"documents": [...]}
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum BucketCommands {
    List {
        db: String,
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        search: Option<String>,
    },
    Drop {
        db: String,
        bucket: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum FileCommands {
    List {
        db: String,
        bucket: String,
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        search: Option<String>,
    },
    Upload {
        db: String,
        bucket: String,
        file: PathBuf,
        /// JSON metadata stored with the file
        #[arg(long, default_value = "{}")]
        metadata: String,
    },
    Meta {
        db: String,
        bucket: String,
        id: String,
    },
    Download {
        db: String,
        bucket: String,
        id: String,
        /// Treat ID as a file name and fetch its latest version
        #[arg(long)]
        by_name: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    View {
        db: String,
        bucket: String,
        id: String,
    },
    Delete {
        db: String,
        bucket: String,
        id: String,
        /// Treat ID as a file name and delete every version
        #[arg(long)]
        by_name: bool,
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = ClientConfig::new(&cli.base_url);
    config.bearer_token.clone_from(&cli.token);
    config.encode_paths = !cli.plain_paths;
    let session = Session::new(config);

    let result = run(&session, cli.command, cli.output).await;

    for note in session.notifications().take_all() {
        eprintln!("{}", render::notification(&note));
    }
    if let Err(err) = &result {
        if !session.overlay().is_visible() && !is_reported(err) {
            eprintln!("error: {err:#}");
        }
        if is_unexpected(err) {
            session
                .overlay()
                .trigger(ErrorCategory::Unknown, None, Some(format!("{err:#}")));
        }
    }

    let overlay = session.overlay().state();
    if overlay.visible {
        let category = overlay.category.unwrap_or(ErrorCategory::Unknown);
        eprintln!(
            "session failure ({category}): {}",
            overlay.detail.as_deref().unwrap_or("reload required")
        );
        return ExitCode::from(2);
    }
    if result.is_err() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Request failures were already turned into a notification or the overlay.
fn is_reported(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ControllerError>()
        .and_then(ControllerError::classified)
        .is_some()
}

/// Failures that are neither classified requests nor local refusals.
fn is_unexpected(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ControllerError>().is_none() && err.downcast_ref::<std::io::Error>().is_none()
}

async fn run(session: &Session, command: Commands, output: OutputFormat) -> Result<()> {
    match command {
        Commands::Db(cmd) => run_db(session, cmd, output).await,
        Commands::Col(cmd) => run_col(session, cmd, output).await,
        Commands::Doc(cmd) => run_doc(session, cmd, output).await,
        Commands::Bucket(cmd) => run_bucket(session, cmd, output).await,
        Commands::File(cmd) => run_file(session, cmd, output).await,
    }
}

async fn run_db(session: &Session, cmd: DbCommands, output: OutputFormat) -> Result<()> {
    let ctl = session.databases();
    match cmd {
        DbCommands::List { list, search } => show_list(&ctl, search, &list, output).await,
        DbCommands::Create { name, collection } => {
            ctl.create(NewDatabase {
                name,
                first_collection: collection,
            })
            .await?;
            Ok(())
        }
        DbCommands::Drop { name, yes } => confirm_removal(&ctl, name, yes).await,
    }
}

async fn run_col(session: &Session, cmd: ColCommands, output: OutputFormat) -> Result<()> {
    match cmd {
        ColCommands::List { db, list, search } => {
            show_list(&session.collections(db), search, &list, output).await
        }
        ColCommands::Create { db, name } => {
            session.collections(db).create(name).await?;
            Ok(())
        }
        ColCommands::Drop { db, name, yes } => {
            confirm_removal(&session.collections(db), name, yes).await
        }
    }
}

async fn run_doc(session: &Session, cmd: DocCommands, output: OutputFormat) -> Result<()> {
    match cmd {
        DocCommands::List {
            db,
            col,
            list,
            filter,
        } => show_list(&session.documents(db, col), filter, &list, output).await,
        DocCommands::Get { db, col, id } => {
            let doc = session.documents(db, col).get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }
        DocCommands::Create { db, col, json } => {
            let ctl = session.documents(db, col);
            let draft = ctl.kind().parse_draft(&json)?;
            ctl.create(draft).await?;
            Ok(())
        }
        DocCommands::Update { db, col, id, json } => {
            let ctl = session.documents(db, col);
            let draft = ctl.kind().parse_draft(&json)?;
            ctl.update(id, draft).await?;
            Ok(())
        }
        DocCommands::Delete { db, col, id, yes } => {
            confirm_removal(&session.documents(db, col), id, yes).await
        }
        DocCommands::Export { db, col, out } => {
            let text = session.documents(db, col).export_json().await?;
            write_output(out.as_deref(), text.as_bytes()).await
        }
        DocCommands::Import { db, col, file } => {
            let (name, data) = read_input(&file).await?;
            session.documents(db, col).import(&name, data).await?;
            Ok(())
        }
    }
}

async fn run_bucket(session: &Session, cmd: BucketCommands, output: OutputFormat) -> Result<()> {
    match cmd {
        BucketCommands::List { db, list, search } => {
            show_list(&session.buckets(db), search, &list, output).await
        }
        BucketCommands::Drop { db, bucket, yes } => {
            confirm_removal(&session.buckets(db), bucket, yes).await
        }
    }
}

async fn run_file(session: &Session, cmd: FileCommands, output: OutputFormat) -> Result<()> {
    match cmd {
        FileCommands::List {
            db,
            bucket,
            list,
            search,
        } => show_list(&session.files(db, bucket), search, &list, output).await,
        FileCommands::Upload {
            db,
            bucket,
            file,
            metadata,
        } => {
            let upload = read_upload(&file).await?.with_metadata(metadata);
            let answer = session.files(db, bucket).upload(upload).await?;
            println!("{}", answer.file_id);
            Ok(())
        }
        FileCommands::Meta { db, bucket, id } => {
            let file = session.files(db, bucket).metadata(&id).await?;
            println!("{}", serde_json::to_string_pretty(&file.0)?);
            Ok(())
        }
        FileCommands::Download {
            db,
            bucket,
            id,
            by_name,
            out,
        } => {
            let ctl = session.files(db, bucket);
            let data = if by_name {
                ctl.download_by_name(&id).await?
            } else {
                ctl.download(&id).await?
            };
            write_output(out.as_deref(), &data).await
        }
        FileCommands::View { db, bucket, id } => {
            let text = session.files(db, bucket).view_inline(&id).await?;
            println!("{text}");
            Ok(())
        }
        FileCommands::Delete {
            db,
            bucket,
            id,
            by_name,
            yes,
        } => {
            let ctl = session.files(db, bucket);
            let prompt = if by_name {
                ctl.request_removal_by_name(id)
            } else {
                ctl.request_removal(id)
            };
            if yes {
                prompt.confirm().await?;
            } else {
                eprintln!("would delete '{}'; pass --yes to confirm", prompt.target());
                prompt.cancel();
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Runs filter, header clicks and page jump in operator order, then prints.
async fn show_list<K: ResourceKind>(
    ctl: &ListController<K>,
    filter: Option<String>,
    list: &ListArgs,
    output: OutputFormat,
) -> Result<()> {
    match filter {
        Some(text) => ctl.set_filter(text).await?,
        None => ctl.fetch().await?,
    };
    for field in &list.sort {
        ctl.toggle_sort(field.clone()).await?;
    }
    if list.page > 1 {
        ctl.goto_page(list.page).await?;
    }

    let view = ctl.snapshot();
    match output {
        OutputFormat::Text => {
            print!(
                "{}",
                render::table(&view.columns, &view.result.items, ctl.session().config().cell_width)
            );
            println!("{}", render::pager(&view));
        }
        OutputFormat::Json => {
            let rows: Vec<_> = view.result.items.iter().map(|i| i.row().into_owned()).collect();
            let body = serde_json::json!({
                "items": rows,
                "total": view.result.total,
                "page": view.query.page,
                "page_size": view.query.page_size,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}

async fn confirm_removal<K: ResourceKind>(ctl: &ListController<K>, id: String, yes: bool) -> Result<()> {
    let prompt = ctl.request_removal(id);
    if yes {
        prompt.confirm().await?;
    } else {
        eprintln!("would delete '{}'; pass --yes to confirm", prompt.target());
        prompt.cancel();
    }
    Ok(())
}

async fn read_input(path: &Path) -> Result<(String, Bytes)> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((name, Bytes::from(data)))
}

async fn read_upload(path: &Path) -> Result<FileUpload> {
    let (name, data) = read_input(path).await?;
    Ok(FileUpload::new(name, data))
}

async fn write_output(out: Option<&Path>, data: &[u8]) -> Result<()> {
    match out {
        Some(path) => tokio::fs::write(path, data)
            .await
            .with_context(|| format!("write {}", path.display())),
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data)?;
            if !data.ends_with(b"\n") {
                stdout.write_all(b"\n")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_repeated_sort() {
        let cli = Cli::try_parse_from([
            "dhara", "doc", "list", "shop", "orders", "--sort", "age", "--sort", "age", "--page", "2",
        ])
        .unwrap();
        let Commands::Doc(DocCommands::List { list, .. }) = cli.command else {
            panic!("expected doc list");
        };
        assert_eq!(list.sort, vec!["age", "age"]);
        assert_eq!(list.page, 2);
    }

    #[test]
    fn cli_global_flags() {
        let cli = Cli::try_parse_from([
            "dhara", "--base-url", "http://db:9000", "--output", "json", "db", "drop", "old", "--yes",
        ])
        .unwrap();
        assert_eq!(cli.base_url, "http://db:9000");
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Db(DbCommands::Drop { yes: true, .. })));
    }

    #[tokio::test]
    async fn export_then_import_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");
        write_output(Some(path.as_path()), br#"{"documents": [{"a": 1}]}"#).await.unwrap();

        let (name, data) = read_input(&path).await.unwrap();
        assert_eq!(name, "orders.json");
        assert_eq!(&data[..], br#"{"documents": [{"a": 1}]}"#);
    }

    #[tokio::test]
    async fn upload_reads_name_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hi").unwrap();
        let upload = read_upload(&path).await.unwrap();
        assert_eq!(upload.file_name, "notes.txt");
        assert_eq!(upload.metadata, "{}");
    }

    #[tokio::test]
    async fn missing_input_is_io_error() {
        let err = read_input(Path::new("/definitely/not/here.json")).await.unwrap_err();
        assert!(err.downcast_ref::<std::io::Error>().is_some());
        assert!(!is_unexpected(&err));
    }
}
