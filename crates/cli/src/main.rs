//! # studyrag-cli
//!
//! A thin command-line driver over the same engines `studyrag-server`
//! wires up, for ingesting documents, running one-off queries, and
//! generating study files against a local database without standing up
//! the HTTP server.
//!
//! Every subcommand loads configuration the same way the server does
//! (`studyrag_server::config::get_config`) and builds the same
//! `AppState` (`studyrag_server::state::build_app_state`), so the engines
//! behave identically whether driven from here or from a request.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a config.yml; falls back to `config.yml` in the working
    /// directory, then to built-in defaults, exactly as the server does.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Creates a project owned by the local `guest` identity.
    CreateProject(CreateProjectArgs),
    /// Uploads a file from disk and runs it through the ingestion pipeline.
    Ingest(IngestArgs),
    /// Re-runs ingestion for an already-uploaded document.
    Reingest(ReingestArgs),
    /// Runs a one-off stateless query against a project's indexed chunks.
    Query(QueryArgs),
    /// Generates a study file from a project's indexed chunks.
    GenerateFile(GenerateFileArgs),
}

#[derive(Parser, Debug)]
struct CreateProjectArgs {
    /// Display name for the new project.
    name: String,
}

#[derive(Parser, Debug)]
struct IngestArgs {
    /// Project to ingest the document into.
    project_id: String,
    /// Path to the file on disk.
    path: std::path::PathBuf,
}

#[derive(Parser, Debug)]
struct ReingestArgs {
    document_id: String,
}

#[derive(Parser, Debug)]
struct QueryArgs {
    project_id: String,
    text: String,
}

#[derive(Parser, Debug)]
struct GenerateFileArgs {
    project_id: String,
    /// What kind of file to produce: study-guide, quiz, summary, lesson-plan.
    #[arg(long, value_enum)]
    file_type: commands::FileTypeArg,
    /// Rendering format: pdf or markdown.
    #[arg(long, value_enum, default_value = "markdown")]
    format: commands::FileFormatArg,
    /// Display name for the generated file.
    #[arg(long)]
    title: String,
    /// Instructions describing what the file should cover.
    prompt: String,
    /// Where to write the rendered bytes.
    #[arg(long)]
    out: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = studyrag_server::config::get_config(cli.config.as_deref())?;
    info!(db_url = %config.db_url, "loading studyrag engines");
    let state = studyrag_server::state::build_app_state(config).await?;

    match cli.command {
        Commands::CreateProject(args) => commands::create_project(&state, args.name).await,
        Commands::Ingest(args) => commands::ingest(&state, args.project_id, args.path).await,
        Commands::Reingest(args) => commands::reingest(&state, args.document_id).await,
        Commands::Query(args) => commands::query(&state, args.project_id, args.text).await,
        Commands::GenerateFile(args) => {
            commands::generate_file(
                &state,
                args.project_id,
                args.file_type,
                args.format,
                args.title,
                args.prompt,
                args.out,
            )
            .await
        }
    }
}
