use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use steward::agent::claude::ClaudeClient;
use steward::agent::{Assistant, ClaudeAssistant};
use steward::audit::AuditLog;
use steward::config::AppConfig;
use steward::platform::types::RepoRef;
use steward::platform::Platform;
use steward::server::{create_router, AppState};
use steward::session::Session;
use steward::shutdown::{graceful_shutdown, wait_for_shutdown};
use steward::templates::{export, TemplateBoard};
use steward::triage::{TriageBoard, TriageInput};

#[derive(Parser)]
#[command(
    name = "steward",
    about = "GitHub dashboard backend with AI issue triage and templates"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Generate issue templates from a quick-entry file
    Generate {
        /// One issue per line, optionally tagged like `[feature] Add dark mode`
        file: PathBuf,
        /// Repository the issues are meant for (owner/name)
        #[arg(short, long)]
        repo: Option<String>,
    },
    /// Analyze the open issues of one repository
    Triage {
        /// Repository to triage (owner/name)
        #[arg(short, long)]
        repo: String,
        /// Push labels and comments for every analyzed issue
        #[arg(long)]
        apply: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Generate { file, repo } => generate(config, file, repo).await,
        Command::Triage { repo, apply } => triage(config, repo, apply).await,
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting Steward server"
    );

    let state = Arc::new(AppState::new(config.clone()).await?);
    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        config.server.host, config.server.port
    ))
    .await?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    graceful_shutdown(&state).await;

    Ok(())
}

fn assistant(config: &AppConfig) -> Arc<dyn Assistant> {
    Arc::new(ClaudeAssistant::new(ClaudeClient::new(&config.claude)))
}

async fn generate(config: AppConfig, file: PathBuf, repo: Option<String>) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let board = Arc::new(RwLock::new(TemplateBoard::default()));
    let run = {
        let mut board = board.write().await;
        board.set_repo(repo)?;
        board.load_quick_input(&text)?;
        board.begin_run()?
    };

    let tally = run.execute(Arc::clone(&board), assistant(&config)).await;

    let board = board.read().await;
    println!("{}", export::markdown_export(board.completed_templates()));
    eprintln!("{} generated, {} failed", tally.succeeded, tally.failed);

    Ok(())
}

async fn triage(config: AppConfig, repo: String, apply: bool) -> anyhow::Result<()> {
    let repo: RepoRef = repo.parse()?;
    let token = config
        .github
        .token
        .as_deref()
        .context("A GitHub token is required for triage (github.token)")?;
    let session = Session::connect(token, config.github.api_url.as_deref()).await?;

    let issues = session
        .platform()
        .list_open_issues(&repo, config.triage.issues_per_page)
        .await?;
    if issues.is_empty() {
        eprintln!("No open issues in {repo}");
        return Ok(());
    }

    let board = Arc::new(RwLock::new(TriageBoard::default()));
    let run = {
        let mut board = board.write().await;
        board.replace_issues(
            issues
                .into_iter()
                .map(|issue| TriageInput {
                    repo: repo.clone(),
                    issue,
                })
                .collect(),
        )?;
        board.select_all_untriaged();
        board.begin_bulk_analyze()?
    };

    let tally = run.execute(Arc::clone(&board), assistant(&config)).await;
    eprintln!("{} analyzed, {} failed", tally.succeeded, tally.failed);

    for item in board.read().await.items() {
        let issue = &item.input().issue;
        match item.result() {
            Some(analysis) => println!(
                "#{} {} [{:?}] {} -> {}",
                issue.number,
                issue.title,
                analysis.priority,
                analysis.category,
                analysis.suggested_labels.join(", ")
            ),
            None => println!(
                "#{} {} ({})",
                issue.number,
                issue.title,
                item.error().unwrap_or("not analyzed")
            ),
        }
    }

    if apply && tally.succeeded > 0 {
        let run = board.write().await.begin_bulk_apply()?;
        let tally = run
            .execute(
                Arc::clone(&board),
                session.platform(),
                Arc::new(AuditLog::default()),
                session.login().to_string(),
            )
            .await;
        eprintln!("{} applied, {} failed", tally.succeeded, tally.failed);
    }

    Ok(())
}
