//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use demoforge_core::{
    ChatService, Collaborators, Configurator, JobEvent, JobQueue, Pipeline, PipelineOptions,
    RunSummary, SessionStore, completion_client,
};
use demoforge_shared::{
    AppConfig, WorkflowSpec, config_file_path, init_config, load_config, resolve_credentials,
};

use crate::progress::{CliProgress, result_line};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DemoForge: personalised AI voice receptionist demos for aesthetic practices.
#[derive(Parser)]
#[command(
    name = "demoforge",
    version,
    about = "Find aesthetic practices and build each one a personalised AI voice receptionist demo.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Discover practices and build a demo for each.
    Run {
        /// Number of leads (defaults to `[defaults] lead_count`).
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=20))]
        count: Option<u32>,

        /// Specialty, e.g. "botox" or "dermatology".
        #[arg(long)]
        specialty: Option<String>,

        /// City or country to search in.
        #[arg(long)]
        location: Option<String>,

        /// Explicit search query (overrides specialty/location).
        #[arg(long)]
        query: Option<String>,

        /// Filter phrase such as "exclude chains" (repeatable).
        #[arg(long = "filter")]
        filters: Vec<String>,
    },

    /// Build demos for explicit practice URLs.
    Urls {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Build a demo for one practice URL.
    Url { url: String },

    /// Talk to the assistant; runs start in the background.
    Chat {
        /// Conversation channel id.
        #[arg(long, default_value = "cli")]
        channel: String,
    },

    /// Show recent lead records from the CRM.
    Leads {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
    /// Verify that every required credential is set.
    Check,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "warn,demoforge=info",
        1 => "warn,demoforge=debug",
        _ => "warn,demoforge=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Command::Run {
            count,
            specialty,
            location,
            query,
            filters,
        } => cmd_run(count, specialty, location, query, filters, json).await,
        Command::Urls { urls } => cmd_urls(&urls, json).await,
        Command::Url { url } => cmd_url(&url, json).await,
        Command::Chat { channel } => cmd_chat(&channel).await,
        Command::Leads { limit } => cmd_leads(limit, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
            ConfigAction::Check => cmd_config_check().await,
        },
    }
}

/// Load config, resolve credentials and wire the production pipeline.
fn connect() -> Result<(AppConfig, Arc<Pipeline>, Configurator)> {
    let config = load_config()?;
    let creds = resolve_credentials(&config)?;
    let llm = completion_client(&config, &creds)?;
    let collaborators = Collaborators::connect(&config, &creds, llm.clone())?;
    let pipeline = Pipeline::new(collaborators, PipelineOptions::from_config(&config));
    let configurator = Configurator::new(llm, config.defaults.lead_count);
    Ok((config, Arc::new(pipeline), configurator))
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

async fn cmd_run(
    count: Option<u32>,
    specialty: Option<String>,
    location: Option<String>,
    query: Option<String>,
    filters: Vec<String>,
    json: bool,
) -> Result<()> {
    let (config, pipeline, _) = connect()?;
    let spec = WorkflowSpec {
        lead_count: count.unwrap_or(config.defaults.lead_count),
        specialty,
        location,
        search_query: query,
        filters,
    };

    info!(lead_count = spec.lead_count, "starting run");
    let reporter = CliProgress::new();
    let summary = pipeline.run_workflow(&spec, &reporter).await;
    reporter.finish();
    print_summary(&summary?, json)
}

async fn cmd_urls(urls: &[String], json: bool) -> Result<()> {
    let (_, pipeline, _) = connect()?;
    let reporter = CliProgress::new();
    let summary = pipeline.process_urls(urls, &reporter).await;
    reporter.finish();
    print_summary(&summary?, json)
}

async fn cmd_url(url: &str, json: bool) -> Result<()> {
    let (_, pipeline, _) = connect()?;
    let reporter = CliProgress::new();
    let result = pipeline.process_url(url, &reporter).await;
    reporter.finish();
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!("  {}", result_line(&result));
        if let Some(repo) = &result.repository_url {
            println!("  Repo:   {repo}");
        }
        if let Some(agent) = &result.agent_id {
            println!("  Agent:  {agent}");
        }
        println!();
    }

    if result.is_success() {
        Ok(())
    } else {
        Err(eyre!("lead failed"))
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!();
    for result in &summary.results {
        println!("  {}", result_line(result));
    }
    println!();
    println!(
        "  {} succeeded, {} failed in {:.1}s",
        summary.succeeded,
        summary.failed,
        Duration::from_millis(summary.elapsed_ms).as_secs_f64()
    );
    println!();
    Ok(())
}

async fn cmd_leads(limit: usize, json: bool) -> Result<()> {
    let (_, pipeline, _) = connect()?;
    let records = pipeline.store().recent(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No lead records yet.");
        return Ok(());
    }
    for record in &records {
        println!(
            "  {:<28} {:<32} {}",
            record.company.as_deref().unwrap_or("-"),
            record.demo_url.as_deref().unwrap_or("-"),
            record.agent_id.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

async fn cmd_chat(channel: &str) -> Result<()> {
    let (config, pipeline, configurator) = connect()?;
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(
        config.chat.session_ttl_secs,
    )));
    let chat = ChatService::new(sessions.clone(), configurator, JobQueue::new(pipeline));

    let mut events = chat.jobs().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(JobEvent::Started { job_id }) => info!(%job_id, "job running"),
                Ok(JobEvent::Finished { job_id, summary }) => {
                    println!(
                        "\n[job {job_id}] finished: {} succeeded, {} failed",
                        summary.succeeded, summary.failed
                    );
                    for result in &summary.results {
                        println!("  {}", result_line(result));
                    }
                }
                Ok(JobEvent::Failed { job_id, error }) => {
                    println!("\n[job {job_id}] failed: {error}");
                }
                Err(RecvError::Lagged(missed)) => info!(missed, "job events skipped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("DemoForge chat. Describe the practices you want demos for; Ctrl-D to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        sessions.evict_expired().await;
        let reply = chat.handle_message(channel, line).await;
        println!("{}", reply.text);
        if let Some(job) = &reply.job {
            println!("[job {}] started for {} lead(s)", job.id, job.spec.lead_count);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("# {}", config_file_path()?.display());
    println!("{toml_str}");
    Ok(())
}

async fn cmd_config_check() -> Result<()> {
    let config = load_config()?;
    let creds = resolve_credentials(&config)?;
    println!("All credentials resolved.");
    println!("  CRM database:  {}", creds.crm_database_id);
    println!("  Default agent: {}", creds.default_agent_id);
    Ok(())
}
