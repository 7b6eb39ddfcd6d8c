use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use factmail_core::ApiKey;
use factmail_engine::{Dispatcher, DispatcherConfig, FactGenerator};
use factmail_llm::AnthropicProvider;
use factmail_mail::{MailerConfig, SmtpMailer, SmtpTls};
use factmail_server::{DigestSchedule, ServerConfig};
use factmail_settings::{FactmailSettings, StoreBackend, TlsMode};
use factmail_store::{
    Database, PostgrestStore, RecipientDirectory, SentFactLog, SentFactRepo, StoreError,
    SubscriberRepo,
};
use factmail_telemetry::{init_telemetry, LogQuery, SqliteLogSink, TelemetryConfig};

#[derive(Debug, Parser)]
#[command(name = "factmail", about = "Daily LLM-generated fact digest mailer")]
struct Cli {
    /// Settings file (default: ~/.factmail/settings.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server, plus the scheduler when `schedule.cron` is set.
    Serve,
    /// Run one dispatch now and print the summary as JSON.
    Dispatch,
    /// Generate a batch and print the digest body without sending it.
    Preview,
    /// Manage subscriber addresses (SQLite backend).
    Subscribers {
        #[command(subcommand)]
        action: SubscribersAction,
    },
    /// Print persisted warnings and errors from the log database.
    Logs {
        /// Only events from this dispatch (`disp_...`).
        #[arg(long)]
        dispatch: Option<String>,
        /// Only ERROR events.
        #[arg(long)]
        errors: bool,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

#[derive(Debug, Subcommand)]
enum SubscribersAction {
    List,
    Add { emails: Vec<String> },
    Remove { emails: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => factmail_settings::load_settings_from_path(path),
        None => factmail_settings::load_settings(),
    }
    .context("failed to load settings")?;

    init_telemetry(TelemetryConfig::new(
        &settings.logging.level,
        settings.logging.json,
        settings.logging.persist_warnings,
        settings.logging.log_db_path.clone(),
    ));

    match cli.command {
        Command::Serve => serve(&settings).await,
        Command::Dispatch => dispatch(&settings).await,
        Command::Preview => preview(&settings).await,
        Command::Subscribers { action } => subscribers(&settings, action),
        Command::Logs {
            dispatch,
            errors,
            limit,
        } => logs(
            &settings,
            LogQuery {
                dispatch_id: dispatch,
                errors_only: errors,
                limit,
            },
        ),
    }
}

async fn serve(settings: &FactmailSettings) -> Result<()> {
    let dispatcher = Arc::new(build_dispatcher(settings)?);
    let shutdown = CancellationToken::new();

    let schedule = settings
        .schedule
        .cron
        .as_deref()
        .map(DigestSchedule::parse)
        .transpose()
        .context("invalid schedule.cron")?;
    let scheduler = schedule.map(|schedule| {
        factmail_server::spawn_scheduler(schedule, dispatcher.clone(), shutdown.clone())
    });

    let config = ServerConfig {
        host: settings.server.host.clone(),
        port: settings.server.port,
        ..ServerConfig::default()
    };
    let handle = factmail_server::start(config, dispatcher, shutdown.clone())
        .await
        .context("failed to start server")?;
    tracing::info!(port = handle.port, "factmail ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;
    tracing::info!("shutting down");

    shutdown.cancel();
    handle.wait().await;
    if let Some(scheduler) = scheduler {
        let _ = scheduler.await;
    }
    Ok(())
}

async fn dispatch(settings: &FactmailSettings) -> Result<()> {
    let dispatcher = build_dispatcher(settings)?;
    match dispatcher.run().await {
        Ok(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(e) => {
            let body = serde_json::json!({
                "success": false,
                "kind": e.kind(),
                "details": e.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(1);
        }
    }
}

async fn preview(settings: &FactmailSettings) -> Result<()> {
    let dispatcher = build_dispatcher(settings)?;
    let preview = dispatcher.preview().await?;
    for warning in &preview.warnings {
        eprintln!("warning: {warning}");
    }
    print!("{}", preview.body);
    Ok(())
}

fn subscribers(settings: &FactmailSettings, action: SubscribersAction) -> Result<()> {
    if settings.store.backend != StoreBackend::Sqlite {
        bail!("subscriber management is only available with the sqlite backend");
    }
    let repo = SubscriberRepo::new(Database::open(&settings.store.sqlite_path)?);

    match action {
        SubscribersAction::List => {
            for subscriber in repo.list()? {
                println!("{}", subscriber.email);
            }
        }
        SubscribersAction::Add { emails } => {
            for email in emails {
                if repo.add(&email)? {
                    println!("added {email}");
                } else {
                    println!("already subscribed: {email}");
                }
            }
        }
        SubscribersAction::Remove { emails } => {
            for email in emails {
                match repo.remove(&email) {
                    Ok(()) => println!("removed {email}"),
                    Err(StoreError::NotFound(_)) => println!("not subscribed: {email}"),
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
    Ok(())
}

fn logs(settings: &FactmailSettings, query: LogQuery) -> Result<()> {
    let path = &settings.logging.log_db_path;
    if !path.exists() {
        bail!("no log database at {}", path.display());
    }
    let sink = SqliteLogSink::new(path).context("failed to open log database")?;
    let mut records = sink.recent(&query)?;
    // Oldest first reads like a log.
    records.reverse();
    for record in records {
        println!("{record}");
    }
    Ok(())
}

fn build_dispatcher(settings: &FactmailSettings) -> Result<Dispatcher> {
    let (directory, log) = build_store(settings)?;

    let api_key = settings
        .anthropic
        .api_key
        .clone()
        .context("anthropic.apiKey is not set (or ANTHROPIC_API_KEY)")?;
    let provider = AnthropicProvider::new(ApiKey::new(api_key), Some(settings.anthropic.model.as_str()))?
        .with_base_url(settings.anthropic.base_url.clone());
    let generator =
        FactGenerator::new(Arc::new(provider)).with_max_tokens(settings.anthropic.max_tokens);

    let mailer = SmtpMailer::from_config(mailer_config(settings)?)?;

    let config = DispatcherConfig {
        subject: settings.mail.subject.clone(),
        window_days: settings.digest.window_days,
    };
    Ok(Dispatcher::new(
        directory,
        log,
        generator,
        Arc::new(mailer),
        config,
    ))
}

fn build_store(
    settings: &FactmailSettings,
) -> Result<(Arc<dyn RecipientDirectory>, Arc<dyn SentFactLog>)> {
    match settings.store.backend {
        StoreBackend::Sqlite => {
            let db = Database::open(&settings.store.sqlite_path)?;
            let directory: Arc<dyn RecipientDirectory> = Arc::new(SubscriberRepo::new(db.clone()));
            let log: Arc<dyn SentFactLog> = Arc::new(SentFactRepo::new(db));
            Ok((directory, log))
        }
        StoreBackend::Postgrest => {
            let url = settings
                .store
                .postgrest_url
                .clone()
                .context("store.postgrestUrl is not set (or SUPABASE_URL)")?;
            let key = settings
                .store
                .postgrest_key
                .clone()
                .context("store.postgrestKey is not set (or SUPABASE_KEY)")?;
            let store = Arc::new(PostgrestStore::new(url, ApiKey::new(key))?);
            let directory: Arc<dyn RecipientDirectory> = store.clone();
            let log: Arc<dyn SentFactLog> = store;
            Ok((directory, log))
        }
    }
}

fn mailer_config(settings: &FactmailSettings) -> Result<MailerConfig> {
    let mail = &settings.mail;
    let from_address = mail
        .sender_address()
        .context("mail.fromAddress is not set (or GMAIL_USER)")?
        .to_string();
    let tls = match mail.tls {
        TlsMode::Starttls => SmtpTls::Starttls,
        TlsMode::Tls => SmtpTls::Tls,
        TlsMode::None => SmtpTls::None,
    };
    Ok(MailerConfig {
        host: mail.smtp_host.clone(),
        port: mail.smtp_port,
        tls,
        username: mail.username.clone(),
        password: mail.password.clone().map(SecretString::from),
        from_address,
        from_name: Some(mail.from_name.clone()).filter(|n| !n.is_empty()),
        timeout: mail.timeout_secs.map(Duration::from_secs),
    })
}
