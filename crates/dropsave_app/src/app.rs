use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use dropsave_engine::{
    session_channel, ClientSettings, CredentialProvider, DropboxClient, FileBackend, JobStore,
    Notice, NoticeSink, Poller, StaticCredentials, SubmitOutcome, Supervisor, Tracker,
    TrackerError,
};
use engine_logging::engine_info;

use crate::cli::{Cli, Command};
use crate::config::{AppConfig, TOKEN_ENV};
use crate::logging;
use crate::render::{render_record, render_report, render_table};

/// Prints notices to stderr, in place of a blocking alert.
struct ConsoleNoticeSink;

impl NoticeSink for ConsoleNoticeSink {
    fn emit(&self, notice: Notice) {
        engine_info!("{}", notice);
        eprintln!("{notice}");
    }
}

struct Services {
    tracker: Arc<Tracker>,
    credentials: Arc<StaticCredentials>,
}

impl Services {
    fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let client = DropboxClient::new(ClientSettings::with_api_base(config.api_base.clone()))
            .context("failed to build HTTP client")?;
        let store = Arc::new(JobStore::open(Arc::new(FileBackend::new(&config.state_dir))));
        let credentials = Arc::new(StaticCredentials::new(config.access_token.clone()));
        let tracker = Arc::new(Tracker::new(
            Arc::new(client),
            store,
            credentials.clone(),
            Arc::new(ConsoleNoticeSink),
        ));
        Ok(Self {
            tracker,
            credentials,
        })
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(state_dir) = cli.state_dir {
        config.state_dir = state_dir;
    }
    logging::initialize(&config);
    engine_info!("Using state directory {:?}", config.state_dir);

    let services = Services::build(&config)?;
    match cli.command {
        Command::Submit { path, url } => submit(&services, &path, &url).await,
        Command::List { json } => list(&services, json).await,
        Command::Delete { id } => delete(&services, &id).await,
        Command::Refresh => refresh(&services).await,
        Command::Watch { until_settled } => watch(&services, &config, until_settled).await,
    }
}

async fn submit(services: &Services, path: &str, url: &str) -> anyhow::Result<ExitCode> {
    match services.tracker.on_submit(path, url).await {
        Ok(SubmitOutcome::Tracked(record)) => {
            println!("{}", render_record(&record));
            Ok(ExitCode::SUCCESS)
        }
        // The notice sink already told the user why.
        Ok(SubmitOutcome::Rejected(_)) => Ok(ExitCode::FAILURE),
        Err(TrackerError::Validation(err)) => {
            eprintln!("{err}");
            Ok(ExitCode::from(2))
        }
        Err(TrackerError::NotAuthenticated) => {
            print_sign_in_hint();
            Ok(ExitCode::FAILURE)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

async fn list(services: &Services, json: bool) -> anyhow::Result<ExitCode> {
    if json {
        let jobs = services.tracker.jobs().await?;
        println!("{}", serde_json::to_string_pretty(&jobs)?);
    } else {
        print!("{}", render_table(&services.tracker.view().await?));
    }
    Ok(ExitCode::SUCCESS)
}

async fn delete(services: &Services, id: &str) -> anyhow::Result<ExitCode> {
    if services.tracker.delete(id).await? {
        println!("Deleted job {id}");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("No job with id {id}");
        Ok(ExitCode::FAILURE)
    }
}

async fn refresh(services: &Services) -> anyhow::Result<ExitCode> {
    if !services.credentials.is_authenticated() {
        print_sign_in_hint();
        return Ok(ExitCode::FAILURE);
    }
    let report = services.tracker.refresh_all().await?;
    println!("{}", render_report(&report));
    print!("{}", render_table(&services.tracker.view().await?));
    Ok(ExitCode::SUCCESS)
}

async fn watch(services: &Services, config: &AppConfig, until_settled: bool) -> anyhow::Result<ExitCode> {
    if !services.credentials.is_authenticated() {
        print_sign_in_hint();
        return Ok(ExitCode::FAILURE);
    }

    let view = services.tracker.view().await?;
    print!("{}", render_table(&view));
    if until_settled && !view.has_pending() {
        return Ok(ExitCode::SUCCESS);
    }

    let poller = Poller::new(services.tracker.clone(), config.poll_interval());
    let mut cycles = poller.subscribe();
    let (session, events) = session_channel();
    let supervisor = tokio::spawn(Supervisor::new(poller, events).run());
    session.sign_in();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            changed = cycles.changed() => {
                if changed.is_err() {
                    break;
                }
                let summary = *cycles.borrow_and_update();
                let view = services.tracker.view().await?;
                println!("{}", render_report(&summary.report));
                print!("{}", render_table(&view));
                if until_settled && !view.has_pending() {
                    break;
                }
            }
        }
    }

    session.shutdown();
    supervisor.await.context("session supervisor panicked")?;
    Ok(ExitCode::SUCCESS)
}

fn print_sign_in_hint() {
    eprintln!("Not signed in: set {TOKEN_ENV} or access_token in the config file");
}
