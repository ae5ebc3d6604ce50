mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use cli::{Cli, Command, GenerateTarget};
use tracing::info;

use compliai_client::jobs::{
    AuditGenerationRequest, CancelHandle, Domain, ExportFormat, JobOrchestrator, JobOutcome,
    PolicyGenerationRequest, PollingConfig, ProjectsApi,
};
use compliai_client::session::{AuthApi, Session, SessionEvent, TokenStore};
use compliai_client::transport::{Envelope, TransportClient};
use compliai_client::ui::{JobProgress, print_project};
use compliai_client::{ClientConfig, FailureKind};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = ClientConfig::load().context("loading compliai.toml")?;
    if let Some(url) = cli.base_url.clone() {
        config.base_url = url;
    }
    if let Some(max) = cli.max_attempts {
        config.transport.max_attempts = max;
    }
    config.validate()?;

    let tokens = TokenStore::open(config.session_path());
    let session = Session::new(tokens);
    watch_session(&session);
    let client = TransportClient::new(&config, session)?;

    match cli.command {
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => std::env::var("COMPLIAI_PASSWORD")
                    .context("--password not given and COMPLIAI_PASSWORD not set")?,
            };
            let env = AuthApi::new(&client).login(&email, &password).await;
            ensure_ok(&env, "login")?;
            println!("Logged in as {email}");
        }
        Command::Logout => {
            AuthApi::new(&client).logout();
            println!("Logged out");
        }
        Command::Generate {
            target,
            export,
            format,
        } => {
            let (domain, body, description) = match target {
                GenerateTarget::Policy {
                    title,
                    framework,
                    prompt,
                    description,
                } => {
                    let label = title.clone();
                    let body = serde_json::to_value(PolicyGenerationRequest {
                        title,
                        framework,
                        prompt,
                        description,
                    })?;
                    (Domain::PolicyGenerator, body, label)
                }
                GenerateTarget::Audit {
                    title,
                    document_id,
                    framework,
                    description,
                } => {
                    let label = title.clone();
                    let body = serde_json::to_value(AuditGenerationRequest {
                        project_title: title,
                        source_document_id: document_id,
                        target_framework: framework,
                        description,
                    })?;
                    (Domain::AuditPlanner, body, label)
                }
            };

            let orchestrator = orchestrator(&client, &config, domain);
            let cancel = CancelHandle::new();
            cancel_on_ctrl_c(&cancel);

            let progress = JobProgress::start(&description);
            let outcome = orchestrator.run(&body, &cancel, &progress).await;
            progress.complete(&outcome);

            if let (JobOutcome::Completed { project, .. }, Some(path)) = (&outcome, export) {
                export_to(orchestrator.api(), &project.id, format.into(), true, &path).await?;
            }
            exit_for(&outcome)?;
        }
        Command::Watch { domain, project_id } => {
            let orchestrator = orchestrator(&client, &config, domain.into());
            let watch = orchestrator.watch(&project_id)?;
            cancel_on_ctrl_c(&watch.cancel_handle());

            let progress = JobProgress::start(&project_id);
            let outcome = watch.wait(&progress).await;
            progress.complete(&outcome);
            exit_for(&outcome)?;
        }
        Command::Status { domain, project_id } => {
            let api = ProjectsApi::new(client, domain.into());
            let env = api.project(&project_id).await;
            ensure_ok(&env, "status")?;
            if let Some(project) = env.data {
                print_project(&project);
                if !project.status.is_terminal() {
                    println!("Still running; follow it with `compliai watch`.");
                }
            }
        }
        Command::List { domain } => {
            let api = ProjectsApi::new(client, domain.into());
            let env = api.list().await;
            ensure_ok(&env, "list")?;
            for project in env.data.unwrap_or_default() {
                println!("{}  {:<10}  {}", project.id, project.status.to_string(), project.title);
            }
        }
        Command::Frameworks { domain } => {
            let api = ProjectsApi::new(client, domain.into());
            let env = api.frameworks().await;
            ensure_ok(&env, "frameworks")?;
            let frameworks = env.data.unwrap_or_default();
            for framework in frameworks.as_array().into_iter().flatten() {
                let id = framework.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                let name = framework.get("name").and_then(|v| v.as_str()).unwrap_or("");
                println!("{id:<10}  {name}");
            }
        }
        Command::Edit { project_id, file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let api = ProjectsApi::new(client, Domain::PolicyGenerator);
            let env = api.update_content(&project_id, &content).await;
            ensure_ok(&env, "edit")?;
            if let Some(project) = env.data {
                print_project(&project);
            }
        }
        Command::Export {
            domain,
            project_id,
            format,
            output,
            no_metadata,
        } => {
            let api = ProjectsApi::new(client, domain.into());
            let format: ExportFormat = format.into();
            let path = output
                .unwrap_or_else(|| PathBuf::from(format!("{project_id}.{}", format.extension())));
            export_to(&api, &project_id, format, !no_metadata, &path).await?;
        }
        Command::Delete { domain, project_id } => {
            let api = ProjectsApi::new(client, domain.into());
            let env = api.delete(&project_id).await;
            ensure_ok(&env, "delete")?;
            println!("Deleted {project_id}");
        }
    }

    Ok(())
}

fn orchestrator(client: &TransportClient, config: &ClientConfig, domain: Domain) -> JobOrchestrator {
    let api = ProjectsApi::new(client.clone(), domain);
    JobOrchestrator::new(api, PollingConfig::from(&config.polling))
}

/// Log session invalidations as they happen.
fn watch_session(session: &Session) {
    let mut events = session.events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::TokenExpired => {
                    tracing::warn!("session expired; run `compliai login` again")
                }
                SessionEvent::Unauthorized => tracing::warn!("login rejected"),
            }
        }
    });
}

fn cancel_on_ctrl_c(cancel: &CancelHandle) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, no longer watching (the server job keeps running)");
            cancel.cancel();
        }
    });
}

fn ensure_ok<T>(env: &Envelope<T>, what: &str) -> Result<()> {
    if env.success {
        return Ok(());
    }
    let hint = match env.failure_kind() {
        Some(FailureKind::Transient) => " (transient, try again)",
        _ => "",
    };
    Err(anyhow!(
        "{what} failed (status {}): {}{hint}",
        env.status,
        env.error_message()
    ))
}

fn exit_for(outcome: &JobOutcome) -> Result<()> {
    match outcome {
        JobOutcome::Completed { .. } => Ok(()),
        other => bail!("{other}"),
    }
}

async fn export_to(
    api: &ProjectsApi,
    project_id: &str,
    format: ExportFormat,
    include_metadata: bool,
    path: &Path,
) -> Result<()> {
    let file = api
        .export(project_id, format, include_metadata)
        .await
        .map_err(|e| anyhow!("export of {project_id} failed: {e}"))?;
    std::fs::write(path, &file.bytes).with_context(|| format!("writing {}", path.display()))?;
    println!(
        "Exported {} bytes to {}{}",
        file.bytes.len(),
        path.display(),
        file.filename
            .map(|name| format!(" (server name: {name})"))
            .unwrap_or_default()
    );
    Ok(())
}
