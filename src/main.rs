/// Dozlab - ephemeral lab sessions on Kubernetes
///
/// Renders the lab session template into a Pod, a Service and a Secret,
/// creates them as one logical unit with rollback on partial failure, and
/// manages their lifecycle through canonical per-session names.
mod config;
mod error;
mod k8s;
mod session;
mod template;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{SessionOptions, SessionRequest};
use crate::error::Error;
use crate::k8s::{credentials, KubeClient};
use crate::session::{
    DeleteOutcome, SessionDeletion, SessionInspector, SessionOrchestrator,
};

/// Built-in lab session manifest template
const DEFAULT_TEMPLATE: &str = include_str!("../templates/lab-session.yaml");

#[derive(Parser)]
#[command(name = "dozlab")]
#[command(about = "Manage ephemeral lab sessions on Kubernetes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new lab session
    Create {
        /// Unique session identifier
        #[arg(long)]
        session_id: String,

        /// User identifier for tracking
        #[arg(long)]
        user_id: String,

        /// URL to the rootfs image
        #[arg(long)]
        rootfs_url: String,

        /// Number of CPUs for the VM
        #[arg(long)]
        vm_cpu: Option<u32>,

        /// VM memory in MB
        #[arg(long)]
        vm_memory: Option<u32>,

        /// Kubernetes namespace
        #[arg(long, default_value = "default")]
        namespace: String,

        /// Manifest template path (built-in template when omitted)
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Delete a session and all associated resources
    Delete {
        /// Session identifier
        #[arg(long)]
        session_id: String,

        /// Kubernetes namespace
        #[arg(long, default_value = "default")]
        namespace: String,
    },

    /// List all active sessions
    List {
        /// Kubernetes namespace
        #[arg(long, default_value = "default")]
        namespace: String,
    },

    /// Get detailed status of a session
    Status {
        /// Session identifier
        #[arg(long)]
        session_id: String,

        /// Kubernetes namespace
        #[arg(long, default_value = "default")]
        namespace: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("dozlab={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help().ok();
        std::process::exit(1);
    };

    let result = match command {
        Commands::Create {
            session_id,
            user_id,
            rootfs_url,
            vm_cpu,
            vm_memory,
            namespace,
            template,
        } => {
            create_session(
                session_id, user_id, rootfs_url, vm_cpu, vm_memory, namespace, template,
            )
            .await
        }
        Commands::Delete {
            session_id,
            namespace,
        } => delete_session(session_id, namespace).await,
        Commands::List { namespace } => list_sessions(namespace).await,
        Commands::Status {
            session_id,
            namespace,
        } => session_status(session_id, namespace).await,
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Build the cluster gateway from the default credential chain
fn gateway() -> Result<KubeClient> {
    let credentials = credentials::resolve_default()?;
    KubeClient::new(&credentials)
}

/// Create a new lab session
async fn create_session(
    session_id: String,
    user_id: String,
    rootfs_url: String,
    vm_cpu: Option<u32>,
    vm_memory: Option<u32>,
    namespace: String,
    template: Option<PathBuf>,
) -> Result<()> {
    let template_text = match template {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read template: {}", path.display()))?,
        None => DEFAULT_TEMPLATE.to_string(),
    };

    let mut options = SessionOptions::default();
    if let Some(vm_cpu) = vm_cpu {
        options.vm_cpu = vm_cpu;
    }
    if let Some(vm_memory) = vm_memory {
        options.vm_memory = vm_memory;
    }
    let request = SessionRequest::new(session_id, user_id, rootfs_url, options);

    let orchestrator = SessionOrchestrator::new(gateway()?, namespace);
    let created = orchestrator.create(&template_text, &request).await?;

    info!("Lab session created: {}", created.session_id);
    info!("  User ID: {}", request.user_id);
    info!("  Rootfs: {}", request.rootfs_url);
    info!("  VS Code password: {}", created.vscode_password);
    info!("");
    info!("Access via port-forward:");
    info!(
        "  kubectl port-forward lab-session-{} 8080:8080 8081:8081",
        created.session_id
    );
    info!("Then open:");
    info!("  VS Code:  http://localhost:8080");
    info!("  Terminal: http://localhost:8081");

    Ok(())
}

/// Delete a session and report per-resource outcomes
async fn delete_session(session_id: String, namespace: String) -> Result<()> {
    let orchestrator = SessionOrchestrator::new(gateway()?, namespace);
    let report = orchestrator.delete(&session_id).await;

    match report.outcome() {
        SessionDeletion::NotFound => {
            info!("Session {} not found", report.session_id);
        }
        SessionDeletion::Deleted => {
            info!("Deleted session {}:", report.session_id);
            for (kind, name, outcome) in &report.results {
                if *outcome == DeleteOutcome::Deleted {
                    info!("  - {}: {}", kind, name);
                }
            }
        }
        SessionDeletion::PartiallyDeleted => {
            warn!("Session {} was only partially deleted:", report.session_id);
            for (kind, name, outcome) in &report.results {
                match outcome {
                    DeleteOutcome::Deleted => info!("  - {}: {} deleted", kind, name),
                    DeleteOutcome::NotFound => {}
                    DeleteOutcome::Failed(reason) => {
                        warn!("  - {}: {} failed: {}", kind, name, reason)
                    }
                }
            }
        }
    }

    Ok(())
}

/// List all active sessions in the namespace
async fn list_sessions(namespace: String) -> Result<()> {
    let inspector = SessionInspector::new(gateway()?, namespace);
    let sessions = inspector.list().await?;

    if sessions.is_empty() {
        info!("No active sessions found");
        return Ok(());
    }

    info!("Active sessions ({}):", sessions.len());
    info!(
        "{:<20} {:<15} {:<12} AGE",
        "SESSION ID", "USER ID", "STATUS"
    );
    for session in &sessions {
        let age = session
            .created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        info!(
            "{:<20} {:<15} {:<12} {}",
            session.session_id,
            session.user_id,
            session.phase.to_string(),
            age
        );
    }

    Ok(())
}

/// Print the detailed status of one session as YAML
async fn session_status(session_id: String, namespace: String) -> Result<()> {
    let inspector = SessionInspector::new(gateway()?, namespace);

    match inspector.status(&session_id).await {
        Ok(status) => {
            let yaml =
                serde_yaml::to_string(&status).context("Failed to serialize session status")?;
            println!("{}", yaml);
            Ok(())
        }
        Err(Error::SessionNotFound(id)) => {
            info!("Session {} not found", id);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
