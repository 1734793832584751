/// Cluster credential resolution
///
/// The orchestrator never looks up credentials ambiently; whoever builds
/// the client decides where they come from and passes them in.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Resolved access to one cluster API endpoint
#[derive(Debug, Clone)]
pub struct ClusterCredentials {
    /// API server base URL, e.g. "https://10.0.0.1:6443"
    pub server: String,
    /// Bearer token, when the cluster uses token auth
    pub token: Option<String>,
    /// Skip TLS verification (mirrors the kubeconfig flag)
    pub insecure_skip_tls_verify: bool,
}

/// A source of cluster credentials
pub trait CredentialProvider {
    fn resolve(&self) -> Result<ClusterCredentials>;
}

/// Credentials from DOZLAB_API_SERVER / DOZLAB_TOKEN environment variables
#[derive(Debug, Default)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn resolve(&self) -> Result<ClusterCredentials> {
        let server = std::env::var("DOZLAB_API_SERVER")
            .context("DOZLAB_API_SERVER environment variable not set")?;
        Url::parse(&server).context("DOZLAB_API_SERVER is not a valid URL")?;

        Ok(ClusterCredentials {
            server,
            token: std::env::var("DOZLAB_TOKEN").ok(),
            insecure_skip_tls_verify: std::env::var("DOZLAB_INSECURE_SKIP_TLS_VERIFY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

/// Credentials from a kubeconfig file ($KUBECONFIG or ~/.kube/config)
#[derive(Debug, Default)]
pub struct KubeconfigCredentials {
    /// Explicit kubeconfig path, overriding the environment lookup
    pub path: Option<PathBuf>,
}

impl CredentialProvider for KubeconfigCredentials {
    fn resolve(&self) -> Result<ClusterCredentials> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => default_kubeconfig_path()?,
        };
        debug!("Loading kubeconfig from {}", path.display());

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read kubeconfig: {}", path.display()))?;
        parse_kubeconfig(&content)
    }
}

fn default_kubeconfig_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("KUBECONFIG") {
        return Ok(PathBuf::from(path));
    }
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".kube").join("config"))
}

/// Resolve credentials through the default chain: environment variables
/// first, then kubeconfig.
pub fn resolve_default() -> Result<ClusterCredentials> {
    EnvCredentials
        .resolve()
        .or_else(|_| KubeconfigCredentials::default().resolve())
        .context(
            "Cluster credentials not found. Set DOZLAB_API_SERVER/DOZLAB_TOKEN \
             or provide a kubeconfig",
        )
}

#[derive(Debug, Deserialize)]
struct Kubeconfig {
    #[serde(rename = "current-context", default)]
    current_context: Option<String>,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: KubeconfigCluster,
}

#[derive(Debug, Deserialize)]
struct KubeconfigCluster {
    server: String,
    #[serde(rename = "insecure-skip-tls-verify", default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: KubeconfigContext,
}

#[derive(Debug, Deserialize)]
struct KubeconfigContext {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    user: KubeconfigUser,
}

#[derive(Debug, Deserialize)]
struct KubeconfigUser {
    #[serde(default)]
    token: Option<String>,
}

fn parse_kubeconfig(content: &str) -> Result<ClusterCredentials> {
    let kubeconfig: Kubeconfig =
        serde_yaml::from_str(content).context("Failed to parse kubeconfig")?;

    let context = match &kubeconfig.current_context {
        Some(name) => kubeconfig
            .contexts
            .iter()
            .find(|c| &c.name == name)
            .with_context(|| format!("Context {} not found in kubeconfig", name))?,
        None => kubeconfig
            .contexts
            .first()
            .context("Kubeconfig has no contexts")?,
    };

    let cluster = kubeconfig
        .clusters
        .iter()
        .find(|c| c.name == context.context.cluster)
        .with_context(|| format!("Cluster {} not found in kubeconfig", context.context.cluster))?;

    Url::parse(&cluster.cluster.server).context("Cluster server is not a valid URL")?;

    let token = context.context.user.as_ref().and_then(|user_name| {
        kubeconfig
            .users
            .iter()
            .find(|u| &u.name == user_name)
            .and_then(|u| u.user.token.clone())
    });

    Ok(ClusterCredentials {
        server: cluster.cluster.server.clone(),
        token,
        insecure_skip_tls_verify: cluster.cluster.insecure_skip_tls_verify,
    })
}
