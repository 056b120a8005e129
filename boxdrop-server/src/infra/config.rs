use anyhow::{Context, anyhow, bail};
use std::{env, path::PathBuf, time::Duration};

use boxdrop_core::domain::receipts::{CommandDispatcherConfig, HtmlImageRendererConfig};

/// Server configuration loaded via environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Database settings
    pub database_url: Option<String>,

    // Receipt artifacts
    pub artifact_dir: PathBuf,
    pub artifact_public_prefix: String,

    // Rendering
    pub render_binary: String,
    pub render_timeout: Duration,
    pub receipt_template_path: Option<PathBuf>,

    // Messaging CLI
    pub dispatch_binary: String,
    pub dispatch_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let render = HtmlImageRendererConfig::default();
        let dispatch = CommandDispatcherConfig::default();
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 5001,
            database_url: None,
            artifact_dir: PathBuf::from("./static"),
            artifact_public_prefix: "static".to_string(),
            render_binary: render.binary,
            render_timeout: render.timeout,
            receipt_template_path: None,
            dispatch_binary: dispatch.binary,
            dispatch_timeout: dispatch.timeout,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset keys fall back to
    /// the defaults; malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_port = match var("SERVER_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("SERVER_PORT is not a port number: {raw}"))?,
            None => defaults.server_port,
        };

        let database_url = var("DATABASE_URL");
        if let Some(url) = &database_url {
            validate_database_url(url)?;
        }

        Ok(Self {
            server_host: var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
            database_url,
            artifact_dir: var("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            artifact_public_prefix: var("ARTIFACT_PUBLIC_PREFIX")
                .unwrap_or(defaults.artifact_public_prefix),
            render_binary: var("RENDER_BINARY").unwrap_or(defaults.render_binary),
            render_timeout: duration(var("RENDER_TIMEOUT"), "RENDER_TIMEOUT")?
                .unwrap_or(defaults.render_timeout),
            receipt_template_path: var("RECEIPT_TEMPLATE_PATH").map(PathBuf::from),
            dispatch_binary: var("DISPATCH_BINARY").unwrap_or(defaults.dispatch_binary),
            dispatch_timeout: duration(var("DISPATCH_TIMEOUT"), "DISPATCH_TIMEOUT")?
                .unwrap_or(defaults.dispatch_timeout),
        })
    }

    /// The database URL, which must be present unless the server runs on the
    /// in-memory store.
    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow!("DATABASE_URL must be set (or pass --memory)"))
    }

    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.artifact_dir).with_context(|| {
            format!(
                "failed to create artifact directory {}",
                self.artifact_dir.display()
            )
        })?;
        Ok(())
    }

    /// Canonicalize the artifact directory so the renderer and the static
    /// file service agree on one absolute path. Call after
    /// `ensure_directories`.
    pub fn normalize_paths(&mut self) -> anyhow::Result<()> {
        self.artifact_dir = std::fs::canonicalize(&self.artifact_dir)?;
        Ok(())
    }

    pub fn renderer_config(&self) -> HtmlImageRendererConfig {
        HtmlImageRendererConfig {
            binary: self.render_binary.clone(),
            timeout: self.render_timeout,
        }
    }

    pub fn dispatcher_config(&self) -> CommandDispatcherConfig {
        CommandDispatcherConfig {
            binary: self.dispatch_binary.clone(),
            timeout: self.dispatch_timeout,
        }
    }
}

fn validate_database_url(url: &str) -> anyhow::Result<()> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(())
    } else {
        bail!("DATABASE_URL must start with postgres:// or postgresql://")
    }
}

fn duration(raw: Option<String>, key: &str) -> anyhow::Result<Option<Duration>> {
    raw.map(|value| {
        humantime::parse_duration(value.trim())
            .with_context(|| format!("{key} is not a duration: {value}"))
    })
    .transpose()
}
