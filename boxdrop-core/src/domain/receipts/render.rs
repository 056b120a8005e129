use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, ImageReader};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::records::ReceiptContext;

/// Shown when a delivery has neither free-text content nor a box type.
pub const CONTENT_PLACEHOLDER: &str = "N/A";

const DATE_FORMAT: &str = "%d/%m/%Y";

const DEFAULT_TEMPLATE: &str = include_str!("receipt_template.html");

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder regex should compile"));

/// Values printed on a receipt, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptFields {
    pub receipt_number: i64,
    pub delivery_date: String,
    pub store_name: String,
    pub store_address: String,
    pub delivery_content: String,
    pub quantity_carton: String,
    pub quantity_basket: String,
    pub vehicle_number: String,
    pub exit_time: String,
}

impl ReceiptFields {
    pub fn from_context(context: &ReceiptContext, receipt_number: i64) -> Self {
        let delivery = &context.delivery;
        Self {
            receipt_number,
            delivery_date: delivery.date.format(DATE_FORMAT).to_string(),
            store_name: context.store.name.clone(),
            store_address: context.store.address.clone().unwrap_or_default(),
            delivery_content: receipt_content(context),
            quantity_carton: blank_if_zero(delivery.quantity_carton),
            quantity_basket: blank_if_zero(delivery.quantity_basket),
            vehicle_number: delivery.vehicle_number.clone().unwrap_or_default(),
            exit_time: delivery.exit_time.clone().unwrap_or_default(),
        }
    }

    /// Template placeholder names paired with their values.
    pub fn placeholders(&self) -> [(&'static str, String); 9] {
        [
            ("receipt_number", self.receipt_number.to_string()),
            ("delivery_date", self.delivery_date.clone()),
            ("store_name", self.store_name.clone()),
            ("store_address", self.store_address.clone()),
            ("delivery_content", self.delivery_content.clone()),
            ("quantity_carton", self.quantity_carton.clone()),
            ("quantity_basket", self.quantity_basket.clone()),
            ("vehicle_number", self.vehicle_number.clone()),
            ("exit_time", self.exit_time.clone()),
        ]
    }
}

/// Free-text content wins; otherwise the box type name, otherwise a placeholder.
pub fn receipt_content(context: &ReceiptContext) -> String {
    context
        .delivery
        .delivery_content
        .as_deref()
        .filter(|content| !content.trim().is_empty())
        .map(str::to_string)
        .or_else(|| context.box_type.as_ref().map(|b| b.type_name.clone()))
        .unwrap_or_else(|| CONTENT_PLACEHOLDER.to_string())
}

fn blank_if_zero(quantity: i32) -> String {
    if quantity == 0 {
        String::new()
    } else {
        quantity.to_string()
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch renderer {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("renderer exited with {code:?}: {stderr}")]
    Exited { code: Option<i32>, stderr: String },
    #[error("renderer did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("renderer produced no usable PNG at {path}: {reason}")]
    InvalidOutput { path: PathBuf, reason: String },
    #[error("receipt template error: {0}")]
    Template(String),
    #[error("IO error while rendering: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns receipt fields into an image file.
///
/// No atomicity is promised: after a failure the target may or may not
/// exist.
#[async_trait]
pub trait ReceiptRenderer: Send + Sync {
    async fn render(&self, fields: &ReceiptFields, target: &Path) -> Result<(), RenderError>;
}

/// Receipt HTML with `{{name}}` placeholders.
#[derive(Debug, Clone)]
pub struct ReceiptTemplate {
    source: String,
}

impl Default for ReceiptTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl ReceiptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub async fn load(path: &Path) -> Result<Self, RenderError> {
        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            RenderError::Template(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(Self::new(source))
    }

    /// Substitute every placeholder with its HTML-escaped value in a single
    /// pass, so substituted text is never scanned again. Unknown names are
    /// left as written.
    pub fn fill(&self, fields: &ReceiptFields) -> String {
        let values = fields.placeholders();
        PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures<'_>| {
                values
                    .iter()
                    .find(|(name, _)| *name == &caps[1])
                    .map(|(_, value)| escape_html(value))
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct HtmlImageRendererConfig {
    /// HTML-to-image executable reading HTML on stdin (`wkhtmltoimage`).
    pub binary: String,
    pub timeout: Duration,
}

impl Default for HtmlImageRendererConfig {
    fn default() -> Self {
        Self {
            binary: "wkhtmltoimage".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Fills the receipt template and pipes it through an external HTML-to-PNG
/// converter.
#[derive(Debug, Clone)]
pub struct HtmlImageRenderer {
    config: HtmlImageRendererConfig,
    template: ReceiptTemplate,
}

impl HtmlImageRenderer {
    pub fn new(config: HtmlImageRendererConfig, template: ReceiptTemplate) -> Self {
        Self { config, template }
    }

    async fn run_converter(&self, html: String, target: &Path) -> Result<(), RenderError> {
        let mut child = Command::new(&self.config.binary)
            .arg("--quiet")
            .arg("--format")
            .arg("png")
            .arg("-")
            .arg(target)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::Launch {
                binary: self.config.binary.clone(),
                source,
            })?;

        // Feed stdin while the output pipes drain; the timeout covers both.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(html.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        let (fed, output) = timeout(self.config.timeout, async {
            tokio::join!(feed, child.wait_with_output())
        })
        .await
        .map_err(|_| {
            warn!(timeout = ?self.config.timeout, "renderer timed out");
            RenderError::TimedOut(self.config.timeout)
        })?;
        let output = output?;

        if !output.status.success() {
            return Err(RenderError::Exited {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        fed?;
        Ok(())
    }
}

#[async_trait]
impl ReceiptRenderer for HtmlImageRenderer {
    async fn render(&self, fields: &ReceiptFields, target: &Path) -> Result<(), RenderError> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let html = self.template.fill(fields);
        debug!(
            receipt_number = fields.receipt_number,
            bytes = html.len(),
            "rendering receipt"
        );

        self.run_converter(html, target).await?;
        verify_png(target).await?;

        info!(
            receipt_number = fields.receipt_number,
            path = %target.display(),
            "receipt rendered"
        );
        Ok(())
    }
}

/// Confirm `path` holds a PNG whose header decodes.
pub async fn verify_png(path: &Path) -> Result<(), RenderError> {
    let owned = path.to_path_buf();
    let checked = tokio::task::spawn_blocking(move || -> Result<(u32, u32), String> {
        let reader = ImageReader::open(&owned)
            .map_err(|e| e.to_string())?
            .with_guessed_format()
            .map_err(|e| e.to_string())?;
        match reader.format() {
            Some(ImageFormat::Png) => reader.into_dimensions().map_err(|e| e.to_string()),
            other => Err(format!("unexpected image format {other:?}")),
        }
    })
    .await
    .map_err(|e| RenderError::InvalidOutput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    match checked {
        Ok((width, height)) => {
            debug!(width, height, path = %path.display(), "receipt image verified");
            Ok(())
        }
        Err(reason) => {
            warn!(path = %path.display(), %reason, "renderer output rejected");
            Err(RenderError::InvalidOutput {
                path: path.to_path_buf(),
                reason,
            })
        }
    }
}
