//! Playwright browser session
//!
//! A single `node` process runs the driver script in `driver.js`, owning one
//! browser page for the whole run. Commands and replies travel as
//! newline-delimited JSON over the child's stdin/stdout.

use std::process::Stdio;
use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use crate::config::{BenchConfig, ColumnRevealConfig};
use crate::dataset::{ReferenceDataset, Row};
use crate::error::{BenchError, BenchResult};
use crate::page::{ChatSession, Navigator, ReferenceSource};
use crate::retry::{poll_until, RetryPolicy};

const DRIVER_SCRIPT: &str = include_str!("driver.js");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Locators for every element the benchmark touches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub assistant_launcher: String,
    pub chat_input: String,
    pub send_button: String,
    pub loading_indicator: String,
    /// Matches every assistant reply; the last match is the latest
    pub response: String,
    pub reference_link: String,
    pub leave_without_saving: String,
    pub edit_columns_button: String,
    pub add_hidden_column_button: String,
    pub all_columns_visible: String,
    pub apply_button: String,
    pub page_header: String,
    /// Table locator; `{header}` is replaced with the page header text
    pub table_by_header: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            assistant_launcher: r#"[data-testid="kai-launcher"]"#.to_string(),
            chat_input: r#"[data-testid="kai-chat-input"]"#.to_string(),
            send_button: r#"[data-testid="kai-send-chat-button"]"#.to_string(),
            loading_indicator: r#"[data-testid="kai-loading-indicator"]"#.to_string(),
            response: r#"[data-testid="kai-response"]"#.to_string(),
            reference_link: r#"[data-testid="kai-response"] a[href*="prism"]"#.to_string(),
            leave_without_saving: r#"role=button[name="Leave without saving"]"#.to_string(),
            edit_columns_button: r#"role=button[name="Edit columns"]"#.to_string(),
            add_hidden_column_button: r#"[data-testid="add-hidden-column"]"#.to_string(),
            all_columns_visible: r#"xpath=//h1[contains(text(), "All columns are visible")]"#.to_string(),
            apply_button: r#"role=button[name="Apply"]"#.to_string(),
            page_header: r#"[data-testid="page-header-small"]"#.to_string(),
            table_by_header: r#"xpath=//*[normalize-space(text())="{header}"]/following::table[1]"#.to_string(),
        }
    }
}

impl Selectors {
    /// Table locator for a page header.
    ///
    /// Double quotes in the header are dropped so they cannot terminate the
    /// XPath string literal.
    pub fn table_for(&self, header: &str) -> String {
        let header = header.trim().replace('"', "");
        self.table_by_header.replace("{header}", &header)
    }
}

/// Browser launch options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Node.js binary used to run the driver
    pub node_binary: String,

    /// Default Playwright action timeout
    pub action_timeout_ms: u64,

    /// Upper bound for one driver round trip
    pub command_timeout_secs: u64,

    pub selectors: Selectors,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_binary: "node".to_string(),
            action_timeout_ms: 10_000,
            command_timeout_secs: 60,
            selectors: Selectors::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: i64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableData {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

struct DriverIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: i64,
}

/// Live browser session implementing the page capabilities
pub struct PlaywrightSession {
    config: BrowserConfig,
    columns: ColumnRevealConfig,
    retry: RetryPolicy,
    io: Mutex<DriverIo>,
    child: Mutex<Child>,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightSession {
    /// Check for Playwright, start the driver, and wait for the browser.
    pub async fn launch(config: &BenchConfig) -> BenchResult<Self> {
        Self::check_playwright_installed(&config.browser.node_binary).await?;
        Self::launch_script(config, DRIVER_SCRIPT).await
    }

    /// Start a session on a custom driver script speaking the same line
    /// protocol as the bundled one: a ready reply with id 0, then one
    /// `{id, ok, value, error}` reply per command.
    pub async fn launch_script(config: &BenchConfig, script: &str) -> BenchResult<Self> {
        let browser = &config.browser;
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("kaibench-driver.js");
        std::fs::write(&script_path, script)?;

        let options = json!({
            "browser": browser.browser.as_str(),
            "headless": browser.headless,
            "width": browser.viewport_width,
            "height": browser.viewport_height,
            "actionTimeoutMs": browser.action_timeout_ms,
        });

        info!(
            "Launching {} (headless: {}) via {}",
            browser.browser.as_str(),
            browser.headless,
            script_path.display()
        );

        let mut child = Command::new(&browser.node_binary)
            .arg(&script_path)
            .arg(options.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BenchError::Playwright(format!("failed to spawn {}: {}", browser.node_binary, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BenchError::Playwright("driver stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BenchError::Playwright("driver stdout unavailable".into()))?;

        let mut io = DriverIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
        };

        let ready = timeout(
            Duration::from_secs(browser.command_timeout_secs),
            read_reply(&mut io.stdout),
        )
        .await
        .map_err(|_| BenchError::timeout("browser launch", Duration::from_secs(browser.command_timeout_secs)))??;
        if !ready.ok {
            return Err(BenchError::Playwright(format!(
                "browser launch failed: {}",
                ready.error.unwrap_or_default()
            )));
        }

        Ok(Self {
            config: browser.clone(),
            columns: config.columns.clone(),
            retry: config.retry.clone(),
            io: Mutex::new(io),
            child: Mutex::new(child),
            _script_dir: script_dir,
        })
    }

    async fn check_playwright_installed(node: &str) -> BenchResult<()> {
        let status = Command::new(node)
            .args(["-e", "require.resolve('playwright', { paths: [process.cwd()] })"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) if s.success() => Ok(()),
            _ => Err(BenchError::PlaywrightNotFound),
        }
    }

    /// Close the browser and wait for the driver to exit.
    pub async fn close(self) -> BenchResult<()> {
        if let Err(e) = self.command(json!({ "op": "close" })).await {
            debug!("Driver close command failed: {}", e);
        }
        let mut child = self.child.lock().await;
        match timeout(Duration::from_secs(10), child.wait()).await {
            Ok(Ok(status)) => debug!("Driver exited with {}", status),
            Ok(Err(e)) => debug!("Waiting for driver exit failed: {}", e),
            Err(_) => debug!("Driver still running after close, killing it on drop"),
        }
        Ok(())
    }

    async fn command(&self, mut cmd: Value) -> BenchResult<Value> {
        let bound = Duration::from_secs(self.config.command_timeout_secs);
        let mut io = self.io.lock().await;

        let id = io.next_id;
        io.next_id += 1;
        cmd["id"] = json!(id);

        debug!("driver <- {}", cmd);
        let mut line = cmd.to_string();
        line.push('\n');
        io.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| BenchError::Playwright(format!("driver write failed: {}", e)))?;
        io.stdin
            .flush()
            .await
            .map_err(|e| BenchError::Playwright(format!("driver flush failed: {}", e)))?;

        let op = cmd["op"].as_str().unwrap_or("command").to_string();
        let reply = timeout(bound, read_reply_for(&mut io.stdout, id))
            .await
            .map_err(|_| BenchError::timeout(format!("driver {}", op), bound))??;

        if !reply.ok {
            return Err(BenchError::Playwright(format!(
                "{} failed: {}",
                op,
                reply.error.unwrap_or_default()
            )));
        }
        Ok(reply.value)
    }

    async fn goto(&self, url: &str) -> BenchResult<()> {
        self.command(json!({ "op": "goto", "url": url })).await.map(|_| ())
    }

    async fn reload(&self) -> BenchResult<()> {
        self.command(json!({ "op": "reload" })).await.map(|_| ())
    }

    async fn click(&self, selector: &str) -> BenchResult<()> {
        self.command(json!({ "op": "click", "selector": selector }))
            .await
            .map(|_| ())
    }

    async fn fill(&self, selector: &str, value: &str) -> BenchResult<()> {
        self.command(json!({ "op": "fill", "selector": selector, "value": value }))
            .await
            .map(|_| ())
    }

    async fn visible(&self, selector: &str) -> BenchResult<bool> {
        let value = self
            .command(json!({ "op": "visible", "selector": selector }))
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn text(&self, selector: &str, pick: &str) -> BenchResult<String> {
        let value = self
            .command(json!({ "op": "text", "selector": selector, "pick": pick }))
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn read_table_once(&self, attempt: usize) -> BenchResult<ReferenceDataset> {
        if attempt > 1 {
            debug!("Reloading before table read attempt {}", attempt);
            self.reload().await?;
            sleep(self.columns.settle()).await;
        }

        let selectors = &self.config.selectors;
        let header = self.text(&selectors.page_header, "first").await?;
        if header.trim().is_empty() {
            return Err(BenchError::Extraction("page header is empty".into()));
        }

        let value = self
            .command(json!({ "op": "table", "selector": selectors.table_for(&header) }))
            .await?;
        let table: TableData = serde_json::from_value(value)?;
        table_to_dataset(header.trim(), table)
    }
}

async fn read_reply(stdout: &mut Lines<BufReader<ChildStdout>>) -> BenchResult<DriverReply> {
    loop {
        let line = stdout
            .next_line()
            .await
            .map_err(|e| BenchError::Playwright(format!("driver read failed: {}", e)))?
            .ok_or_else(|| BenchError::Playwright("driver exited".into()))?;

        if line.trim().is_empty() {
            continue;
        }
        return parse_reply(&line);
    }
}

/// Read until the reply to `id` arrives.
///
/// Replies to commands whose wait was abandoned (bound expired or the caller
/// was cancelled) arrive late and are dropped here.
async fn read_reply_for(stdout: &mut Lines<BufReader<ChildStdout>>, id: i64) -> BenchResult<DriverReply> {
    loop {
        let reply = read_reply(stdout).await?;
        if reply.id == id {
            return Ok(reply);
        }
        if reply.id > id {
            return Err(BenchError::Playwright(format!(
                "driver reply out of order: expected {}, got {}",
                id, reply.id
            )));
        }
        debug!("Discarding late driver reply {} while waiting for {}", reply.id, id);
    }
}

fn parse_reply(line: &str) -> BenchResult<DriverReply> {
    serde_json::from_str(line)
        .map_err(|e| BenchError::Playwright(format!("unparsable driver reply ({}): {}", e, line)))
}

fn table_to_dataset(header: &str, table: TableData) -> BenchResult<ReferenceDataset> {
    if table.headers.is_empty() {
        return Err(BenchError::Extraction(format!("table '{}' has no header row", header)));
    }

    let rows = table
        .rows
        .into_iter()
        .map(|cells| table.headers.iter().cloned().zip(cells).collect::<Row>())
        .collect();

    Ok(ReferenceDataset::new(header, rows))
}

#[async_trait]
impl Navigator for PlaywrightSession {
    async fn go_to_start(&self, start_url: &str) -> BenchResult<()> {
        self.goto(start_url).await
    }

    async fn open_assistant(&self) -> BenchResult<()> {
        self.click(&self.config.selectors.assistant_launcher).await
    }
}

#[async_trait]
impl ChatSession for PlaywrightSession {
    async fn send(&self, text: &str) -> BenchResult<()> {
        let selectors = &self.config.selectors;
        self.fill(&selectors.chat_input, text).await?;
        self.click(&selectors.send_button).await
    }

    async fn is_busy(&self) -> BenchResult<bool> {
        self.visible(&self.config.selectors.loading_indicator).await
    }

    async fn read_latest_response(&self) -> BenchResult<String> {
        self.text(&self.config.selectors.response, "last").await
    }
}

#[async_trait]
impl ReferenceSource for PlaywrightSession {
    async fn follow_reference_link(&self) -> BenchResult<()> {
        let selectors = &self.config.selectors;
        self.click(&selectors.reference_link).await?;
        sleep(self.columns.settle()).await;

        if self.visible(&selectors.leave_without_saving).await? {
            debug!("Dismissing unsaved-changes modal");
            self.click(&selectors.leave_without_saving).await?;
            sleep(self.columns.settle()).await;
        }
        Ok(())
    }

    async fn reveal_all_columns(&self) -> BenchResult<()> {
        let selectors = &self.config.selectors;
        self.click(&selectors.edit_columns_button).await?;
        sleep(self.columns.settle()).await;

        let mut revealed = 0;
        while self.visible(&selectors.add_hidden_column_button).await? {
            if revealed >= self.columns.max_reveals {
                return Err(BenchError::ColumnsNotRevealed { attempts: revealed });
            }
            self.click(&selectors.add_hidden_column_button).await?;
            revealed += 1;
        }
        debug!("Revealed {} hidden column(s)", revealed);

        let message = selectors.all_columns_visible.as_str();
        poll_until(
            "all columns visible message",
            Duration::from_millis(250),
            Duration::from_secs(5),
            move || async move { self.visible(message).await },
        )
        .await
        .map_err(|_| BenchError::ColumnsNotRevealed { attempts: revealed })?;

        self.click(&selectors.apply_button).await?;
        sleep(self.columns.settle()).await;
        Ok(())
    }

    async fn read_table(&self) -> BenchResult<ReferenceDataset> {
        self.retry
            .run("read reference table", move |attempt| async move {
                self.read_table_once(attempt).await
            })
            .await
    }
}
