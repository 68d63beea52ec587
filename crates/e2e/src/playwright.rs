//! Playwright browser automation
//!
//! A persistent Chromium context is launched by a small Node bridge script
//! that reads one JSON command per line on stdin and answers with one JSON
//! line on stdout.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::navigator::{Navigator, PageSnapshot};

const BRIDGE_SCRIPT: &str = r#"
const { chromium } = require('playwright');
const readline = require('readline');

const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {
  const config = JSON.parse(process.argv[2]);
  let context;
  try {
    context = await chromium.launchPersistentContext(config.userDataDir, {
      headless: config.headless,
      args: config.args,
      viewport: { width: config.viewportWidth, height: config.viewportHeight },
    });
  } catch (error) {
    send({ id: 0, ok: false, error: error.message });
    process.exit(1);
  }
  context.setDefaultNavigationTimeout(config.navigationTimeoutMs);
  const page = context.pages()[0] || await context.newPage();
  send({ id: 0, ok: true });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    const cmd = JSON.parse(line);
    try {
      switch (cmd.op) {
        case 'goto': {
          const response = await page.goto(cmd.url);
          send({ id: cmd.id, ok: true, status: response ? response.status() : null });
          break;
        }
        case 'snapshot':
          send({ id: cmd.id, ok: true, url: page.url(), html: await page.content() });
          break;
        case 'close':
          await context.close();
          send({ id: cmd.id, ok: true });
          process.exit(0);
        default:
          send({ id: cmd.id, ok: false, error: 'unknown op: ' + cmd.op });
      }
    } catch (error) {
      send({ id: cmd.id, ok: false, error: error.message });
    }
  }
  await context.close();
})();
"#;

/// Configuration for the Playwright browser session
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,

    /// Extra Chromium command line arguments
    pub args: Vec<String>,

    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Playwright navigation timeout applied to every `goto`
    pub navigation_timeout_ms: u64,

    pub node_binary: String,

    /// Directory whose node_modules holds playwright
    pub node_project_dir: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            args: Vec::new(),
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout_ms: 30_000,
            node_binary: "node".to_string(),
            node_project_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LaunchOptions<'a> {
    user_data_dir: String,
    headless: bool,
    args: &'a [String],
    viewport_width: u32,
    viewport_height: u32,
    navigation_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    html: Option<String>,
}

/// A persistent browser context with a single page
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    closed: bool,
    _user_data_dir: TempDir,
    _script_dir: TempDir,
}

impl PlaywrightSession {
    /// Launch a persistent Chromium context
    pub async fn launch(config: &BrowserConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(config).await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let user_data_dir = tempfile::tempdir()?;
        let launch = LaunchOptions {
            user_data_dir: user_data_dir.path().to_string_lossy().to_string(),
            headless: config.headless,
            args: &config.args,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            navigation_timeout_ms: config.navigation_timeout_ms,
        };

        info!(
            "Launching Chromium (headless: {}, args: {:?})",
            config.headless, config.args
        );

        let mut child = Command::new(&config.node_binary)
            .arg(&script_path)
            .arg(serde_json::to_string(&launch)?)
            .current_dir(&config.node_project_dir)
            .env("NODE_PATH", config.node_project_dir.join("node_modules"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Browser(format!("Failed to spawn {}: {}", config.node_binary, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Browser("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Browser("bridge stdout unavailable".to_string()))?;

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            closed: false,
            _user_data_dir: user_data_dir,
            _script_dir: script_dir,
        };

        let ready = session.read_reply(0).await?;
        if !ready.ok {
            return Err(E2eError::Browser(format!(
                "Browser launch failed: {}",
                ready.error.unwrap_or_default()
            )));
        }

        Ok(session)
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed(config: &BrowserConfig) -> E2eResult<()> {
        let status = Command::new("npx")
            .args(["--no-install", "playwright", "--version"])
            .current_dir(&config.node_project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn request(&mut self, mut command: serde_json::Value) -> E2eResult<BridgeReply> {
        if self.closed {
            return Err(E2eError::Browser("session is closed".to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;
        command["id"] = id.into();

        let mut line = serde_json::to_string(&command)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        self.read_reply(id).await
    }

    async fn read_reply(&mut self, id: u64) -> E2eResult<BridgeReply> {
        while let Some(line) = self.stdout.next_line().await? {
            match serde_json::from_str::<BridgeReply>(&line) {
                Ok(reply) if reply.id == id => return Ok(reply),
                Ok(reply) => warn!("Ignoring out-of-order bridge reply {}", reply.id),
                Err(_) => debug!("[bridge] {}", line),
            }
        }

        Err(E2eError::Browser("browser process exited unexpectedly".to_string()))
    }

    fn terminate(&mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        let _ = self.child.start_kill();
    }
}

#[async_trait::async_trait]
impl Navigator for PlaywrightSession {
    async fn goto(&mut self, url: &str) -> E2eResult<Option<u16>> {
        let reply = self
            .request(serde_json::json!({ "op": "goto", "url": url }))
            .await?;

        if !reply.ok {
            return Err(E2eError::Browser(reply.error.unwrap_or_default()));
        }
        Ok(reply.status)
    }

    async fn snapshot(&mut self) -> E2eResult<PageSnapshot> {
        let reply = self.request(serde_json::json!({ "op": "snapshot" })).await?;

        if !reply.ok {
            return Err(E2eError::Browser(reply.error.unwrap_or_default()));
        }
        Ok(PageSnapshot {
            url: reply.url.unwrap_or_default(),
            html: reply.html.unwrap_or_default(),
        })
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }

        info!("Closing browser context");
        let reply = self.request(serde_json::json!({ "op": "close" })).await;
        self.closed = true;

        let exited = tokio::time::timeout(Duration::from_secs(10), self.child.wait()).await;
        if exited.is_err() {
            warn!("Browser did not exit in time, killing it");
            self.terminate();
        }

        match reply {
            Ok(reply) if !reply.ok => Err(E2eError::Browser(reply.error.unwrap_or_default())),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        if !self.closed {
            self.terminate();
        }
    }
}
