//! Launches and supervises the native Chromium process.

use std::path::PathBuf;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::error::{CdpError, Result};

#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub headless: bool,
    pub sandbox: bool,
    pub port: u16,
    pub executable: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub extra_args: Vec<String>,
    pub display: Option<String>,
}

/// Chrome's conventional devtools debugging port. Used as the default rather
/// than 0 because port 0 makes Chrome bind an OS-assigned ephemeral port and
/// write it to a `DevToolsActivePort` file instead of listening on it — this
/// process only ever launches one browser, so a fixed port is safe.
const DEFAULT_DEBUGGING_PORT: u16 = 9222;

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            headless: false,
            sandbox: false,
            port: DEFAULT_DEBUGGING_PORT,
            executable: None,
            window_size: (1280, 720),
            extra_args: Vec::new(),
            display: None,
        }
    }
}

/// Returns the path to Chrome's executable.
///
/// Honors `CHROME` if set, otherwise probes the usual binary names on PATH.
pub fn default_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROME") {
        if PathBuf::from(&path).exists() {
            return Ok(path.into());
        }
    }

    for app in [
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
        "chrome-browser",
    ] {
        if let Ok(path) = which::which(app) {
            return Ok(path);
        }
    }

    Err(CdpError::Launch(
        "could not locate a chrome/chromium executable; set $CHROME".into(),
    ))
}

pub struct BrowserProcess {
    child: Child,
    pub ws_url: String,
}

impl BrowserProcess {
    pub async fn launch(config: &LaunchConfig) -> Result<Self> {
        let exe = match &config.executable {
            Some(p) => p.clone(),
            None => default_executable()?,
        };

        let mut cmd = Command::new(exe);
        cmd.arg(format!("--remote-debugging-port={}", config.port))
            .arg("--remote-allow-origins=*")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg(format!(
                "--window-size={},{}",
                config.window_size.0, config.window_size.1
            ));

        if config.headless {
            cmd.arg("--headless=new");
        }
        if !config.sandbox {
            cmd.arg("--no-sandbox");
        }
        for arg in &config.extra_args {
            cmd.arg(arg);
        }
        if let Some(display) = &config.display {
            cmd.env("DISPLAY", display);
        }
        cmd.kill_on_drop(true);
        cmd.stdout(std::process::Stdio::null());
        cmd.stderr(std::process::Stdio::piped());

        let child = cmd.spawn()?;
        let ws_url = timeout(Duration::from_secs(10), discover_ws_url(config.port))
            .await
            .map_err(|_| CdpError::Launch("timed out waiting for devtools endpoint".into()))??;

        Ok(Self { child, ws_url })
    }

    pub async fn shutdown(&mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }
}

/// Polls `http://127.0.0.1:<port>/json/version` until chrome's devtools HTTP
/// endpoint answers with the browser-level websocket URL.
async fn discover_ws_url(port: u16) -> Result<String> {
    #[derive(serde::Deserialize)]
    struct VersionInfo {
        #[serde(rename = "webSocketDebuggerUrl")]
        ws_url: String,
    }

    let url = format!("http://127.0.0.1:{port}/json/version");
    loop {
        match reqwest::get(&url).await {
            Ok(resp) if resp.status().is_success() => {
                let info: VersionInfo = resp.json().await?;
                return Ok(info.ws_url);
            }
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
}
