//! Virtual display bootstrap (§4.I): spawns an Xvfb-style child process when
//! headed rendering is requested and no display is already present, polls
//! for it to come up, and publishes `DISPLAY` before the native browser
//! launches.

use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DISPLAY_NUM: &str = ":99";
const SOCKET_PATH: &str = "/tmp/.X11-unix/X99";

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("failed to spawn virtual display: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("virtual display did not come up within {0:?}")]
    Timeout(Duration),
}

/// Owns the Xvfb child process, if one was started. Dropped (or `stop`ped)
/// on shutdown per the Process Supervisor's sequencing.
pub struct VirtualDisplay {
    child: Option<Child>,
    display: String,
}

impl VirtualDisplay {
    /// If headed rendering is requested and `DISPLAY` isn't already set,
    /// spawns Xvfb and waits up to `timeout` for its socket to appear.
    pub async fn bootstrap_if_needed(headless: bool, timeout: Option<Duration>) -> Result<Option<Self>, DisplayError> {
        if headless || std::env::var_os("DISPLAY").is_some() {
            return Ok(None);
        }

        let mut child = Command::new("Xvfb")
            .arg(DISPLAY_NUM)
            .arg("-screen")
            .arg("0")
            .arg("1280x720x24")
            .arg("-nolisten")
            .arg("tcp")
            .kill_on_drop(true)
            .spawn()
            .map_err(DisplayError::Spawn)?;

        let deadline = Instant::now() + timeout.unwrap_or(DEFAULT_TIMEOUT);
        loop {
            if std::path::Path::new(SOCKET_PATH).exists() {
                break;
            }
            if let Ok(Some(status)) = child.try_wait() {
                return Err(DisplayError::Spawn(std::io::Error::other(format!(
                    "Xvfb exited early with {status}"
                ))));
            }
            if Instant::now() >= deadline {
                let _ = child.start_kill();
                return Err(DisplayError::Timeout(timeout.unwrap_or(DEFAULT_TIMEOUT)));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        std::env::set_var("DISPLAY", DISPLAY_NUM);
        tracing::info!(target: "browserd_server::display", display = DISPLAY_NUM, "virtual display ready");

        Ok(Some(Self { child: Some(child), display: DISPLAY_NUM.to_string() }))
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}
