//! Opening sites in a window the participant can close on their own.
//!
//! There is no close notification for an external browser window, so the
//! study polls [`SiteWindow::is_closed`] on a fixed cadence instead.

use std::process::Stdio;
use std::sync::Arc;

use thiserror::Error;
use tokio::process::{Child, Command};

use crate::config::BrowserConfig;

/// Placeholder replaced by the site URL in browser commands.
pub const URL_PLACEHOLDER: &str = "{url}";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("browser command is empty")]
    EmptyCommand,
    #[error("failed to start browser `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open {url}: {source}")]
    Opener {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to check browser window: {0}")]
    Poll(#[source] std::io::Error),
}

/// Handle to an opened site.
pub trait SiteWindow: Send {
    /// Returns true once the participant has closed the window.
    ///
    /// # Errors
    /// Returns an error if liveness cannot be determined.
    fn is_closed(&mut self) -> Result<bool, LaunchError>;

    /// True when closure cannot be observed and the participant must confirm it.
    fn needs_confirmation(&self) -> bool {
        false
    }
}

/// Opens sites.
pub trait SiteLauncher: Send + Sync {
    /// Opens `url` in its own window.
    ///
    /// # Errors
    /// Returns an error if the environment refuses to open it.
    fn open(&self, url: &str) -> Result<Box<dyn SiteWindow>, LaunchError>;
}

/// Builds the launcher selected by configuration.
pub fn launcher_from_config(config: &BrowserConfig) -> Arc<dyn SiteLauncher> {
    if config.command.is_empty() {
        Arc::new(SystemLauncher)
    } else {
        Arc::new(CommandLauncher::new(config.command.clone()))
    }
}

// ============================================================================
// Browser process
// ============================================================================

/// Runs a browser command per site and watches the process.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    command: Vec<String>,
}

impl CommandLauncher {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

/// Substitutes `url` into the command arguments.
///
/// If no argument contains the placeholder, the URL is appended.
pub fn build_args(args: &[String], url: &str) -> Vec<String> {
    let mut substituted = false;
    let mut out: Vec<String> = args
        .iter()
        .map(|arg| {
            if arg.contains(URL_PLACEHOLDER) {
                substituted = true;
                arg.replace(URL_PLACEHOLDER, url)
            } else {
                arg.clone()
            }
        })
        .collect();
    if !substituted {
        out.push(url.to_string());
    }
    out
}

impl SiteLauncher for CommandLauncher {
    fn open(&self, url: &str) -> Result<Box<dyn SiteWindow>, LaunchError> {
        let (program, args) = self.command.split_first().ok_or(LaunchError::EmptyCommand)?;

        let child = Command::new(program)
            .args(build_args(args, url))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: program.clone(),
                source,
            })?;

        tracing::info!(program = %program, url = %url, pid = ?child.id(), "browser started");
        Ok(Box::new(ProcessWindow { child }))
    }
}

/// A site shown by a dedicated browser process; closed when the process exits.
struct ProcessWindow {
    child: Child,
}

impl SiteWindow for ProcessWindow {
    fn is_closed(&mut self) -> Result<bool, LaunchError> {
        let status = self.child.try_wait().map_err(LaunchError::Poll)?;
        if let Some(status) = status {
            tracing::debug!(?status, "browser exited");
        }
        Ok(status.is_some())
    }
}

// ============================================================================
// System default browser
// ============================================================================

/// Hands the URL to the system default browser.
///
/// The browser outlives the call, so closure is confirmed by the participant.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl SiteLauncher for SystemLauncher {
    fn open(&self, url: &str) -> Result<Box<dyn SiteWindow>, LaunchError> {
        open::that_detached(url).map_err(|source| LaunchError::Opener {
            url: url.to_string(),
            source,
        })?;
        tracing::info!(url = %url, "site handed to system browser");
        Ok(Box::new(ConfirmedWindow))
    }
}

struct ConfirmedWindow;

impl SiteWindow for ConfirmedWindow {
    fn is_closed(&mut self) -> Result<bool, LaunchError> {
        Ok(false)
    }

    fn needs_confirmation(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_build_args_substitutes_placeholder() {
        let args = strings(&["--private-window", "{url}"]);
        assert_eq!(
            build_args(&args, "https://a.example"),
            strings(&["--private-window", "https://a.example"])
        );
    }

    #[test]
    fn test_build_args_appends_url_without_placeholder() {
        let args = strings(&["--new-window"]);
        assert_eq!(
            build_args(&args, "https://a.example"),
            strings(&["--new-window", "https://a.example"])
        );
    }

    #[test]
    fn test_confirmed_window_waits_for_participant() {
        let mut window = ConfirmedWindow;
        assert!(window.needs_confirmation());
        assert!(!window.is_closed().unwrap());
    }

    #[tokio::test]
    async fn test_empty_command_is_rejected() {
        let launcher = CommandLauncher::new(Vec::new());
        assert!(matches!(
            launcher.open("https://a.example"),
            Err(LaunchError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn test_missing_program_reports_spawn_error() {
        let launcher = CommandLauncher::new(strings(&["consent-study-no-such-browser"]));
        assert!(matches!(
            launcher.open("https://a.example"),
            Err(LaunchError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_window_closes_when_process_exits() {
        let launcher = CommandLauncher::new(strings(&["sh", "-c", "exit 0", "{url}"]));
        let mut window = launcher.open("https://a.example").unwrap();
        assert!(!window.needs_confirmation());

        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if window.is_closed().unwrap() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(closed.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_window_open_while_running() {
        let launcher = CommandLauncher::new(strings(&["sh", "-c", "sleep 5", "{url}"]));
        let mut window = launcher.open("https://a.example").unwrap();
        assert!(!window.is_closed().unwrap());
    }
}
