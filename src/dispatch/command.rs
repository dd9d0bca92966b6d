//! Handlers that run an external program per notification

use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::Handler;
use crate::notify::NotificationRecord;

/// One `[[handlers]]` entry from the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Name shown in logs
    pub name: String,
    /// Program to execute (looked up in PATH)
    pub program: String,
    /// Arguments; `{app_name}`, `{summary}` and `{body}` are filled in
    #[serde(default)]
    pub args: Vec<String>,
    /// Discard the program's stdout/stderr
    #[serde(default)]
    pub quiet: bool,
}

impl HandlerConfig {
    /// Ping a phone through KDE Connect
    pub fn ping_phone() -> Self {
        Self {
            name: "ping-phone".to_string(),
            program: "kdeconnect-cli".to_string(),
            args: vec![
                "--ping-msg".to_string(),
                "Custom ping {summary}!\n{body}".to_string(),
                "-n".to_string(),
                "devicename".to_string(),
            ],
            quiet: false,
        }
    }

    /// Play the freedesktop "new message" sound with mpv
    pub fn play_sound() -> Self {
        Self {
            name: "play-sound".to_string(),
            program: "mpv".to_string(),
            args: vec![
                "/usr/share/sounds/freedesktop/stereo/message-new-instant.oga".to_string(),
            ],
            quiet: true,
        }
    }
}

pub struct CommandHandler {
    config: HandlerConfig,
}

impl CommandHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    /// Arguments with placeholders replaced by the notification's fields
    pub fn render_args(&self, notif: &NotificationRecord) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| render_template(arg, notif))
            .collect()
    }
}

#[async_trait]
impl Handler for CommandHandler {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn handle(&self, notif: &NotificationRecord) -> Result<()> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(self.render_args(notif)).stdin(Stdio::null());
        if self.config.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = cmd
            .status()
            .await
            .with_context(|| format!("Failed to execute {}", self.config.program))?;

        if !status.success() {
            anyhow::bail!("{} exited with {}", self.config.program, status);
        }
        Ok(())
    }
}

/// Substitute placeholders in one pass, so text coming from the notification
/// is never expanded again.
fn render_template(template: &str, notif: &NotificationRecord) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let (value, len) = if tail.starts_with("{app_name}") {
            (notif.app_name(), "{app_name}".len())
        } else if tail.starts_with("{summary}") {
            (notif.summary(), "{summary}".len())
        } else if tail.starts_with("{body}") {
            (notif.body(), "{body}".len())
        } else {
            ("{", 1)
        };
        out.push_str(value);
        rest = &tail[len..];
    }
    out.push_str(rest);
    out
}
