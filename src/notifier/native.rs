//! Concrete [`NotificationPlatform`]s.

use async_trait::async_trait;

use crate::notifier::payload::SystemNotification;
use crate::notifier::permission::{NotificationPlatform, PermissionState};

/// Writes notifications to the log. Useful headless and in demos.
pub struct LogPlatform {
    state: PermissionState,
}

impl LogPlatform {
    pub fn new(state: PermissionState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl NotificationPlatform for LogPlatform {
    fn permission(&self) -> PermissionState {
        self.state
    }

    async fn request_permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    async fn show(&self, n: &SystemNotification) -> anyhow::Result<()> {
        tracing::info!(tag = %n.tag, "[system notification] {} - {}", n.title, n.body);
        Ok(())
    }
}

/// Desktop notifications through `notify-send` (Linux) or `osascript` (macOS).
///
/// Permission starts undecided; the request checks whether the helper binary
/// is usable and grants or denies accordingly.
pub struct CommandPlatform;

impl CommandPlatform {
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    fn escape_applescript(s: &str) -> String {
        s.replace('\\', "\\\\").replace('"', "\\\"")
    }

    #[cfg(target_os = "macos")]
    fn availability_check() -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("osascript");
        cmd.args(["-e", "return"]);
        cmd
    }

    #[cfg(not(target_os = "macos"))]
    fn availability_check() -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("notify-send");
        cmd.arg("--version");
        cmd
    }

    #[cfg(target_os = "macos")]
    fn command_for(n: &SystemNotification) -> tokio::process::Command {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            Self::escape_applescript(&n.body),
            Self::escape_applescript(&n.title)
        );
        let mut cmd = tokio::process::Command::new("osascript");
        cmd.args(["-e", &script]);
        cmd
    }

    #[cfg(not(target_os = "macos"))]
    fn command_for(n: &SystemNotification) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("notify-send");
        // Same tag replaces the previous bubble instead of stacking
        cmd.arg("-h")
            .arg(format!("string:x-canonical-private-synchronous:{}", n.tag));
        if n.require_interaction {
            cmd.args(["-u", "critical"]);
        }
        cmd.arg(&n.title).arg(&n.body);
        cmd
    }
}

#[async_trait]
impl NotificationPlatform for CommandPlatform {
    fn permission(&self) -> PermissionState {
        PermissionState::Default
    }

    async fn request_permission(&self) -> PermissionState {
        match Self::availability_check().output().await {
            Ok(out) if out.status.success() => PermissionState::Granted,
            Ok(out) => {
                tracing::debug!("Notification helper exited with {}", out.status);
                PermissionState::Denied
            }
            Err(e) => {
                tracing::debug!("Notification helper unavailable: {}", e);
                PermissionState::Denied
            }
        }
    }

    async fn show(&self, n: &SystemNotification) -> anyhow::Result<()> {
        let status = Self::command_for(n).status().await?;
        if !status.success() {
            anyhow::bail!("notification helper exited with {}", status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applescript_strings_are_escaped() {
        assert_eq!(
            CommandPlatform::escape_applescript(r#"say "hi" \o/"#),
            r#"say \"hi\" \\o/"#
        );
    }

    #[tokio::test]
    async fn log_platform_reports_configured_state() {
        let platform = LogPlatform::new(PermissionState::Denied);
        assert_eq!(platform.permission(), PermissionState::Denied);
        let n = SystemNotification {
            title: "t".into(),
            body: "b".into(),
            tag: "x".into(),
            require_interaction: false,
        };
        assert!(platform.show(&n).await.is_ok());
    }
}
