//! Desktop notifications.
//!
//! Notifications are fire-and-forget: callers log a [`DeployError::NotificationFailed`]
//! and carry on. Rendering is left entirely to the platform tool
//! (`notify-send`, `osascript`, PowerShell).

use std::process::{Command, Stdio};

use crate::error::DeployError;
use crate::platform::OsFamily;

/// How long a Windows balloon tip stays up, in milliseconds.
const BALLOON_TIMEOUT_MS: u32 = 10_000;

const APP_NAME: &str = "autodeploy";

/// Receives the outcome of a run.
pub trait Notifier {
    fn notify(&self, success: bool, title: &str, message: &str) -> Result<(), DeployError>;
}

/// Shows a native desktop notification by shelling out to the OS tool.
#[derive(Debug, Clone, Copy)]
pub struct DesktopNotifier {
    os: OsFamily,
}

impl DesktopNotifier {
    pub fn new(os: OsFamily) -> Self {
        Self { os }
    }

    pub fn for_host() -> Self {
        Self::new(OsFamily::host())
    }

    /// The command line that displays the notification on this OS.
    pub fn argv(&self, success: bool, title: &str, message: &str) -> Vec<String> {
        match self.os {
            OsFamily::Linux => vec![
                "notify-send".to_string(),
                format!("--app-name={APP_NAME}"),
                format!("--urgency={}", if success { "normal" } else { "critical" }),
                format!(
                    "--icon={}",
                    if success {
                        "dialog-information"
                    } else {
                        "dialog-error"
                    }
                ),
                title.to_string(),
                message.to_string(),
            ],
            OsFamily::MacOs => vec![
                "osascript".to_string(),
                "-e".to_string(),
                format!(
                    "display notification {} with title {}",
                    applescript_quote(message),
                    applescript_quote(title)
                ),
            ],
            OsFamily::Windows => {
                let (icon, tip) = if success {
                    ("Information", "Info")
                } else {
                    ("Error", "Error")
                };
                let script = format!(
                    "Add-Type -AssemblyName System.Windows.Forms; \
                     $n = New-Object System.Windows.Forms.NotifyIcon; \
                     $n.Icon = [System.Drawing.SystemIcons]::{icon}; \
                     $n.Visible = $true; \
                     $n.ShowBalloonTip({BALLOON_TIMEOUT_MS}, {}, {}, '{tip}'); \
                     Start-Sleep -Seconds 1; \
                     $n.Dispose()",
                    powershell_quote(title),
                    powershell_quote(message)
                );
                vec![
                    "powershell".to_string(),
                    "-NoProfile".to_string(),
                    "-NonInteractive".to_string(),
                    "-Command".to_string(),
                    script,
                ]
            }
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, success: bool, title: &str, message: &str) -> Result<(), DeployError> {
        run_notifier(&self.argv(success, title, message))
    }
}

/// Run a notifier command line and map any failure to `NotificationFailed`.
fn run_notifier(argv: &[String]) -> Result<(), DeployError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(DeployError::NotificationFailed(
            "notifier command is empty".to_string(),
        ));
    };

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| DeployError::NotificationFailed(format!("could not run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeployError::NotificationFailed(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

fn applescript_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn powershell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_uses_notify_send() {
        let argv = DesktopNotifier::new(OsFamily::Linux).argv(true, "Build completed!", "ok");
        assert_eq!(argv[0], "notify-send");
        assert!(argv.contains(&"--urgency=normal".to_string()));
        assert_eq!(&argv[argv.len() - 2..], ["Build completed!", "ok"]);

        let argv = DesktopNotifier::new(OsFamily::Linux).argv(false, "Build failed!", "no");
        assert!(argv.contains(&"--urgency=critical".to_string()));
        assert!(argv.contains(&"--icon=dialog-error".to_string()));
    }

    #[test]
    fn macos_quotes_applescript() {
        let argv = DesktopNotifier::new(OsFamily::MacOs).argv(true, "Done", r#"said "hi" \o/"#);
        assert_eq!(argv[0], "osascript");
        assert_eq!(
            argv[2],
            r#"display notification "said \"hi\" \\o/" with title "Done""#
        );
    }

    #[test]
    fn windows_quotes_powershell() {
        let argv = DesktopNotifier::new(OsFamily::Windows).argv(false, "Build failed!", "it's broken");
        assert_eq!(argv[0], "powershell");
        let script = argv.last().unwrap();
        assert!(script.contains("'Build failed!'"));
        assert!(script.contains("'it''s broken'"));
        assert!(script.contains("SystemIcons]::Error"));
        assert!(script.contains("ShowBalloonTip(10000,"));
    }

    #[test]
    fn missing_notifier_program_is_notification_failure() {
        let argv = vec!["no-such-notifier-binary-xyz".to_string(), "hi".to_string()];
        match run_notifier(&argv) {
            Err(DeployError::NotificationFailed(msg)) => {
                assert!(msg.contains("no-such-notifier-binary-xyz"));
            }
            other => panic!("expected NotificationFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn failing_notifier_is_notification_failure() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "echo no display >&2; exit 1".to_string()];
        match run_notifier(&argv) {
            Err(DeployError::NotificationFailed(msg)) => assert!(msg.contains("no display")),
            other => panic!("expected NotificationFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn successful_notifier() {
        assert!(run_notifier(&["true".to_string()]).is_ok());
    }
}
