//! Desktop notifications through `notify-send` (libnotify).

use std::process::{Command, Stdio};

use tracing::warn;

use super::{Notification, UserNotifier};

const NOTIFY_SEND: &str = "notify-send";

#[derive(Debug, Clone)]
pub struct NotifySendNotifier {
    app_name: String,
}

impl NotifySendNotifier {
    pub fn new() -> Self {
        Self {
            app_name: "LangSync".to_string(),
        }
    }

    fn command(&self, notification: &Notification) -> Command {
        let mut command = Command::new(NOTIFY_SEND);
        command
            .arg("--app-name")
            .arg(&self.app_name)
            .arg("--urgency")
            .arg("normal")
            .arg(&notification.title)
            .arg(&notification.body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl Default for NotifySendNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl UserNotifier for NotifySendNotifier {
    fn show(&self, notification: &Notification) {
        match self.command(notification).status() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                warn!(%status, title = %notification.title, body = %notification.body, "notify-send failed");
            }
            // No notification daemon tooling installed; keep the message in the log.
            Err(e) => {
                warn!(error = %e, title = %notification.title, body = %notification.body, "could not run notify-send");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_passes_title_then_body() {
        let notifier = NotifySendNotifier::new();
        let command = notifier.command(&Notification {
            title: "Language synchronization error".into(),
            body: "missing: de".into(),
        });

        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(command.get_program(), NOTIFY_SEND);
        assert_eq!(
            &args[args.len() - 2..],
            ["Language synchronization error", "missing: de"]
        );
    }
}
