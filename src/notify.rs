use std::fmt;
use std::io::Write;

use anyhow::{Context, Result};

use crate::config::NotificationsLevel;

/// 通知の種類を表す列挙型。表示可否と強調の制御に利用する。
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NotificationMode {
    Start,
    Stop,
    Status,
    Error,
}

impl fmt::Display for NotificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Status => "status",
            Self::Error => "error",
        };
        write!(f, "{}", label)
    }
}

/// ユーザーへ表示する通知。
///
/// 通知の副作用そのものではなく値として受け渡すことで、orchestratorを通知先なしでテストできる。
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub mode: NotificationMode,
}

impl Notification {
    /// 新しい`Notification`を返す。
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        mode: NotificationMode,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            mode,
        }
    }
}

/// 通知を表示するためのtrait。
pub trait NotificationSink {
    /// 通知を表示する。
    ///
    /// 設定された通知レベルによっては何も表示しない。
    fn show(&mut self, notification: &Notification) -> Result<()>;
}

/// 通知をコンソールへ表示する。
pub struct ConsoleNotifier<'a, W: Write> {
    writer: &'a mut W,
    level: NotificationsLevel,
}

impl<'a, W: Write> ConsoleNotifier<'a, W> {
    /// 新しい`ConsoleNotifier`を返す。
    pub fn new(writer: &'a mut W, level: NotificationsLevel) -> Self {
        Self { writer, level }
    }
}

impl<'a, W: Write> NotificationSink for ConsoleNotifier<'a, W> {
    fn show(&mut self, notification: &Notification) -> Result<()> {
        if self.level == NotificationsLevel::ErrorsAndStatus
            && notification.mode != NotificationMode::Error
            && notification.mode != NotificationMode::Status
        {
            return Ok(());
        }

        writeln!(
            self.writer,
            "[{}] {}\n{}",
            notification.mode, notification.title, notification.body
        )
        .with_context(|| format!("Failed to write notification: {:?}", notification))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::ConsoleNotifier;
    use super::Notification;
    use super::NotificationMode;
    use super::NotificationSink;
    use crate::config::NotificationsLevel;

    /// 通知レベルに応じて表示・抑制が切り替わることを確認する。
    #[rstest]
    #[case::all_shows_start(
        NotificationsLevel::All,
        NotificationMode::Start,
        "[start] Started time entry\nwrite spec\n"
    )]
    #[case::all_shows_stop(
        NotificationsLevel::All,
        NotificationMode::Stop,
        "[stop] Started time entry\nwrite spec\n"
    )]
    #[case::quiet_hides_start(NotificationsLevel::ErrorsAndStatus, NotificationMode::Start, "")]
    #[case::quiet_hides_stop(NotificationsLevel::ErrorsAndStatus, NotificationMode::Stop, "")]
    #[case::quiet_shows_status(
        NotificationsLevel::ErrorsAndStatus,
        NotificationMode::Status,
        "[status] Started time entry\nwrite spec\n"
    )]
    #[case::quiet_shows_error(
        NotificationsLevel::ErrorsAndStatus,
        NotificationMode::Error,
        "[error] Started time entry\nwrite spec\n"
    )]
    fn test_show(
        #[case] level: NotificationsLevel,
        #[case] mode: NotificationMode,
        #[case] expected: &str,
    ) {
        let mut writer = Vec::new();
        let mut notifier = ConsoleNotifier::new(&mut writer, level);
        let notification = Notification::new("Started time entry", "write spec", mode);

        notifier.show(&notification).unwrap();

        assert_eq!(String::from_utf8(writer).unwrap(), expected);
    }
}
