use anyhow::{Context, Result};
use log::warn;

use crate::clockify::{ClockifyRepository, User};
use crate::config::Config;
use crate::datetime;
use crate::notify::{Notification, NotificationMode};
use crate::query::parse_query;
use crate::tags::resolve_tag_ids;
use crate::time_entry::{NewTimeEntry, TimeEntry};

/// ユーザーの操作を表す列挙型。
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// 自由文をタイトルとして新しいtime entryを開始する。
    New { message: String },
    /// 直前のtime entryのタイトルとタグを引き継いで開始する。
    Resume,
    /// 実行中のtime entryを終了する。
    End,
    /// タイトルを更新してから実行中のtime entryを終了する。
    EndWithUpdate { message: String },
    /// 実行中のtime entryの情報を表示する。
    Info,
}

/// time entryのライフサイクル操作を組み立てる構造体。
///
/// 「実行中かどうか」の状態はローカルには保持せず、必要になるたびにClockify APIへ問い合わせる。
/// 正しい状態を知っているのはAPI側だけであり、複数クライアントからの操作と矛盾しないようにするため。
pub struct Tracker<'a, T: ClockifyRepository> {
    repository: &'a T,
    user: &'a User,
    config: &'a Config,
}

impl<'a, T: ClockifyRepository> Tracker<'a, T> {
    /// 新しい`Tracker`を返す。
    ///
    /// # Arguments
    /// * `repository` - Clockify APIと通信するためのリポジトリ
    /// * `user` - 認証済みユーザーの情報
    /// * `config` - アプリケーションの設定
    pub fn new(repository: &'a T, user: &'a User, config: &'a Config) -> Self {
        Self {
            repository,
            user,
            config,
        }
    }

    /// 操作を実行し、結果を通知として返す。
    ///
    /// 失敗した場合もpanicや伝播はさせず、必ず1つのエラー通知に変換する。
    pub async fn run(&self, action: Action) -> Notification {
        let result = match action {
            Action::New { message } => self.start(&message).await,
            Action::Resume => self.resume().await,
            Action::End => self.end().await,
            Action::EndWithUpdate { message } => self.end_with_update(&message).await,
            Action::Info => self.info().await,
        };

        result.unwrap_or_else(|error| {
            warn!("Command failed: {:#}", error);
            Notification::new(
                "Unexpected error",
                format!("{:#}", error),
                NotificationMode::Error,
            )
        })
    }

    /// 自由文を解析して新しいtime entryを開始する。
    async fn start(&self, message: &str) -> Result<Notification> {
        let parsed = parse_query(message);
        let project_id = self.resolve_project_id(parsed.project_name.as_deref()).await?;
        let tag_ids = resolve_tag_ids(
            self.repository,
            &self.user.default_workspace,
            &parsed.tag_names,
        )
        .await?;

        let entry = NewTimeEntry {
            description: parsed.description,
            tag_ids,
            project_id,
            start: datetime::now(),
        };
        let created = self
            .repository
            .create_time_entry(&self.user.default_workspace, &entry)
            .await
            .context("Could not create a new time entry")?;

        Ok(Notification::new(
            "Started time entry",
            created.description,
            NotificationMode::Start,
        ))
    }

    /// 直前のtime entryのタイトルとタグを引き継いで開始する。
    ///
    /// プロジェクトは引き継がず、設定のデフォルトプロジェクトを利用する。
    async fn resume(&self) -> Result<Notification> {
        let last = self
            .repository
            .get_last_time_entry(&self.user.default_workspace, &self.user.id)
            .await
            .context("Failed to get the latest time entry")?;
        let Some(last) = last else {
            return Ok(Notification::new(
                "There is no time entry to resume",
                "Start a new one instead",
                NotificationMode::Status,
            ));
        };

        let entry = NewTimeEntry {
            description: last.description,
            tag_ids: last.tag_ids,
            project_id: self.config.default_project_id.clone(),
            start: datetime::now(),
        };
        let created = self
            .repository
            .create_time_entry(&self.user.default_workspace, &entry)
            .await
            .context("Could not create a new time entry")?;

        Ok(Notification::new(
            "Resuming time entry",
            created.description,
            NotificationMode::Start,
        ))
    }

    /// 実行中のtime entryを終了する。
    async fn end(&self) -> Result<Notification> {
        let stopped = self
            .repository
            .stop_running_entry(&self.user.default_workspace, &self.user.id, datetime::now())
            .await
            .context("Could not stop time tracking")?;
        let Some(stopped) = stopped else {
            return Ok(no_running_entry());
        };

        Ok(Notification::new(
            "Stopped time tracking",
            clocked_body(&stopped),
            NotificationMode::Stop,
        ))
    }

    /// タイトル・タグ・プロジェクトを更新してから実行中のtime entryを終了する。
    ///
    /// 開始時刻は変更せず、実行中のentryの値をそのまま送り返す。
    async fn end_with_update(&self, message: &str) -> Result<Notification> {
        let running = self
            .repository
            .get_running_time_entry(&self.user.default_workspace, &self.user.id)
            .await
            .context("Failed to get the running time entry")?;
        let Some(running) = running else {
            return Ok(no_running_entry());
        };

        let parsed = parse_query(message);
        let project_id = self.resolve_project_id(parsed.project_name.as_deref()).await?;
        let tag_ids = resolve_tag_ids(
            self.repository,
            &self.user.default_workspace,
            &parsed.tag_names,
        )
        .await?;

        let entry = NewTimeEntry {
            description: parsed.description,
            tag_ids,
            project_id,
            start: running.start,
        };
        let updated = self
            .repository
            .replace_time_entry(
                &self.user.default_workspace,
                &running.id,
                &entry,
                datetime::now(),
            )
            .await
            .context("Could not stop time tracking")?;

        Ok(Notification::new(
            "Updated title and stopped time tracking",
            clocked_body(&updated),
            NotificationMode::Stop,
        ))
    }

    /// 実行中のtime entryの情報を返す。
    async fn info(&self) -> Result<Notification> {
        let running = self
            .repository
            .get_running_time_entry(&self.user.default_workspace, &self.user.id)
            .await
            .context("Failed to get the running time entry")?;
        let Some(running) = running else {
            return Ok(no_running_entry());
        };

        let clocked = datetime::format_clocked(&(datetime::now() - running.start));
        Ok(Notification::new(
            "Current time tracking",
            format!("{} (Clocked: {})", running.description, clocked),
            NotificationMode::Status,
        ))
    }

    /// プロジェクト名をIDへ解決する。
    ///
    /// 名前の指定がない場合と一致するプロジェクトがない場合は、
    /// 設定のデフォルトプロジェクトを利用する。
    async fn resolve_project_id(&self, project_name: Option<&str>) -> Result<Option<String>> {
        let Some(name) = project_name else {
            return Ok(self.config.default_project_id.clone());
        };

        match self
            .repository
            .find_project_by_name(&self.user.default_workspace, name)
            .await
            .with_context(|| format!("Failed to look up project '{}'", name))?
        {
            Some(project) => Ok(Some(project.id)),
            None => {
                warn!(
                    "Project '{}' was not found, falling back to the default project",
                    name
                );
                Ok(self.config.default_project_id.clone())
            }
        }
    }
}

/// 実行中のtime entryがない場合の通知。エラーではなく状態として扱う。
fn no_running_entry() -> Notification {
    Notification::new(
        "There is currently no running time entry",
        "Get back to work!",
        NotificationMode::Status,
    )
}

/// 終了したtime entryの通知本文を組み立てる。
fn clocked_body(entry: &TimeEntry) -> String {
    let end = entry.end.unwrap_or_else(datetime::now);
    let clocked = datetime::format_clocked(&(end - entry.start));

    format!("{} (Clocked: {})", entry.description, clocked)
}
