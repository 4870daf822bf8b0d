use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
#[cfg(test)]
use mockall::automock;
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::datetime;
use crate::time_entry::{NewTimeEntry, TimeEntry};

/// リトライは行わず、transportレベルの失敗はこのタイムアウトで打ち切る。
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Clockifyのユーザー情報。
///
/// 1回のコマンド実行の間は不変として扱う。
#[derive(Clone, Debug)]
pub struct User {
    pub id: String,
    pub time_zone: String,
    pub default_workspace: String,
}

/// Clockifyのタグ情報。
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// Clockifyのプロジェクト情報。
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// Clockify APIのユーザーレスポンスをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClockifyUser {
    id: String,
    default_workspace: String,
    settings: ClockifyUserSettings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClockifyUserSettings {
    time_zone: String,
}

/// Clockify APIのtime entryレスポンスをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClockifyTimeEntry {
    id: String,
    description: String,
    #[serde(default)]
    tag_ids: Option<Vec<String>>,
    project_id: Option<String>,
    time_interval: ClockifyTimeInterval,
}

#[derive(Debug, Deserialize)]
struct ClockifyTimeInterval {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
}

impl From<ClockifyTimeEntry> for TimeEntry {
    fn from(entry: ClockifyTimeEntry) -> Self {
        Self {
            id: entry.id,
            description: entry.description,
            tag_ids: entry.tag_ids.unwrap_or_default(),
            project_id: entry.project_id,
            start: entry.time_interval.start,
            end: entry.time_interval.end,
        }
    }
}

/// タグ作成リクエストのボディ。
#[derive(Debug, Serialize)]
struct CreateTagBody<'a> {
    name: &'a str,
}

/// time entryの作成・更新リクエストのボディ。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimeEntryBody<'a> {
    description: &'a str,
    tag_ids: &'a [String],
    project_id: Option<&'a str>,
    start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<String>,
}

impl<'a> TimeEntryBody<'a> {
    fn new(entry: &'a NewTimeEntry, end: Option<DateTime<Utc>>) -> Self {
        Self {
            description: &entry.description,
            tag_ids: &entry.tag_ids,
            project_id: entry.project_id.as_deref(),
            start: datetime::format_timestamp(&entry.start),
            end: end.map(|end| datetime::format_timestamp(&end)),
        }
    }
}

/// time entry停止リクエストのボディ。
#[derive(Debug, Serialize)]
struct StopBody {
    end: String,
}

/// Clockify APIへの操作を表すtrait。
///
/// ネットワークI/Oを行うのはこのtraitの実装のみで、テストでは`MockClockifyRepository`に差し替える。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClockifyRepository {
    /// 認証済みユーザーの情報を取得する。
    async fn get_user(&self) -> Result<User>;

    /// 名前が完全一致するタグを検索する。見つからない場合は`None`を返す。
    async fn find_tag_by_name(&self, workspace_id: &str, name: &str) -> Result<Option<Tag>>;

    /// タグを作成する。
    async fn create_tag(&self, workspace_id: &str, name: &str) -> Result<Tag>;

    /// 名前が一致するプロジェクトを検索する。見つからない場合は`None`を返す。
    async fn find_project_by_name(
        &self,
        workspace_id: &str,
        name: &str,
    ) -> Result<Option<Project>>;

    /// 開始時刻の降順で最新のtime entryを1件取得する。
    async fn get_last_time_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<TimeEntry>>;

    /// 実行中のtime entryを取得する。実行中のentryがない場合は`None`を返す。
    async fn get_running_time_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<TimeEntry>>;

    /// 新しいtime entryを作成する。
    async fn create_time_entry(
        &self,
        workspace_id: &str,
        entry: &NewTimeEntry,
    ) -> Result<TimeEntry>;

    /// 実行中のtime entryを終了する。実行中のentryがない場合は`None`を返す。
    async fn stop_running_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        end: DateTime<Utc>,
    ) -> Result<Option<TimeEntry>>;

    /// 既存のtime entryの内容を置き換えて終了する。
    ///
    /// `start`はAPI側で変更されないよう、既存の値をそのまま送り返す。
    async fn replace_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        entry: &NewTimeEntry,
        end: DateTime<Utc>,
    ) -> Result<TimeEntry>;
}

/// Clockify APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = ClockifyClient::new("https://api.clockify.me/api/v1", &api_key).unwrap();
/// let user = client.get_user().await.unwrap();
/// ```
pub struct ClockifyClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ClockifyClient {
    /// 新しい`ClockifyClient`を返す。
    pub fn new(api_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build the HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// 認証ヘッダーを付与したリクエストを作成する。
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .header(CONTENT_TYPE, "application/json")
            .header("X-Api-Key", &self.api_key)
    }
}

#[async_trait]
impl ClockifyRepository for ClockifyClient {
    async fn get_user(&self) -> Result<User> {
        let user = self
            .request(Method::GET, "/user")
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to Clockify API at {}", self.api_url)
            })?
            .error_for_status()
            .context("Failed to get the user profile")?
            .json::<ClockifyUser>()
            .await
            .context("Failed to deserialize the user response")?;
        debug!(
            "User {} uses workspace {} ({})",
            user.id, user.default_workspace, user.settings.time_zone
        );

        Ok(User {
            id: user.id,
            time_zone: user.settings.time_zone,
            default_workspace: user.default_workspace,
        })
    }

    async fn find_tag_by_name(&self, workspace_id: &str, name: &str) -> Result<Option<Tag>> {
        let tags = self
            .request(Method::GET, &format!("/workspaces/{}/tags", workspace_id))
            .query(&[("name", name)])
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to Clockify API at {}", self.api_url)
            })?
            .error_for_status()
            .with_context(|| format!("Failed to get tag by name '{}'", name))?
            .json::<Vec<Tag>>()
            .await
            .context("Failed to deserialize the tag response")?;

        Ok(tags.into_iter().next())
    }

    async fn create_tag(&self, workspace_id: &str, name: &str) -> Result<Tag> {
        let tag = self
            .request(Method::POST, &format!("/workspaces/{}/tags", workspace_id))
            .json(&CreateTagBody { name })
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to Clockify API at {}", self.api_url)
            })?
            .error_for_status()
            .with_context(|| format!("Failed to create tag '{}'", name))?
            .json::<Tag>()
            .await
            .context("Failed to deserialize the tag response")?;

        Ok(tag)
    }

    async fn find_project_by_name(
        &self,
        workspace_id: &str,
        name: &str,
    ) -> Result<Option<Project>> {
        let projects = self
            .request(
                Method::GET,
                &format!("/workspaces/{}/projects", workspace_id),
            )
            .query(&[("name", name)])
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to Clockify API at {}", self.api_url)
            })?
            .error_for_status()
            .with_context(|| format!("Failed to get project by name '{}'", name))?
            .json::<Vec<Project>>()
            .await
            .context("Failed to deserialize the project response")?;

        Ok(projects.into_iter().next())
    }

    async fn get_last_time_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<TimeEntry>> {
        let entries = self
            .request(
                Method::GET,
                &format!("/workspaces/{}/user/{}/time-entries", workspace_id, user_id),
            )
            .query(&[("page-size", "1")])
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to Clockify API at {}", self.api_url)
            })?
            .error_for_status()
            .context("Failed to get the latest time entry")?
            .json::<Vec<ClockifyTimeEntry>>()
            .await
            .context("Failed to deserialize the time entry response")?;

        Ok(entries.into_iter().next().map(TimeEntry::from))
    }

    async fn get_running_time_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<TimeEntry>> {
        let entries = self
            .request(
                Method::GET,
                &format!("/workspaces/{}/user/{}/time-entries", workspace_id, user_id),
            )
            .query(&[("in-progress", "true")])
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to Clockify API at {}", self.api_url)
            })?
            .error_for_status()
            .context("Failed to get the running time entry")?
            .json::<Vec<ClockifyTimeEntry>>()
            .await
            .context("Failed to deserialize the time entry response")?;

        Ok(entries.into_iter().next().map(TimeEntry::from))
    }

    async fn create_time_entry(
        &self,
        workspace_id: &str,
        entry: &NewTimeEntry,
    ) -> Result<TimeEntry> {
        debug!("Starting time entry: {:?}", entry);
        let created = self
            .request(
                Method::POST,
                &format!("/workspaces/{}/time-entries", workspace_id),
            )
            .json(&TimeEntryBody::new(entry, None))
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to Clockify API at {}", self.api_url)
            })?
            .error_for_status()
            .context("Failed to create a time entry")?
            .json::<ClockifyTimeEntry>()
            .await
            .context("Failed to deserialize the time entry response")?;

        Ok(created.into())
    }

    async fn stop_running_entry(
        &self,
        workspace_id: &str,
        user_id: &str,
        end: DateTime<Utc>,
    ) -> Result<Option<TimeEntry>> {
        let response = self
            .request(
                Method::PATCH,
                &format!("/workspaces/{}/user/{}/time-entries", workspace_id, user_id),
            )
            .json(&StopBody {
                end: datetime::format_timestamp(&end),
            })
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to Clockify API at {}", self.api_url)
            })?;

        // 実行中のentryがない場合、Clockifyは404を返す
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let stopped = response
            .error_for_status()
            .context("Failed to stop the time entry")?
            .json::<ClockifyTimeEntry>()
            .await
            .context("Failed to deserialize the time entry response")?;

        Ok(Some(stopped.into()))
    }

    async fn replace_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        entry: &NewTimeEntry,
        end: DateTime<Utc>,
    ) -> Result<TimeEntry> {
        let updated = self
            .request(
                Method::PUT,
                &format!("/workspaces/{}/time-entries/{}", workspace_id, entry_id),
            )
            .json(&TimeEntryBody::new(entry, Some(end)))
            .send()
            .await
            .with_context(|| {
                format!("Failed to send request to Clockify API at {}", self.api_url)
            })?
            .error_for_status()
            .context("Failed to update the time entry")?
            .json::<ClockifyTimeEntry>()
            .await
            .context("Failed to deserialize the time entry response")?;

        Ok(updated.into())
    }
}
