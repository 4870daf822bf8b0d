use chrono::{DateTime, Utc};

/// Clockify上のtime entryを表す構造体。
///
/// `end`が`None`の場合は実行中のtime entryを表す。
#[derive(Clone, Debug, PartialEq)]
pub struct TimeEntry {
    pub id: String,
    pub description: String,
    pub tag_ids: Vec<String>,
    pub project_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// これから作成・更新するtime entryの内容を表す構造体。
#[derive(Clone, Debug, PartialEq)]
pub struct NewTimeEntry {
    pub description: String,
    pub tag_ids: Vec<String>,
    pub project_id: Option<String>,
    pub start: DateTime<Utc>,
}
