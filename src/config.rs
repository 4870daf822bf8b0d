use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// 通知の表示レベル。
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationsLevel {
    /// すべての通知を表示する。
    #[default]
    All,
    /// エラーと状態の通知のみ表示する。
    ErrorsAndStatus,
}

/// アプリケーションの設定。
///
/// 各コマンドの実行時に読み込み、実行中は不変として扱う。
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Clockify APIの認証キー。
    pub api_key: String,
    /// プロジェクトの指定がない場合に利用するプロジェクトID。
    #[serde(default)]
    pub default_project_id: Option<String>,
    /// 通知の表示レベル。
    #[serde(default)]
    pub notifications_level: NotificationsLevel,
}

impl Config {
    /// 設定を読み込む。
    ///
    /// 環境変数`CLOCKIFY_API_KEY`が設定されている場合は環境変数
    /// (`CLOCKIFY_PROJECT_ID`、`CLOCKIFY_NOTIFICATIONS_LEVEL`)から、
    /// そうでない場合は設定ファイルから読み込む。
    pub fn load() -> Result<Self> {
        if let Ok(api_key) = env::var("CLOCKIFY_API_KEY") {
            return Ok(Self {
                api_key,
                default_project_id: env::var("CLOCKIFY_PROJECT_ID").ok(),
                notifications_level: match env::var("CLOCKIFY_NOTIFICATIONS_LEVEL") {
                    Ok(level) if level == "errors_and_status" => {
                        NotificationsLevel::ErrorsAndStatus
                    }
                    _ => NotificationsLevel::All,
                },
            });
        }

        let path = Self::default_path().context("Failed to resolve the config directory")?;
        Self::from_file(&path)
    }

    /// 設定ファイルを読み込む。
    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// デフォルトの設定ファイルのパスを返す。
    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cloq").join("config.json"))
    }
}
