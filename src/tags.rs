use anyhow::{Context, Result};
use log::debug;

use crate::clockify::ClockifyRepository;

/// タグ名をタグIDへ解決する。存在しないタグは作成する。
///
/// 返り値のIDの順序は`names`の順序と一致する。
/// 途中で失敗した場合、作成済みのタグはロールバックしない。
/// 同名タグは名前で再検索できるため、次回の実行でそのまま再試行できる。
pub async fn resolve_tag_ids<T: ClockifyRepository>(
    repository: &T,
    workspace_id: &str,
    names: &[String],
) -> Result<Vec<String>> {
    let mut tag_ids = Vec::with_capacity(names.len());
    for name in names {
        let tag = match repository
            .find_tag_by_name(workspace_id, name)
            .await
            .with_context(|| format!("Failed to look up tag '{}'", name))?
        {
            Some(tag) => tag,
            None => {
                debug!("Creating tag '{}'", name);
                repository
                    .create_tag(workspace_id, name)
                    .await
                    .with_context(|| format!("Failed to create tag '{}'", name))?
            }
        };
        debug!(
            "Tag {}({}) will be attached to the time entry",
            tag.name, tag.id
        );
        tag_ids.push(tag.id);
    }

    Ok(tag_ids)
}
