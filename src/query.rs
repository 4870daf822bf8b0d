use once_cell::sync::Lazy;
use regex::Regex;

/// タグを表すトークンの正規表現。
///
/// regexクレートは後読みをサポートしないため、`\#`のようにエスケープされたものも含めて
/// マッチさせ、エスケープの判定は抽出時に行う。
/// トークン直後のスペースを1つだけ取り込むことで、除去後に二重スペースが残らないようにする。
static TAG_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\?#[\w\-]+ ?").unwrap());

/// プロジェクトを表すトークンの正規表現。タグと同じ規則で`@`を目印にする。
static PROJECT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\?@[\w\-]+ ?").unwrap());

/// 自由文の解析結果。
///
/// `tag_names`は重複を除き、最初に出現した順序を保つ。
/// `project_name`が`None`の場合は設定のデフォルトプロジェクトを利用する。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedQuery {
    pub description: String,
    pub tag_names: Vec<String>,
    pub project_name: Option<String>,
}

/// 自由文からタグとプロジェクトのトークンを抽出する。
///
/// 入力は任意の文字列を受け付け、失敗しない。
/// トークンをすべて除去した結果、descriptionが空になることも許容する。
///
/// # Examples
///
/// ```
/// let parsed = parse_query("write spec #docs @infra");
/// // => description: "write spec", tag_names: ["docs"], project_name: Some("infra")
/// ```
pub fn parse_query(text: &str) -> ParsedQuery {
    let (text, project_names) = extract_tokens(text, &PROJECT_TOKEN);
    let (description, tag_names) = extract_tokens(&text, &TAG_TOKEN);

    ParsedQuery {
        description: description.trim().to_string(),
        tag_names,
        project_name: project_names.into_iter().next(),
    }
}

/// 1種類のトークンを抽出し、除去後の文字列とトークン名のリストを返す。
///
/// トークン名は重複を除き、最初に出現した順序を保つ。
/// `\`でエスケープされたトークンは抽出せず、バックスラッシュごと本文に残す。
/// エスケープを残すことで、除去後の文字列を再解析しても新しいトークンは見つからない。
fn extract_tokens(text: &str, token: &Regex) -> (String, Vec<String>) {
    let mut cleaned = String::with_capacity(text.len());
    let mut names = Vec::new();
    let mut last_end = 0;

    for matched in token.find_iter(text) {
        cleaned.push_str(&text[last_end..matched.start()]);
        let token_text = matched.as_str();
        if token_text.starts_with('\\') {
            cleaned.push_str(token_text);
        } else {
            let name = token_text[1..].trim_end().to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        last_end = matched.end();
    }
    cleaned.push_str(&text[last_end..]);

    (cleaned, names)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::parse_query;

    /// 自由文からタグとプロジェクトが抽出できることを確認する。
    #[rstest]
    #[case::plain("fix the build", "fix the build", &[], None)]
    #[case::empty("", "", &[], None)]
    #[case::single_tag("fix the build #ci", "fix the build", &["ci"], None)]
    #[case::tag_in_middle("fix #ci the build", "fix the build", &["ci"], None)]
    #[case::duplicated_tags("#tag1 #tag1 text", "text", &["tag1"], None)]
    #[case::multiple_tags("#b #a text #b", "text", &["b", "a"], None)]
    #[case::tags_only("#a #b", "", &["a", "b"], None)]
    #[case::hyphen_and_underscore("#my-tag_1 x", "x", &["my-tag_1"], None)]
    #[case::escaped_tag(r"\#nottag text", r"\#nottag text", &[], None)]
    #[case::escaped_and_real_tag(r"\#nottag #real text", r"\#nottag text", &["real"], None)]
    #[case::project("write spec #docs @infra", "write spec", &["docs"], Some("infra"))]
    #[case::project_only("@infra", "", &[], Some("infra"))]
    #[case::multiple_projects("a @p1 b @p2 c", "a b c", &[], Some("p1"))]
    #[case::escaped_project(r"stay \@home today", r"stay \@home today", &[], None)]
    fn test_parse_query(
        #[case] input: &str,
        #[case] description: &str,
        #[case] tag_names: &[&str],
        #[case] project_name: Option<&str>,
    ) {
        let parsed = parse_query(input);

        assert_eq!(parsed.description, description);
        assert_eq!(parsed.tag_names, tag_names);
        assert_eq!(parsed.project_name.as_deref(), project_name);
    }

    /// 除去後のdescriptionを再解析しても、新しいトークンが見つからないことを確認する。
    #[rstest]
    #[case("write spec #docs @infra")]
    #[case(r"\#nottag #real text")]
    #[case(r"stay \@home today @p1")]
    #[case("#a #b")]
    fn test_parse_query_is_idempotent(#[case] input: &str) {
        let first = parse_query(input);
        let second = parse_query(&first.description);

        assert_eq!(second.description, first.description);
        assert!(second.tag_names.is_empty());
        assert!(second.project_name.is_none());
    }
}
