use chrono::{DateTime, Duration, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Clockify APIへ渡すタイムスタンプ形式の文字列に変換する。
///
/// 日付と時刻を`T`で区切り、マイクロ秒までを含むUTC時間として末尾に`Z`を付与する。
///
/// # Examples
///
/// ```
/// let timestamp = format_timestamp(&datetime::now());
/// // => "2024-01-01T09:30:15.123456Z"
/// ```
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// 経過時間を`{時間}H{分}M`形式の文字列に変換する。
///
/// 秒以下は切り捨てる。負の経過時間は0として扱う。
pub fn format_clocked(duration: &Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{}H{}M", minutes / 60, minutes % 60)
}

/// テスト時に利用するモック時間を取得する。
#[cfg(test)]
pub mod mock_datetime {
    use std::cell::RefCell;

    use super::DateTime;
    use super::Utc;

    thread_local! {
        static MOCK_TIME: RefCell<Option<DateTime<Utc>>> = RefCell::new(None);
    }

    /// モック時間を取得する。
    pub fn now() -> DateTime<Utc> {
        MOCK_TIME.with(|cell| cell.borrow().as_ref().cloned().unwrap_or_else(Utc::now))
    }

    /// モック時間を設定する。
    pub fn set_mock_time(time: DateTime<Utc>) {
        MOCK_TIME.with(|cell| *cell.borrow_mut() = Some(time));
    }

    // 設定したモック時間をクリアする。
    pub fn clear_mock_time() {
        MOCK_TIME.with(|cell| *cell.borrow_mut() = None);
    }
}

#[cfg(test)]
pub use mock_datetime::now;

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Timelike, Utc};
    use rstest::rstest;

    use super::format_clocked;
    use super::format_timestamp;
    use super::mock_datetime;

    /// 何も設定しない場合は、現在時間が取得できることを確認する。
    ///
    ///  - 現在時刻での比較を行なっているため、ミリ秒単位まで比較するとテストが失敗する可能性があり、秒単位で比較している。
    #[test]
    fn test_now() {
        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// モック時間を設定した時に、その時間が取得できることを確認する。
    #[test]
    fn test_now_specific_datetime() {
        let datetime = String::from("2024-01-01T00:00:00+00:00");
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339(datetime.as_str())
                .unwrap()
                .to_utc(),
        );

        assert_eq!(mock_datetime::now().to_rfc3339(), datetime);
    }

    /// モック時間をリセットした時に、現在時間が取得できることを確認する。
    #[test]
    fn test_now_after_clear_mock_time() {
        let datetime = String::from("2024-01-01T00:00:00+00:00");
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339(datetime.as_str())
                .unwrap()
                .to_utc(),
        );
        mock_datetime::clear_mock_time();

        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// `T`区切りとマイクロ秒、`Z`サフィックスを含む形式になることを確認する。
    #[test]
    fn test_format_timestamp() {
        let time = Utc
            .with_ymd_and_hms(2024, 1, 1, 9, 30, 15)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();

        assert_eq!(format_timestamp(&time), "2024-01-01T09:30:15.123456Z");
    }

    /// 秒以下を切り捨てた`{時間}H{分}M`形式になることを確認する。
    #[rstest]
    #[case::zero(Duration::zero(), "0H0M")]
    #[case::seconds_only(Duration::seconds(59), "0H0M")]
    #[case::floor_seconds(Duration::seconds(3930), "1H5M")]
    #[case::exact_minutes(Duration::minutes(65), "1H5M")]
    #[case::more_than_a_day(Duration::hours(25), "25H0M")]
    #[case::negative(Duration::seconds(-10), "0H0M")]
    fn test_format_clocked(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(format_clocked(&duration), expected);
    }
}
