use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};

mod clockify;
mod config;
mod datetime;
mod notify;
mod query;
mod tags;
mod time_entry;
mod tracker;

use clockify::{ClockifyClient, ClockifyRepository};
use config::Config;
use notify::{ConsoleNotifier, Notification, NotificationMode, NotificationSink};
use tracker::{Action, Tracker};

const API_BASE_URL: &str = "https://api.clockify.me/api/v1";
const TRACKER_URL: &str = "https://clockify.me/tracker";

/// Clockifyのtime entryを自由文から操作するためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- in 'write spec #docs @infra'
/// $ cargo run -- out
/// $ cargo run -- info
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Start a new time entry, or resume the last one when no text is given
    In { text: Vec<String> },
    /// Stop the running time entry, updating its title first when text is given
    Out { text: Vec<String> },
    /// Show the currently running time entry
    Info,
    /// Print the tracker website URL
    Open,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logger().context("Failed to set up the logger")?;

    let Some(action) = to_action(args.subcommand) else {
        println!("{}", TRACKER_URL);
        return Ok(());
    };

    let config = Config::load().context("Failed to load the configuration")?;
    let mut stdout = io::stdout();
    let mut sink = ConsoleNotifier::new(&mut stdout, config.notifications_level);

    let client = ClockifyClient::new(API_BASE_URL, &config.api_key)
        .context("Failed to build the Clockify client")?;
    // ユーザー情報が取得できない場合、workspaceが決まらないため処理を継続できない
    let user = match client.get_user().await {
        Ok(user) => user,
        Err(error) => {
            sink.show(&Notification::new(
                "Unexpected error",
                format!("{:#}", error),
                NotificationMode::Error,
            ))?;
            return Ok(());
        }
    };

    let tracker = Tracker::new(&client, &user, &config);
    let notification = tracker.run(action).await;
    sink.show(&notification)?;

    Ok(())
}

/// サブコマンドをtrackerの操作へ変換する。
///
/// trackerの操作を伴わないサブコマンドの場合は`None`を返す。
fn to_action(subcommand: SubCommands) -> Option<Action> {
    match subcommand {
        SubCommands::In { text } if text.is_empty() => Some(Action::Resume),
        SubCommands::In { text } => Some(Action::New {
            message: text.join(" "),
        }),
        SubCommands::Out { text } if text.is_empty() => Some(Action::End),
        SubCommands::Out { text } => Some(Action::EndWithUpdate {
            message: text.join(" "),
        }),
        SubCommands::Info => Some(Action::Info),
        SubCommands::Open => None,
    }
}

/// ロガーを初期化する。
fn setup_logger() -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .debug(Color::BrightBlack)
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                message
            ))
        })
        .level(log::LevelFilter::Warn)
        .level_for(env!("CARGO_PKG_NAME"), log::LevelFilter::Debug)
        .chain(io::stderr())
        .apply()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::to_action;
    use super::SubCommands;
    use crate::tracker::Action;

    fn words(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    /// サブコマンドと自由文の有無から操作が決まることを確認する。
    #[rstest]
    #[case::in_with_text(
        SubCommands::In { text: words(&["write", "spec"]) },
        Some(Action::New { message: "write spec".to_string() })
    )]
    #[case::in_without_text(SubCommands::In { text: vec![] }, Some(Action::Resume))]
    #[case::out_with_text(
        SubCommands::Out { text: words(&["new", "title"]) },
        Some(Action::EndWithUpdate { message: "new title".to_string() })
    )]
    #[case::out_without_text(SubCommands::Out { text: vec![] }, Some(Action::End))]
    #[case::info(SubCommands::Info, Some(Action::Info))]
    #[case::open(SubCommands::Open, None)]
    fn test_to_action(#[case] subcommand: SubCommands, #[case] expected: Option<Action>) {
        assert_eq!(to_action(subcommand), expected);
    }
}
