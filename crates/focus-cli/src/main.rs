//! # focus-cli
//!
//! Command-line client for the focus gateway: account management,
//! focus sessions, profile and leaderboard queries, and live focus
//! warning monitoring over the gateway's WebSocket protocol.

use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;

use focus_channel::{ChannelConfig, ChannelResult, FocusChannel};

/// Command-line client for the focus gateway.
#[derive(Parser)]
#[command(name = "focus-cli", version, about)]
struct Cli {
    /// Path to focus.toml config file
    #[arg(short, long)]
    config: Option<String>,

    /// Gateway WebSocket URL override
    #[arg(long)]
    url: Option<String>,

    /// Enable verbose logging (set RUST_LOG for fine-grained control)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account on the gateway
    Register {
        username: String,
        password: String,
    },
    /// Verify credentials against the gateway
    Login {
        username: String,
        password: String,
    },
    /// Show the account's profile
    Profile {
        username: String,
        password: String,
    },
    /// Show the leaderboard
    Leaderboard,
    /// Run a timed focus session, printing warnings as they arrive
    Session {
        username: String,
        password: String,
        /// Session length in seconds
        #[arg(long, default_value_t = 60)]
        seconds: u64,
    },
    /// Watch for focus warnings until interrupted
    Watch {
        username: String,
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("focus_channel=debug,focus_cli=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("focus_channel=warn")
            .init();
    }

    let mut config = match ChannelConfig::discover(cli.config.as_deref().map(Path::new)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", "Config error:".red(), e);
            return Ok(());
        }
    };
    if let Some(url) = &cli.url {
        config.gateway_url = url.clone();
    }

    let channel = FocusChannel::new(&config);

    let outcome = match &cli.command {
        Command::Register { username, password } => run_register(&channel, username, password).await,
        Command::Login { username, password } => run_login(&channel, username, password).await,
        Command::Profile { username, password } => run_profile(&channel, username, password).await,
        Command::Leaderboard => run_leaderboard(&channel).await,
        Command::Session {
            username,
            password,
            seconds,
        } => run_session(&channel, username, password, *seconds).await,
        Command::Watch { username, password } => run_watch(&channel, username, password).await,
    };

    channel.disconnect().await;

    if let Err(e) = outcome {
        eprintln!("{} {}", "Error:".red(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run_register(channel: &FocusChannel, username: &str, password: &str) -> ChannelResult<()> {
    channel.register(username, password).await?;
    println!("{} account '{}' created", "OK".green(), username.cyan());
    Ok(())
}

async fn run_login(channel: &FocusChannel, username: &str, password: &str) -> ChannelResult<()> {
    channel.login(username, password).await?;
    println!("{} logged in as '{}'", "OK".green(), username.cyan());
    Ok(())
}

async fn run_profile(channel: &FocusChannel, username: &str, password: &str) -> ChannelResult<()> {
    channel.login(username, password).await?;
    let profile = channel.get_profile().await?;

    println!("{}", "Profile".bright_blue());
    println!("  user:     {}", profile.username.cyan());
    println!("  coins:    {}", profile.coins);
    println!("  sessions: {}", profile.sessions);
    println!("  focused:  {}s", profile.seconds);
    Ok(())
}

async fn run_leaderboard(channel: &FocusChannel) -> ChannelResult<()> {
    let rows = channel.get_leaderboard().await?;

    println!("{}", "Leaderboard".bright_blue());
    if rows.is_empty() {
        println!("  (empty)");
    }
    for (rank, row) in rows.iter().enumerate() {
        println!(
            "  {:>2}. {:<16} {:>6} coins  {:>4} sessions",
            rank + 1,
            row.username.cyan(),
            row.coins,
            row.sessions
        );
    }
    Ok(())
}

async fn run_session(
    channel: &FocusChannel,
    username: &str,
    password: &str,
    seconds: u64,
) -> ChannelResult<()> {
    channel.login(username, password).await?;

    let _warnings = channel.on_warning(|data| {
        let message = data
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("focus dropped");
        println!("{} {}", "warn:".yellow(), message);
    });

    channel.start_session().await?;
    println!(
        "{} session started for {}s (Ctrl-C to end early)",
        "OK".green(),
        seconds
    );

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\n{} ending session early", "Note:".yellow());
        }
    }

    let result = channel.end_session().await?;
    println!(
        "{} focused for {}s, earned {} coins",
        "Done:".green(),
        result.seconds,
        result.coins
    );
    Ok(())
}

async fn run_watch(channel: &FocusChannel, username: &str, password: &str) -> ChannelResult<()> {
    channel.login(username, password).await?;

    let _warnings = channel.on_warning(|data| {
        println!("{} {}", "focus_warn".yellow(), data);
    });

    println!("{} watching for focus warnings (Ctrl-C to stop)", "OK".green());
    let _ = tokio::signal::ctrl_c().await;
    Ok(())
}
