mod auth;
mod command;
mod config;
mod connection;
mod console;
mod telemetry;
mod transport;

use anyhow::{Context, Result};
use auth::{AuthToken, LoginClient, LoginError, TokenStore};
use clap::Parser;
use command::CommandEncoder;
use config::ConsoleConfig;
use connection::{ActiveSession, SessionChannel, SessionEvent};
use console::{ConsoleCommand, ParseError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use telemetry::TelemetrySink;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use transport::TcpConnector;

use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type InputLines = Lines<BufReader<Stdin>>;

#[derive(Parser, Debug)]
#[command(name = "operator-console", about = "Drive the rover from a terminal")]
struct Cli {
    /// TOML config file
    #[arg(short, long, env = "ROVER_CONFIG")]
    config: Option<PathBuf>,

    /// Login name; prompted for when missing
    #[arg(short, long)]
    username: Option<String>,

    #[arg(long, env = "ROVER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Forget the stored token and exit
    #[arg(long)]
    logout: bool,
}

enum Exit {
    Quit,
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't interleave with console output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = ConsoleConfig::load(cli.config.as_deref())?;

    let token_path = match &config.token_path {
        Some(path) => path.clone(),
        None => TokenStore::default_path()?,
    };
    let store = TokenStore::new(token_path);

    if cli.logout {
        store.clear().await?;
        println!("Logged out");
        return Ok(());
    }

    info!("Operator console starting");
    info!("  API: {}", config.api_url);
    info!("  Events: {}", config.event_addr);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let token = match store.load_or_warn().await {
        Some(token) => {
            info!("Using stored token from {}", store.path().display());
            token
        }
        None => {
            let Some(token) = login(&config, &cli, &mut lines).await? else {
                return Ok(());
            };
            if let Err(e) = store.save(&token).await {
                warn!("Could not store token: {}", e);
            }
            token
        }
    };

    match run(&config, token, &mut lines).await? {
        Exit::Quit => {}
        Exit::Logout => {
            store.clear().await?;
            println!("Logged out");
        }
    }
    Ok(())
}

/// Prompt until the controller grants a token. `None` when stdin closes.
async fn login(
    config: &ConsoleConfig,
    cli: &Cli,
    lines: &mut InputLines,
) -> Result<Option<AuthToken>> {
    let client = LoginClient::new(config.api_url.clone(), config.login_timeout())?;
    let mut username = cli.username.clone();
    let mut password = cli.password.clone();

    loop {
        let user = match username.take() {
            Some(user) => user,
            None => match prompt("Username: ", lines).await? {
                Some(user) => user,
                None => return Ok(None),
            },
        };
        let pass = match password.take() {
            Some(pass) => pass,
            None => match prompt("Password: ", lines).await? {
                Some(pass) => pass,
                None => return Ok(None),
            },
        };

        match client.login(&user, &pass).await {
            Ok(token) => {
                info!("Logged in as {}", user);
                return Ok(Some(token));
            }
            Err(LoginError::InvalidCredentials) => println!("Invalid credentials"),
            Err(e) => println!("Login failed: {}", e),
        }
    }
}

async fn prompt(label: &str, lines: &mut InputLines) -> Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush().context("stdout")?;
    Ok(lines
        .next_line()
        .await?
        .map(|line| line.trim().to_string()))
}

async fn run(config: &ConsoleConfig, token: AuthToken, lines: &mut InputLines) -> Result<Exit> {
    let sink = TelemetrySink::with_capacity(config.log_capacity);
    let encoder = CommandEncoder::new(config.key_release);
    let connector = Arc::new(TcpConnector::new(config.event_addr.clone()));
    let new_session =
        || SessionChannel::new(connector.clone(), token.clone(), config.session_config());

    let mut active = ActiveSession::new();
    active.replace(new_session()).await;
    println!("Type 'help' for commands");

    let exit = loop {
        tokio::select! {
            Some(event) = active.recv() => {
                report(&event);
                sink.apply(event).await;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break Exit::Quit;
                };
                let commands = match console::parse_line(&line) {
                    Ok(commands) => commands,
                    Err(ParseError::Empty) => continue,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };

                let mut exit = None;
                for command in commands {
                    match command {
                        ConsoleCommand::Input(event) => {
                            encoder.dispatch(&event, &active).await;
                        }
                        ConsoleCommand::Status => {
                            if let Some(session) = active.current() {
                                println!(
                                    "Session: {} ({}, last frame at {})",
                                    session.state().await,
                                    session.address(),
                                    session.last_seen_ms().await
                                );
                            }
                            println!("{}", console::render_status(&sink.snapshot().await));
                        }
                        ConsoleCommand::Logs => {
                            println!("{}", console::render_logs(&sink.logs().await));
                        }
                        ConsoleCommand::Video => println!("{}", config.video_feed_url()),
                        ConsoleCommand::Reconnect => active.replace(new_session()).await,
                        ConsoleCommand::Help => println!("{}", console::HELP),
                        ConsoleCommand::Logout => exit = Some(Exit::Logout),
                        ConsoleCommand::Quit => exit = Some(Exit::Quit),
                    }
                }
                if let Some(exit) = exit {
                    break exit;
                }
            }
        }
    };

    active.end().await;
    Ok(exit)
}

fn report(event: &SessionEvent) {
    match event {
        SessionEvent::Connected => println!("Connected"),
        SessionEvent::Log(message) => println!("> {}", message),
        SessionEvent::Closed { reason } => {
            println!("Session closed: {} (type 'reconnect' to retry)", reason)
        }
        SessionEvent::Telemetry(_) => {}
    }
}
