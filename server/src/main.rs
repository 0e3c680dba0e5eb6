mod automation;
mod command;
mod config;
mod hardware;
mod http;
mod session;
mod state;

use automation::{Automation, SprayWindow};
use clap::Parser;
use command::CommandDispatcher;
use config::ControllerConfig;
use hardware::{DetectionFilter, MockMotors, MockUltrasonic, MotorDriver, NullDetector, Sprinkler};
use session::{EventContext, SessionManager};
use state::RoverState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "rover-controller", about = "Rover-side telemetry and command service")]
struct Cli {
    /// TOML config file
    #[arg(short, long, env = "ROVER_CONTROLLER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = Arc::new(ControllerConfig::load(cli.config.as_deref())?);

    let sessions = Arc::new(SessionManager::with_send_timeout(config.send_timeout()));
    let state = Arc::new(RoverState::new());
    let motors: Arc<dyn MotorDriver> = Arc::new(MockMotors::new());
    let sprinkler = Arc::new(Sprinkler::new(
        config.spray_duration(),
        config.spray_cooldown(),
    ));

    let dispatcher = Arc::new(CommandDispatcher::new(
        motors.clone(),
        state.clone(),
        sessions.clone(),
        config.obstacle_stop_cm,
    ));

    let automation = Arc::new(Automation::new(
        Arc::new(MockUltrasonic::new()),
        Arc::new(NullDetector),
        DetectionFilter {
            confidence_threshold: config.confidence_threshold,
            target_classes: config.target_classes.clone(),
        },
        sprinkler,
        SprayWindow {
            min_cm: config.min_spray_cm,
            max_cm: config.max_spray_cm,
        },
        state,
        sessions.clone(),
    ));
    tokio::spawn(automation.run(config.telemetry_interval()));
    info!("Automation loop started ({:?})", config.telemetry_interval());

    let http_listener = TcpListener::bind(&config.http_addr).await?;
    info!("HTTP listening on {}", config.http_addr);
    let app = http::router(config.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            error!("HTTP server failed: {}", e);
        }
    });

    let event_listener = TcpListener::bind(&config.event_addr).await?;
    info!("Event channel listening on {}", config.event_addr);
    let ctx = Arc::new(EventContext {
        config: config.clone(),
        sessions,
        dispatcher,
    });

    tokio::select! {
        result = session::run_listener(event_listener, ctx) => {
            if let Err(e) = &result {
                error!("Event listener failed: {}", e);
            }
            motors.release();
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            motors.release();
            Ok(())
        }
    }
}
