use eyre::Result;
use object_grabber_lib::{init_tracing, ClientConfig, SequenceReport, Sequencer};
use tokio::sync::watch;
use tracing::{error, info, warn};
use zenoh::{Config, Session};

mod zenoh_transport;
use zenoh_transport::ZenohTransport;

fn load_client_config() -> Result<ClientConfig> {
    let config_path = std::env::var("GRABBER_CONFIG")
        .unwrap_or_else(|_| "config/object_grabber.toml".to_string());

    let mut config = if std::path::Path::new(&config_path).exists() {
        info!("Loading client config from: {}", config_path);
        ClientConfig::load_from_file(&config_path)
            .map_err(|e| eyre::eyre!("Failed to load client config from {}: {}", config_path, e))?
    } else {
        warn!("Config file not found at {}, using defaults", config_path);
        ClientConfig::default()
    };

    config
        .apply_env()
        .map_err(|e| eyre::eyre!("Invalid environment override: {}", e))?;
    config.validate().map_err(|e| eyre::eyre!("Invalid client config: {}", e))?;
    Ok(config)
}

async fn open_zenoh_session() -> Result<Session> {
    let config_path = std::env::var("ZENOH_CONFIG")
        .unwrap_or_else(|_| "config/zenoh_config.json5".to_string());
    info!("Loading Zenoh config from: {}", config_path);

    let config = if std::path::Path::new(&config_path).exists() {
        Config::from_file(&config_path)
            .map_err(|e| eyre::eyre!("Failed to load Zenoh config from {}: {}", config_path, e))?
    } else {
        warn!("Config file not found at {}", config_path);
        warn!("Using default config with peer mode");
        let mut config = Config::default();
        config
            .insert_json5("mode", "\"peer\"")
            .map_err(|e| eyre::eyre!("Failed to set Zenoh mode: {}", e))?;
        config
    };

    let session = zenoh::open(config)
        .await
        .map_err(|e| eyre::eyre!("Failed to open Zenoh session: {}", e))?;
    info!("Zenoh session ID: {}", session.zid());
    Ok(session)
}

fn log_report(report: &SequenceReport) {
    for step in &report.steps {
        info!(
            "  {:<8} {} -> {} in {:.2}s",
            step.label,
            step.action,
            step.outcome,
            step.elapsed.as_secs_f64()
        );
    }
    if !report.all_succeeded() {
        warn!(
            "{} step(s) did not succeed",
            report.failed_steps().count()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().map_err(|e| eyre::eyre!("Failed to initialize tracing: {}", e))?;

    info!("Starting object grabber client");

    let config = load_client_config()?;
    info!(
        "Service: {}/{} | object {} | policy {:?} | goal timeout {:?}",
        config.service.key_prefix,
        config.service.name,
        config.task.object_id,
        config.execution.failure_policy,
        config.execution.goal_timeout()
    );

    let session = open_zenoh_session().await?;
    let transport = ZenohTransport::connect(session, &config.service)
        .await
        .map_err(|e| eyre::eyre!("Failed to set up goal transport: {}", e))?;
    info!("Service liveliness key: {}", transport.keys().alive);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    // Pick-up would come from perception and drop-off from the task layer;
    // until then both come from config.
    let (pickup, dropoff) = config.task.poses();

    let mut sequencer = Sequencer::new(transport, &config);
    match sequencer.run(&pickup, &dropoff, &mut shutdown_rx).await {
        Ok(report) => {
            log_report(&report);
            info!("Object grabber client done");
            Ok(())
        }
        Err(e) => {
            error!("Sequence stopped: {}", e);
            Err(eyre::eyre!("Object grabber sequence failed: {}", e))
        }
    }
}
