use std::{process, sync::Arc};

use brewbee::{
    config::{logger::LoggerConfig, ServiceConfig},
    core::{emitter::Emitter, task::TaskGuard},
    logger::LoggerManager,
    print_error,
};
use brewbee_mqtt::{MqttManager, Publisher};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(ServiceConfig::from_env().unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    }));

    let mut logger_manager =
        LoggerManager::new(LoggerConfig::for_service(config.debug)).unwrap_or_else(|e| {
            print_error!("Failed to setup Log Manager: {}", e);
            process::exit(1);
        });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });

    info!("Starting brewbee version {}...", env!("CARGO_PKG_VERSION"));
    debug!("{:#?}", config);
    info!(
        "Broker: {}://{}:{}, topic prefix '{}'",
        config.broker_protocol, config.broker_host, config.broker_port, config.topic_prefix
    );
    if config.simulation {
        info!("Simulation mode enabled (backend {})", config.backend_url);
    }

    let manager = MqttManager::from_config(config.broker_config()).unwrap_or_else(|e| {
        error!("Failed to create MQTT manager: {}", e);
        process::exit(1);
    });
    let handle = manager.build_and_start().await.unwrap_or_else(|e| {
        error!("Failed to start MQTT client: {}", e);
        process::exit(1);
    });
    info!("MQTT client started");

    let publisher = Arc::new(Publisher::new(Arc::new(handle.clone())));

    // Background publisher starts here; the guard cancels it on every exit
    // path of main and waits out the grace period on the Ctrl+C path.
    let emitter = Emitter::new(config.clone(), publisher);
    let telemetry = TaskGuard::spawn(move |cancel| emitter.run(cancel));

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C — initiating graceful shutdown...");

    telemetry.shutdown().await;
    if let Err(e) = handle.shutdown().await {
        error!("Error during MQTT shutdown: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}
