use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::info;

use arena_core::RoundEngine;
use arena_persistence::{RoomRepository, connection::connect_and_migrate};
use arena_server::{config::Config, create_routes, websocket::ConnectionManager};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    info!("Starting Digit Arena server...");

    let config = Config::new();
    let connection_manager = Arc::new(ConnectionManager::new());

    // Initialize database connection and run migrations
    let db = match connect_and_migrate().await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };
    let room_repository = Arc::new(RoomRepository::new(db));

    let engine = RoundEngine::new(
        room_repository,
        connection_manager.clone(),
        config.engine_settings(),
    );

    let routes = create_routes(connection_manager.clone(), engine.clone());

    // Reap idle connections and pull their players out of rooms
    let cleanup_connection_manager = connection_manager.clone();
    let cleanup_engine = engine.clone();
    let connection_timeout = Duration::from_secs(config.connection_timeout_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let reaped = cleanup_connection_manager
                .cleanup_inactive_connections(connection_timeout)
                .await;
            for (connection_id, room_code) in reaped {
                if let Some(code) = room_code {
                    if let Err(e) = cleanup_engine
                        .leave_room(&code, connection_id.as_uuid())
                        .await
                    {
                        tracing::error!(
                            "Failed to remove reaped connection {} from room {}: {}",
                            connection_id,
                            code,
                            e
                        );
                    }
                }
            }
        }
    });

    info!("Server starting on {}:{}", config.host, config.port);

    let addr = (
        config.host.parse::<std::net::IpAddr>().unwrap(),
        config.port,
    );

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).unwrap();
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}
