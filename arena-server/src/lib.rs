use std::sync::Arc;

use warp::Filter;

use arena_core::RoundEngine;

use crate::websocket::ConnectionManager;

pub mod config;
pub mod websocket;

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    engine: Arc<RoundEngine>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let engine_filter = warp::any().map({
        let engine = engine.clone();
        move || engine.clone()
    });

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter.clone())
        .and(engine_filter.clone())
        .map(|ws: warp::ws::Ws, conn_mgr, engine| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, conn_mgr, engine))
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET"]);

    websocket
        .or(health)
        .with(cors)
        .with(warp::log("digit_arena"))
}
