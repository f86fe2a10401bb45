mod config;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the environment may be set directly.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env();
    let addr = config.listen_addr();
    tracing::info!(
        max_operations = config.log_limits.max_operations,
        max_strokes = config.log_limits.max_strokes,
        client_queue_capacity = config.client_queue_capacity,
        "configuration loaded"
    );

    let state = state::AppState::new(config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");

    tracing::info!(%addr, "sketchroom listening");
    axum::serve(listener, app).await.expect("server failed");
}
