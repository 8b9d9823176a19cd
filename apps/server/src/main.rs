mod auth;
mod config;
mod handlers;
mod kernel;
mod middleware;
mod response;
mod routes;
mod state;

use config::Config;
use openpenpal_observability::init_tracing;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing("openpenpal-server");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime.block_on(async {
        let config = Config::from_env();
        let port = config.port;

        let state = match kernel::build_app_state(config).await {
            Ok(state) => state,
            Err(err) => {
                error!(%err, "failed to build application state");
                std::process::exit(1);
            }
        };

        let router = routes::build_router(state);
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        info!(port, "openpenpal-server listening");
        axum::serve(listener, router).await?;

        Ok(())
    })
}
