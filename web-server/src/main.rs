// web-server/src/main.rs
use std::sync::Arc;
use actix_web::{App, HttpServer};
use common::{setup_tracing, ConfigSource, ServerConfig};
use web_server::accounts::InMemoryAccounts;
use web_server::{api, AppContext};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Setup tracing
    if let Err(e) = setup_tracing(&config.log_level) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
    tracing::info!("Loaded configuration from {}", ConfigSource::from_env());

    let accounts = Arc::new(InMemoryAccounts::from_seeds(&config.accounts));

    // Missing secret, issuer, audience or policies halt the server here
    let ctx = match AppContext::new(&config, accounts) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let server_addr = config.web_server_addr.clone();
    tracing::info!("Starting Web Server on {}", server_addr);
    tracing::info!("Real-time channel at {}", ctx.realtime_path);

    HttpServer::new(move || {
        let ctx = ctx.clone();
        App::new()
            .wrap(ctx.jwt_auth())
            .configure(move |cfg| api::configure(cfg, &ctx))
    })
    .bind(&server_addr)?
    .run()
    .await
}
