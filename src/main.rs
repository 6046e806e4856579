mod api;
mod blockchain;
mod config;
mod difficulty;
mod node;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;

use api::AppState;
use config::Config;
use difficulty::SystemClock;
use node::NodeClient;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env();
    let (host, port) = (config.host.clone(), config.port);

    println!("⛓️ Starting dual-PoW explorer API at http://{host}:{port}");
    if config.node.url.is_none() {
        info!("NODE_RPC_URL not set; hashrate and node difficulty will read as 0");
    }
    info!(
        "target block time {}s, epoch {} blocks, keeping {} recent blocks",
        config.params.target_block_secs, config.params.epoch_length, config.block_cache_size
    );

    let node = NodeClient::new(config.node.clone());
    let state = web::Data::new(AppState::new(&config, node, Arc::new(SystemClock)));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
