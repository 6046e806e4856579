mod blocks;
mod health;
pub mod http;
mod mining;
pub mod models;
mod stats;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(mining::get_dual_difficulty_metrics)
            .service(mining::get_dual_difficulty_adjustment)
            .service(mining::get_dual_pow_stats)
            .service(mining::get_halving)
            .service(blocks::get_blocks)
            .service(blocks::post_block)
            .service(stats::get_stats),
    );
}
