use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    // Snapshot the store first, release before touching the caches
    let (chain, stored_blocks, last_interval) = {
        let store = state.store.lock().expect("mutex poisoned");
        let blocks = store.blocks();

        // last interval
        let last_interval_secs = match blocks {
            [.., older, newer] => Some((newer.timestamp - older.timestamp).max(0)),
            _ => None,
        };

        (store.chain_state(), store.len(), last_interval_secs)
    };

    HttpResponse::Ok().json(StatsResponse {
        height: chain.current_height,
        stored_blocks,
        last_adjustment_time: chain.last_adjustment_time,
        previous_retarget: chain.previous_retarget,
        target_block_time_secs: state.params.target_block_secs,
        epoch_length: state.params.epoch_length,
        last_interval_secs: last_interval,
        metrics_computed_at: state.metrics_cache.computed_at(),
        retarget_computed_at: state.retarget_cache.computed_at(),
        node_configured: state.node.is_configured(),
    })
}
