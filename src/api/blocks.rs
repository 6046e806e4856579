use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{AppState, BlocksResponse, IngestResponse};
use crate::blockchain::Block;
use crate::difficulty::AlgorithmTag;

/// Recent block window, most recent last.
#[get("/blocks/")]
pub async fn get_blocks(state: web::Data<AppState>) -> impl Responder {
    let store = state.store.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(BlocksResponse {
        height: store.chain_state().current_height,
        blocks: store.blocks(),
    })
}

/// Feed a new block from the node. Invalidates the difficulty caches.
#[post("/blocks/")]
pub async fn post_block(state: web::Data<AppState>, body: web::Json<Block>) -> impl Responder {
    let block = body.into_inner();
    let (height, version) = (block.height, block.version);

    let ingested = {
        let mut store = state.store.lock().expect("mutex poisoned");
        store.ingest(block, &state.params)
    };

    match ingested {
        Ok(res) => {
            state.invalidate_caches();
            info!(
                "BLOCKS - accepted #{} ({})",
                height,
                AlgorithmTag::from_version(version).map_or("unknown algorithm", |t| t.name())
            );
            HttpResponse::Ok().json(IngestResponse {
                height: res.height,
                reorged: res.reorged,
                epoch_boundary: res.epoch_boundary,
            })
        }
        Err(msg) => {
            warn!("POST /blocks/ - rejected #{}: {}", height, msg);
            HttpResponse::BadRequest().body(msg)
        }
    }
}
