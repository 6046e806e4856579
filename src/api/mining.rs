use actix_web::{HttpRequest, Responder, get, web};
use log::debug;
use std::time::Duration;

use super::http::cached_json;
use super::models::{AppState, AuxPowStats, DualPowStatsResponse, PowStats};
use crate::blockchain::{project_halving, retarget_percent};
use crate::difficulty::{AlgorithmTag, auxpow_active, metrics_snapshot, retarget_snapshot};

/// Client cache lifetime of the raw node readings.
const DUAL_POW_STATS_TTL: Duration = Duration::from_secs(60);

/// Client cache lifetime of the halving countdown.
const HALVING_TTL: Duration = Duration::from_secs(300);

/// Per-algorithm difficulty, change, pace and slope over recent blocks.
#[get("/mining/dual-difficulty-metrics/")]
pub async fn get_dual_difficulty_metrics(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> impl Responder {
    let snapshot = match state.metrics_cache.fresh() {
        Some(s) => s,
        None => {
            // fetch before taking any lock; the node may be slow
            let hashrate = state.node.network_hash_ps_or_none(AlgorithmTag::Scrypt).await;
            let now = state.clock.now_secs();
            state.metrics_cache.get_with(|| {
                let store = state.store.lock().expect("mutex poisoned");
                metrics_snapshot(store.blocks(), hashrate, &state.params, now)
            })
        }
    };
    cached_json(
        &req,
        &*snapshot,
        state.metrics_cache.ttl(),
        state.clock.now_millis(),
    )
}

/// Per-algorithm projection of the running difficulty epoch.
#[get("/mining/dual-difficulty-adjustment/")]
pub async fn get_dual_difficulty_adjustment(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> impl Responder {
    let snapshot = match state.retarget_cache.fresh() {
        Some(s) => s,
        None => {
            backfill_epoch_start(&state).await;
            let hashrate = state.node.network_hash_ps_or_none(AlgorithmTag::Scrypt).await;
            let now = state.clock.now_secs();
            state.retarget_cache.get_with(|| {
                let store = state.store.lock().expect("mutex poisoned");
                retarget_snapshot(
                    store.blocks(),
                    &store.chain_state(),
                    hashrate,
                    &state.params,
                    now,
                )
            })
        }
    };
    cached_json(
        &req,
        &*snapshot,
        state.retarget_cache.ttl(),
        state.clock.now_millis(),
    )
}

/// Read the opening block of the running epoch from the node when the
/// store never saw it. Without it the projection stays zeroed.
async fn backfill_epoch_start(state: &AppState) {
    let missing = {
        let store = state.store.lock().expect("mutex poisoned");
        store.missing_epoch_start(&state.params)
    };
    let Some(height) = missing else {
        return;
    };

    let header = match state.node.header_at(height).await {
        Ok(h) if h.height == height => h,
        Ok(h) => {
            debug!("NODE - asked for block {}, got {}", height, h.height);
            return;
        }
        Err(e) => {
            debug!("NODE - epoch start {} unavailable: {}", height, e);
            return;
        }
    };
    let previous_retarget = match height.checked_sub(1) {
        Some(prev_height) => match state.node.header_at(prev_height).await {
            Ok(prev) if prev.version == header.version => {
                retarget_percent(prev.difficulty, header.difficulty)
            }
            _ => 0.0,
        },
        None => 0.0,
    };

    let mut store = state.store.lock().expect("mutex poisoned");
    store.anchor_epoch(height, header.time, previous_retarget, &state.params);
}

/// Raw difficulty and hashrate readings from the node.
#[get("/mining/dual-pow-stats/")]
pub async fn get_dual_pow_stats(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    let mut readings = [(0.0, 0.0); 2];
    for (slot, tag) in readings.iter_mut().zip(AlgorithmTag::ALL) {
        let difficulty = state.node.difficulty(tag).await;
        let hashrate = state.node.network_hash_ps(tag).await;
        if let Err(e) = difficulty.as_ref().and(hashrate.as_ref()) {
            debug!(
                "NODE - {} readings unavailable, using zeroed values: {}",
                tag.name(),
                e
            );
        }
        *slot = (difficulty.unwrap_or(0.0), hashrate.unwrap_or(0.0));
    }
    let [(meowpow_difficulty, meowpow_hashrate), (scrypt_difficulty, scrypt_hashrate)] = readings;

    let resp = DualPowStatsResponse {
        meowpow: PowStats {
            difficulty: meowpow_difficulty,
            hashrate: meowpow_hashrate,
            algorithm: AlgorithmTag::MeowPow.name(),
        },
        scrypt: AuxPowStats {
            difficulty: scrypt_difficulty,
            hashrate: scrypt_hashrate,
            algorithm: AlgorithmTag::Scrypt.name(),
            auxpow_active: auxpow_active(AlgorithmTag::Scrypt, Some(scrypt_hashrate)),
        },
    };
    cached_json(&req, &resp, DUAL_POW_STATS_TTL, state.clock.now_millis())
}

/// Countdown to the next subsidy halving at target pace.
#[get("/mining/halving/")]
pub async fn get_halving(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    let height = {
        let store = state.store.lock().expect("mutex poisoned");
        store.latest().map_or(0, |b| b.height)
    };
    let now = state.clock.now_millis();
    cached_json(
        &req,
        &project_halving(height, now, &state.params),
        HALVING_TTL,
        now,
    )
}
