use ducksoup_protocol::{ByteCounters, EmbedMessage};
use js_sys::{Array, Function, Reflect};
use log::{debug, error};
use serde::Deserialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::constants::STATS_INTERVAL_MS;
use crate::error::js_error;
use crate::player::{post_message, DuckSoup};
use crate::utils::window;

/// Interval polling `getStats` while the player runs in debug mode.
#[derive(Debug)]
pub(crate) struct StatsPolling {
    interval_id: i32,
    _on_tick: Closure<dyn FnMut()>,
}

impl StatsPolling {
    pub fn start(player: DuckSoup) -> crate::Result<Self> {
        let on_tick: Box<dyn FnMut()> = Box::new(move || {
            let player = player.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = update_stats(&player).await {
                    error!("failed to update stats: {:#}", err);
                }
            });
        });
        let on_tick = Closure::wrap(on_tick);
        let interval_id = window()?
            .set_interval_with_callback_and_timeout_and_arguments_0(
                on_tick.as_ref().unchecked_ref(),
                STATS_INTERVAL_MS,
            )
            .map_err(|err| js_error("failed to schedule stats polling", &err))?;
        debug!("polling stats every {}ms", STATS_INTERVAL_MS);

        Ok(Self {
            interval_id,
            _on_tick: on_tick,
        })
    }

    pub fn clear(self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.interval_id);
        }
    }
}

/// Fields of `RTCStatsReport` entries the bitrates are computed from.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RtpStreamStats {
    #[serde(rename = "type")]
    report_type: String,
    kind: Option<String>,
    bytes_sent: Option<u64>,
    bytes_received: Option<u64>,
}

/// `RTCStatsReport` is map-like, walk its values.
fn collect_counters(report: &JsValue) -> crate::Result<ByteCounters> {
    let values = Reflect::get(report, &JsValue::from_str("values"))
        .and_then(|values| values.dyn_into::<Function>())
        .and_then(|values| values.call0(report))
        .map_err(|err| js_error("failed to read stats report", &err))?;

    let mut counters = ByteCounters::default();
    for entry in Array::from(&values).iter() {
        let Ok(stats) = serde_wasm_bindgen::from_value::<RtpStreamStats>(entry) else {
            continue;
        };
        counters.record(
            &stats.report_type,
            stats.kind.as_deref(),
            stats.bytes_sent,
            stats.bytes_received,
        );
    }
    Ok(counters)
}

async fn update_stats(player: &DuckSoup) -> crate::Result<()> {
    let peer_connection = player.inner.borrow().peer_connection.clone();
    let Some(peer_connection) = peer_connection else {
        return Ok(());
    };
    let report = JsFuture::from(peer_connection.get_stats())
        .await
        .map_err(|err| js_error("failed to get stats", &err))?;
    let counters = collect_counters(&report)?;

    let payload = {
        let mut inner = player.inner.borrow_mut();
        let Some(tracker) = inner.stats_tracker.as_mut() else {
            return Ok(());
        };
        tracker.update(js_sys::Date::now(), counters)
    };
    post_message(player, &EmbedMessage::stats(&payload), false);
    Ok(())
}
