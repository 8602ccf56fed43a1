// Print query views from an existing store as JSON, the way a display process reads it.
//
// Usage: cargo run --example dump_dashboard -- [DB_PATH] [VIEW] [ARG]
//   DB_PATH  default: ./data/unifi_stats.db
//   VIEW     dashboard (default) | wan | top | client <MAC> | device <MAC>

use std::env;
use std::sync::Arc;

use unifi_stats::clock::SystemClock;
use unifi_stats::facade::{QueryFacade, RATE_WINDOW_LONG, TREND_BUCKETS, TREND_WINDOW};
use unifi_stats::store::StoreOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("./data/unifi_stats.db");
    let view = args.get(2).map(String::as_str).unwrap_or("dashboard");

    let facade = QueryFacade::open(path, &StoreOptions::default(), Arc::new(SystemClock)).await?;

    let json = match view {
        "dashboard" => serde_json::to_string_pretty(
            &facade.dashboard(TREND_WINDOW, TREND_BUCKETS).await?,
        )?,
        "wan" => serde_json::to_string_pretty(
            &facade.wan_detail(TREND_WINDOW, TREND_BUCKETS).await?,
        )?,
        "top" => serde_json::to_string_pretty(&facade.top_consumers(RATE_WINDOW_LONG, 10).await?)?,
        "client" | "device" => {
            let Some(mac) = args.get(3) else {
                anyhow::bail!("{view} needs a MAC argument");
            };
            if view == "client" {
                serde_json::to_string_pretty(
                    &facade.client_detail(mac, TREND_WINDOW, TREND_BUCKETS).await?,
                )?
            } else {
                serde_json::to_string_pretty(
                    &facade.device_detail(mac, TREND_WINDOW, TREND_BUCKETS).await?,
                )?
            }
        }
        other => anyhow::bail!("unknown view {other}"),
    };

    println!("{}", json);
    Ok(())
}
