//! Tail one city feed and print typed updates as they arrive.
//!
//! ```text
//! CITYFEED_GRPC_HOST=http://localhost:8080 \
//!     cargo run --example tail_feed -- culture Indiranagar "HSR Layout"
//! ```
//!
//! Feeds: `summary`, `traffic`, `energy`, `culture`. Remaining arguments are
//! area filters. Set `RUST_LOG=cityfeed_client=debug` for session logs.

use std::time::Duration;

use cityfeed_client::{FeedClient, FeedKind, FeedParams, FeedSpec, FeedUpdate};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

const CENTRE: (f64, f64) = (12.97, 77.64);

fn parse_kind(name: &str) -> Option<FeedKind> {
    match name {
        "summary" => Some(FeedKind::Summary),
        "traffic" => Some(FeedKind::Traffic),
        "energy" => Some(FeedKind::Energy),
        "culture" => Some(FeedKind::Culture),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let mut args = std::env::args().skip(1);
    let kind = args
        .next()
        .as_deref()
        .and_then(parse_kind)
        .ok_or("usage: tail_feed <summary|traffic|energy|culture> [area...]")?;
    let params = FeedParams::at(CENTRE.0, CENTRE.1).areas(args);

    let client = FeedClient::from_env()?;
    tracing::info!("Tailing {} feed from {}", kind, client.config().base_url);

    let mut updates = client.updates(FeedSpec::for_kind(kind), &params)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                updates.cancel();
                tracing::info!("Interrupted");
                break;
            }
            next = tokio::time::timeout(Duration::from_secs(300), updates.next()) => match next {
                Err(_) => {
                    tracing::warn!("No update for 5 minutes, giving up");
                    updates.cancel();
                    break;
                }
                Ok(None) => {
                    tracing::info!("Stream closed by server");
                    break;
                }
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(update))) => print_update(&update),
            },
        }
    }

    Ok(())
}

fn print_update(update: &FeedUpdate) {
    match update {
        FeedUpdate::Summary(text) => println!("[summary] {}", text),
        FeedUpdate::TrafficDigest(entries) => {
            for e in entries {
                println!("[traffic] {} - {} ({})", e.location, e.summary, e.delay);
            }
        }
        FeedUpdate::Weather(entries) => {
            for w in entries {
                println!("[weather] {}: {} {}", w.location, w.temperature, w.conditions);
            }
        }
        FeedUpdate::Outages(entries) => {
            for o in entries {
                println!("[outage] {} [{}] {}", o.locations.join(", "), o.severity, o.summary);
            }
        }
        FeedUpdate::CulturalEvents(entries) => {
            for c in entries {
                println!("[culture] {} {} @ {} - {}", c.event_date, c.event_time, c.venue, c.title);
            }
        }
    }
}
