//! Presale Reserve - reservation countdowns and a shared unit shortlist
//!
//! This binary wires the application context the same way a page host
//! would, applies shortlist intents from the command line, prints the share
//! link, and follows any requested countdowns until they expire.

use std::{fs, sync::Arc};

use anyhow::Context;
use tracing::{info, warn};

use presale_reserve::{
    config::Config,
    services::{JsonFileStorage, KeyValuePersistence, ShortlistPersistence, StaticCatalog, UnitCatalog},
    state::{AppState, CountdownState, ShortlistStore},
    tasks::{CountdownHandle, CountdownTarget},
    utils::{parse_share_link, shutdown_signal, Diagnostics},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("presale_reserve={}", config.log_level()))
        .init();

    info!("Starting presale-reserve v{}", env!("CARGO_PKG_VERSION"));

    let thresholds = config.thresholds()?;
    let diagnostics = Diagnostics::new();

    let persistence = config.store_dir.as_ref().map(|dir| {
        info!("Persisting shortlist under {}", dir.display());
        Arc::new(KeyValuePersistence::new(JsonFileStorage::new(dir))) as Arc<dyn ShortlistPersistence>
    });

    let catalog = match &config.catalog {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog {}", path.display()))?;
            let catalog = StaticCatalog::from_json(&raw)
                .with_context(|| format!("failed to parse catalog {}", path.display()))?;
            info!("Loaded {} catalog units", catalog.len());
            Some(Arc::new(catalog) as Arc<dyn UnitCatalog>)
        }
        None => None,
    };

    let store = Arc::new(ShortlistStore::init(persistence, catalog, diagnostics.clone()));
    let state = AppState::new(store, diagnostics.clone())
        .with_server_offset_ms(config.server_offset_ms)
        .with_thresholds(thresholds)
        .with_share_base_url(config.base_url.clone());

    let _changes = state.shortlist.subscribe(|shortlist| {
        info!("Shortlist changed: {} units {:?}", shortlist.len(), shortlist.unit_ids);
    });

    apply_shortlist_intents(&state, &config);

    let shortlist = state.shortlist.get_shortlist();
    for item in &shortlist.items {
        println!("  {} - {}", item.id, item.name);
    }
    println!("Shortlist ({} units): {}", shortlist.len(), state.share_link());

    if config.has_countdowns() {
        run_countdowns(&state, &config).await;
    }

    if state.shortlist.is_degraded() {
        warn!("Shortlist storage was unavailable; changes were kept in memory only");
    }
    for report in diagnostics.reports() {
        warn!("{}: {}", report.kind, report.message);
    }

    info!("Done");
    Ok(())
}

/// Apply the shortlist changes requested on the command line, in a fixed order
fn apply_shortlist_intents(state: &AppState, config: &Config) {
    let shortlist = &state.shortlist;

    if config.clear {
        shortlist.clear();
    }
    if let Some(link) = &config.from_link {
        for id in parse_share_link(link) {
            shortlist.add_unit(&id);
        }
    }
    for id in &config.add {
        shortlist.add_unit(id);
    }
    for id in &config.remove {
        shortlist.remove_unit(id);
    }
    for id in &config.toggle {
        shortlist.toggle_unit(id);
    }
}

/// Follow the requested countdowns until they expire or a signal arrives
async fn run_countdowns(state: &AppState, config: &Config) {
    let offer = config
        .offer_until
        .as_deref()
        .map(|input| state.offer_countdown(CountdownTarget::parse(input)));
    let reservation = config.reserve_until.as_deref().map(|input| {
        state.reservation_countdown(
            CountdownTarget::parse(input),
            Some(Box::new(|| println!("Reservation expired, units released"))),
        )
    });

    let watchers = async {
        tokio::join!(
            follow_countdown("offer", offer.as_ref(), describe_offer),
            follow_countdown("reservation", reservation.as_ref(), describe_reservation),
        );
    };

    tokio::select! {
        _ = watchers => {
            info!("All countdowns finished");
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping countdowns");
        }
    }
}

async fn follow_countdown(
    label: &str,
    handle: Option<&CountdownHandle>,
    describe: fn(&CountdownState) -> String,
) {
    let Some(handle) = handle else {
        return;
    };

    let mut rx = handle.subscribe();
    let mut last_line = String::new();
    loop {
        let current = rx.borrow_and_update().clone();
        let line = describe(&current);
        if line != last_line {
            println!("{label}: {line}");
            last_line = line;
        }
        if current.is_expired || rx.changed().await.is_err() {
            break;
        }
    }
}

fn describe_offer(state: &CountdownState) -> String {
    if state.is_expired {
        return "offer ended".to_string();
    }
    format!("{}d {}h {}m left", state.days, state.hours, state.minutes)
}

fn describe_reservation(state: &CountdownState) -> String {
    if state.is_expired {
        return "expired".to_string();
    }
    let level = state.warning_level.map(|level| level.as_str()).unwrap_or("normal");
    let formatted = state.formatted.clone().unwrap_or_else(|| state.format_hms());
    format!("{formatted} [{level}]")
}
