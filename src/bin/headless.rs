//! Headless simulation driver
//!
//! Generates a world, activates base mode and advances a number of in-game
//! days, logging job, raid and mandate outcomes. Optionally writes the
//! final snapshot to a file.

use std::sync::{Arc, Mutex};

use clap::Parser;

use cinderhold::base::bootstrap::bootstrap_base;
use cinderhold::base::{JobCompleted, MandateResolved, OracleIncidentInjected, RaidResolved};
use cinderhold::core::clock::SimClock;
use cinderhold::core::config::SimConfig;
use cinderhold::core::events::EventBus;
use cinderhold::core::rng::RngRegistry;
use cinderhold::persistence::gateway::SnapshotGateway;
use cinderhold::sim::scheduler::TickScheduler;
use cinderhold::world::data::ApocalypseType;
use cinderhold::worldgen::{GenerationConfig, OverworldGenerator};

#[derive(Parser, Debug)]
#[command(name = "headless", about = "Run the base simulation without a UI")]
struct Args {
    /// World seed
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Map width in tiles
    #[arg(long, default_value_t = 16)]
    width: u32,

    /// Map height in tiles
    #[arg(long, default_value_t = 12)]
    height: u32,

    /// In-game days to simulate
    #[arg(long, default_value_t = 30)]
    days: u64,

    /// Write the final snapshot to this path
    #[arg(long)]
    snapshot: Option<std::path::PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = SimConfig::default();

    tracing::info!(seed = args.seed, days = args.days, "starting headless run");

    let rng = Arc::new(RngRegistry::new(args.seed));
    let bus = Arc::new(EventBus::new());
    let clock = SimClock::new(config.ticks_per_year, config.hours_per_day)?;

    let generator = OverworldGenerator::new(&rng);
    let mut world = generator.generate(&GenerationConfig {
        seed: args.seed,
        width: args.width,
        height: args.height,
        apocalypse: ApocalypseType::RadiantStorm,
    })?;

    let stats = Arc::new(Mutex::new((0u64, 0u64, 0u64, 0u64)));
    let jobs = Arc::clone(&stats);
    let _job_sub = bus.subscribe::<JobCompleted, _>(move |_| jobs.lock().unwrap().0 += 1);
    let raids = Arc::clone(&stats);
    let _raid_sub = bus.subscribe::<RaidResolved, _>(move |e| {
        tracing::info!(event = %e.event_id, attacker = %e.attacker_faction_id, "raid landed");
        raids.lock().unwrap().1 += 1;
    });
    let mandates = Arc::clone(&stats);
    let _mandate_sub = bus.subscribe::<MandateResolved, _>(move |e| {
        tracing::info!(mandate = %e.mandate.id, result = e.result.as_str(), "mandate resolved");
        mandates.lock().unwrap().2 += 1;
    });
    let incidents = Arc::clone(&stats);
    let _incident_sub = bus.subscribe::<OracleIncidentInjected, _>(move |e| {
        tracing::info!(card = %e.card_id, trigger = %e.trigger, "incident injected");
        incidents.lock().unwrap().3 += 1;
    });

    let mut scheduler = TickScheduler::new(clock, rng, bus);
    let _session = bootstrap_base(&mut world, &mut scheduler, &config)?;

    let ticks = args.days * config.hours_per_day;
    scheduler.advance(&mut world, ticks)?;

    let (job_count, raid_count, mandate_count, incident_count) = *stats.lock().unwrap();
    tracing::info!(
        ticks,
        jobs = job_count,
        raids = raid_count,
        mandates = mandate_count,
        incidents = incident_count,
        alert = ?world.base_state.alert_level,
        tension = world.oracle_state.tension_score,
        "run complete"
    );

    if let Some(path) = args.snapshot {
        SnapshotGateway::save_to_file(&mut world, &path)?;
        tracing::info!(path = %path.display(), "snapshot written");
    }

    Ok(())
}
