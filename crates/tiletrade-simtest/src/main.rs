//! TileTrade Headless Simulation Harness
//!
//! Generates a town, runs the full tick pipeline and checks the economy's
//! invariants along the way. No rendering, no input.
//!
//! Usage:
//!   cargo run -p tiletrade-simtest
//!   cargo run -p tiletrade-simtest -- --verbose --ticks 3000
//!   cargo run -p tiletrade-simtest -- --config town.json --json

use std::collections::HashSet;

use tiletrade_core::generation::TownConfig;
use tiletrade_core::grid::StationKind;
use tiletrade_core::prelude::*;

const DEFAULT_TICKS: u32 = 1800;
const TICK_SECONDS: f32 = 0.1;

struct Args {
    verbose: bool,
    json: bool,
    ticks: u32,
    config: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        verbose: false,
        json: false,
        ticks: DEFAULT_TICKS,
        config: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--verbose" => args.verbose = true,
            "--json" => args.json = true,
            "--ticks" => {
                let value = iter.next().ok_or("--ticks needs a value")?;
                args.ticks = value
                    .parse()
                    .map_err(|_| format!("invalid tick count '{}'", value))?;
            }
            "--config" => args.config = Some(iter.next().ok_or("--config needs a path")?),
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(args)
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &args.config {
        Some(path) => match SimConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(2);
            }
        },
        None => SimConfig::default(),
    };

    println!("=== TileTrade Simulation Harness ===\n");

    let mut engine = SimulationEngine::new(config, Grid::new(0, 0, 32.0));
    engine.generate(TownConfig::default());

    let mut results = Vec::new();

    // 1. Generated town
    results.extend(validate_town(&engine));

    // 2. Run the pipeline, checking invariants as we go
    results.extend(run_and_validate(&mut engine, args.ticks, args.verbose));

    // 3. End state
    results.extend(validate_end_state(&engine, args.verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if args.json {
        match engine.snapshot().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("snapshot failed: {}", e),
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Town ─────────────────────────────────────────────────────────────

fn validate_town(engine: &SimulationEngine) -> Vec<TestResult> {
    println!("--- Town ---");
    let mut results = Vec::new();
    let grid = &engine.grid;

    for (kind, good) in [
        (StationKind::Dock, Good::Fish),
        (StationKind::Orchard, Good::Apple),
        (StationKind::Counter, Good::Fish),
        (StationKind::Counter, Good::Apple),
        (StationKind::Register, Good::Fish),
        (StationKind::Register, Good::Apple),
        (StationKind::Table, Good::Fish),
        (StationKind::Table, Good::Apple),
    ] {
        let found = grid.stations(Station::new(kind, good)).len();
        results.push(TestResult {
            name: format!("town_has_{}_{}", kind.name(), good),
            passed: found > 0,
            detail: format!("{} found", found),
        });
    }

    results.push(TestResult {
        name: "town_population".into(),
        passed: engine.agent_count() > 0,
        detail: format!("{} agents", engine.agent_count()),
    });

    results
}

// ── 2. Running ──────────────────────────────────────────────────────────

fn run_and_validate(engine: &mut SimulationEngine, ticks: u32, verbose: bool) -> Vec<TestResult> {
    println!("--- Running {} ticks ---", ticks);
    log::info!("simulating {:.0}s of town life", ticks as f32 * TICK_SECONDS);
    let mut results = Vec::new();

    let money_at_start = engine.total_money();
    let mut worst_drift = 0.0f64;
    let mut double_claims = 0usize;
    let mut fridge_rot = 0usize;

    for tick in 0..ticks {
        engine.update(TICK_SECONDS);

        worst_drift = worst_drift.max((engine.total_money() - money_at_start).abs());

        // One station per agent
        let mut owners = HashSet::new();
        for (_, tile) in engine.grid.iter() {
            if let Some(owner) = tile.claimed {
                if !owners.insert(owner) {
                    double_claims += 1;
                }
            }
        }

        fridge_rot += engine
            .grid
            .iter()
            .filter(|(_, t)| t.kind.station_kind() == Some(StationKind::Fridge))
            .filter(|(_, t)| t.inventory.get(Good::WastedFish) > 0 || t.inventory.get(Good::WastedApple) > 0)
            .count();

        if verbose && tick % 300 == 0 {
            println!(
                "  t={:>6.1}s reputation={:>6.1} roles={:?}",
                engine.sim_time(),
                engine.reputation(),
                engine.role_counts()
            );
        }
    }

    results.push(TestResult {
        name: "money_conserved".into(),
        passed: worst_drift < 1e-6,
        detail: format!("worst drift {:.9}", worst_drift),
    });
    results.push(TestResult {
        name: "claims_exclusive".into(),
        passed: double_claims == 0,
        detail: format!("{} agents holding two stations", double_claims),
    });
    results.push(TestResult {
        name: "fridges_never_rot".into(),
        passed: fridge_rot == 0,
        detail: format!("{} fridge-ticks with wasted stock", fridge_rot),
    });

    results
}

// ── 3. End state ────────────────────────────────────────────────────────

fn validate_end_state(engine: &SimulationEngine, verbose: bool) -> Vec<TestResult> {
    println!("--- End State ---");
    let mut results = Vec::new();
    let snapshot = engine.snapshot();

    let working = snapshot.agents.iter().filter(|a| a.role != "idle").count();
    results.push(TestResult {
        name: "agents_found_work".into(),
        passed: working > 0,
        detail: format!("{}/{} agents hold a role", working, snapshot.agents.len()),
    });

    let mispriced = snapshot
        .stations
        .iter()
        .filter(|s| s.claimed_by.is_some())
        .filter(|s| s.price.map(|p| p > engine.config.pricing.price_ceiling * engine.config.demand_markup).unwrap_or(false))
        .count();
    results.push(TestResult {
        name: "prices_under_ceiling".into(),
        passed: mispriced == 0,
        detail: format!("{} claimed stations above ceiling", mispriced),
    });

    let negative = snapshot.agents.iter().filter(|a| a.money < 0.0).count();
    results.push(TestResult {
        name: "balances_recorded".into(),
        passed: snapshot.agents.iter().all(|a| a.money.is_finite()),
        detail: format!("{} agents currently in debt", negative),
    });

    results.push(TestResult {
        name: "reputation_finite".into(),
        passed: snapshot.reputation.is_finite(),
        detail: format!("reputation {:.1}", snapshot.reputation),
    });

    if verbose {
        println!("  Roles:");
        for (label, count) in engine.role_counts() {
            println!("    {:10}: {}", label, count);
        }
        println!("  Stations:");
        for s in snapshot.stations.iter().filter(|s| !s.inventory.is_empty()) {
            let stock: Vec<String> = s
                .inventory
                .iter()
                .map(|(good, qty)| format!("{}={}", good, qty))
                .collect();
            println!("    {:8} ({:>2},{:>2}): {}", s.kind.name(), s.row, s.col, stock.join(" "));
        }
        for m in &snapshot.messages {
            println!("  [{:.1}s] {}", m.posted_at, m.text);
        }
    }

    results
}
