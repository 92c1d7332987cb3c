use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{error, info, warn};

use platoon_planner::config::PlannerConfig;
use platoon_planner::display::{print_plan, print_readiness, write_plan_to_file};
use platoon_planner::error::PlannerError;
use platoon_planner::export::{export_donor_grid, export_readiness_grid};
use platoon_planner::notify::{deliver, plan_notice, readiness_notice};
use platoon_planner::planner::{plan_phase, readiness, PhaseInputs};
use platoon_planner::platoon::demand::PlanMode;
use platoon_planner::roster::reconcile::track_changes;
use platoon_planner::roster::types::Snapshot;
use platoon_planner::web;

const ROSTER_CACHE: &str = "roster_cache.json";
const OUTBOX: &str = "outbox.jsonl";

fn usage() {
    println!("Usage:");
    println!("  platoon-planner assign <dir>     compute donors for the grid as it stands");
    println!("  platoon-planner reset <dir>      reload the default slice, then compute donors");
    println!("  platoon-planner readiness <dir>  count ready units per member");
    println!("  platoon-planner web [port]       serve the JSON API");
}

/// Logs who joined or left since the previous run
fn track_roster(dir: &Path, snapshot: &Snapshot) -> Result<(), PlannerError> {
    let changes = track_changes(&dir.join(ROSTER_CACHE), snapshot)?;
    for id in &changes.added {
        info!("Joined: {}", changes.display_names.get(id).unwrap_or(id));
    }
    for id in &changes.removed {
        info!("Left: {}", id);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(mode) = args.get(1).map(String::as_str) else {
        usage();
        return Ok(());
    };

    if mode == "web" {
        let port = args.get(2)
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);
        let config_path = std::env::var("PLANNER_CONFIG").unwrap_or_else(|_| "config.json".to_string());
        let config = PlannerConfig::load(&config_path)?;

        println!("Starting web server on port {}...", port);
        println!("API at http://localhost:{}/api/plan", port);
        web::start_server(port, config).await?;
        return Ok(());
    }

    let plan_mode = match mode {
        "assign" => Some(PlanMode::Recommend),
        "reset" => Some(PlanMode::Reset),
        "readiness" => None,
        _ => {
            usage();
            return Ok(());
        }
    };
    let dir = PathBuf::from(args.get(2).map(String::as_str).unwrap_or("data"));
    let config = PlannerConfig::load(dir.join("config.json"))?;

    let inputs = match PhaseInputs::load_dir(&dir) {
        Ok(inputs) => inputs,
        Err(err @ PlannerError::DataUnavailable(_)) => {
            eprintln!("Cannot run: {}. Nothing was changed.", err);
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };
    println!(
        "Loaded {} members and {} units",
        inputs.snapshot.members.len(),
        inputs.snapshot.catalog.len()
    );
    if let Err(err) = track_roster(&dir, &inputs.snapshot) {
        warn!("Roster change tracking skipped: {}", err);
    }
    let names = platoon_planner::roster::display_names(&inputs.snapshot.members);
    let outbox = dir.join(OUTBOX);

    if let Some(plan_mode) = plan_mode {
        match plan_phase(&inputs, &config, plan_mode, Utc::now()) {
            Ok(plan) => {
                print_plan(&plan, &names);
                write_plan_to_file(&plan, &names, dir.join("plan.txt"))?;
                export_donor_grid(&plan.result, &names, dir.join("donors.csv"))?;
                println!("Plan saved to:");
                println!("  - {}", dir.join("plan.txt").display());
                println!("  - {}", dir.join("donors.csv").display());
                deliver(config.webhook_url.as_deref(), &outbox, &plan_notice(&plan))?;
            }
            Err(err @ PlannerError::ConfigurationMissing(_)) => {
                error!("Skipping donor assignment: {}", err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    if plan_mode.is_none() || config.readiness_enabled {
        if inputs.requirements.is_empty() {
            warn!("No readiness requirements found, skipping readiness");
        } else {
            let guild = readiness(&inputs);
            print_readiness(&guild, &names);
            export_readiness_grid(&guild, &names, dir.join("readiness.csv"))?;
            println!("Readiness saved to {}", dir.join("readiness.csv").display());
            deliver(config.webhook_url.as_deref(), &outbox, &readiness_notice(&guild))?;
        }
    }

    Ok(())
}
