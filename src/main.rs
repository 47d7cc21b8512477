//! loadshift-sim entry point: CLI wiring, scenario loading and exports.

use std::process;

use loadshift_sim::cli::{parse_args, print_usage};
use loadshift_sim::config::ScenarioConfig;
use loadshift_sim::io::export::{export_devices, export_json, export_timeline};
use loadshift_sim::reporting::print_report;
use loadshift_sim::runner::{RunMode, run_scenario};
use loadshift_sim::telemetry::init_tracing;
use tracing::info;

fn main() {
    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            print_usage();
            process::exit(2);
        }
    };

    init_tracing(cli.log_json);

    // --scenario takes priority, then --preset (demo by default)
    let loaded = match (&cli.scenario, &cli.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path),
        (None, Some(name)) => ScenarioConfig::from_preset(name),
        (None, None) => Ok(ScenarioConfig::demo()),
    };
    let mut scenario = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let mode = cli.device.clone().map_or(RunMode::Sweep, RunMode::Device);
    let result = match run_scenario(&scenario, &mode) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    print_report(&result);

    if let Some(path) = &cli.timeline_out {
        if let Err(e) = export_timeline(&result.timeline, path) {
            eprintln!("error: failed to write timeline CSV: {e}");
            process::exit(1);
        }
        info!(path = %path.display(), "timeline written");
    }

    if let Some(path) = &cli.devices_out {
        if let Err(e) = export_devices(&result.devices, path) {
            eprintln!("error: failed to write device CSV: {e}");
            process::exit(1);
        }
        info!(path = %path.display(), "device series written");
    }

    if let Some(path) = &cli.report_json {
        if let Err(e) = export_json(&result.report, path) {
            eprintln!("error: failed to write JSON report: {e}");
            process::exit(1);
        }
        info!(path = %path.display(), "report written");
    }
}
