use std::env;
use std::path::PathBuf;

pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub device: Option<String>,
    pub timeline_out: Option<PathBuf>,
    pub devices_out: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
    pub seed: Option<u64>,
    pub log_json: bool,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    if args.len() == 1 && (args[0] == "--help" || args[0] == "-h") {
        print_usage();
        std::process::exit(0);
    }
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut scenario = None;
    let mut preset = None;
    let mut device = None;
    let mut timeline_out = None;
    let mut devices_out = None;
    let mut report_json = None;
    let mut seed = None;
    let mut log_json = false;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a TOML file path)",
                )?;
                if scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--device" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --device (expected a device name)")?;
                if device.replace(name.to_string()).is_some() {
                    return Err("--device provided more than once".to_string());
                }
            }
            "--timeline-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --timeline-out (expected a file path)",
                )?;
                if timeline_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--timeline-out provided more than once".to_string());
                }
            }
            "--devices-out" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --devices-out (expected a file path)")?;
                if devices_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--devices-out provided more than once".to_string());
                }
            }
            "--report-json" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --report-json (expected a file path)")?;
                if report_json.replace(PathBuf::from(path)).is_some() {
                    return Err("--report-json provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let value = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                if seed.replace(value).is_some() {
                    return Err("--seed provided more than once".to_string());
                }
            }
            "--log-json" => log_json = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if scenario.is_some() && preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if scenario.is_none() && preset.is_none() {
        preset = Some("demo".to_string());
    }

    Ok(CliOptions {
        scenario,
        preset,
        device,
        timeline_out,
        devices_out,
        report_json,
        seed,
        log_json,
    })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("loadshift-sim: PV curtailment load-shifting simulator");
    eprintln!();
    eprintln!("Usage: loadshift-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (demo, blackout)");
    eprintln!("  --device <name>          Manipulate a single device instead of all");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --timeline-out <path>    Export the curtailment timeline to CSV");
    eprintln!("  --devices-out <path>     Export per-device series to CSV");
    eprintln!("  --report-json <path>     Write the run report as JSON");
    eprintln!("  --log-json               Log JSON lines to stderr");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the demo preset is used.");
}
