// CLI entry point for the delver settlement planner.
//
// Builds a synthetic terrain, runs one plan generation from the map centre,
// then runs the requested number of expansion rounds, and prints a JSON
// summary (direction, levels, op counts, the persisted room graph) to
// stdout. Logs go to stderr through `logging.rs`; `terrain.rs` builds the
// map.
//
// Usage:
//   delver [OPTIONS]
//     --seed <N>             RNG seed (default: 1)
//     --radius <R>           Map half-width around the anchor (default: 32)
//     --depth <D>            Number of z levels (default: 48)
//     --surface <Z>          Surface level (default: depth - 8)
//     --config <PATH>        Planner config JSON (default: built-in)
//     --water-except <DIR>   Flood every approach except north/south/east/west
//     --population <N>       Population used for expansion demand (default: 20)
//     --military <N>         Military headcount (default: 0)
//     --expand <N>           Expansion rounds to run (default: 0)
//     --verbose | --quiet    Log detail on stderr
//
// Exit code 1 when the plan cannot be generated or the arguments are bad.

mod logging;
mod terrain;

use std::collections::BTreeMap;
use std::path::PathBuf;

use delver_plan::prng::phase_rng;
use delver_plan::{Direction, FortressPlanner, PlannerConfig, TileOp, TileOperation};
use logging::Verbosity;
use serde_json::json;

#[derive(Clone, Debug, PartialEq)]
struct CliArgs {
    seed: u64,
    radius: i32,
    depth: i32,
    surface: Option<i32>,
    config: Option<PathBuf>,
    water_except: Option<Direction>,
    population: u32,
    military: u32,
    expand: u32,
    verbosity: Verbosity,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            seed: 1,
            radius: 32,
            depth: 48,
            surface: None,
            config: None,
            water_except: None,
            population: 20,
            military: 0,
            expand: 0,
            verbosity: Verbosity::Normal,
        }
    }
}

impl CliArgs {
    fn surface(&self) -> i32 {
        self.surface.unwrap_or(self.depth - 8)
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Run(CliArgs),
    Help,
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(Command::Run(cli)) => cli,
        Ok(Command::Help) => {
            print_usage();
            return;
        }
        Err(msg) => {
            eprintln!("{msg}");
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(cli.verbosity) {
        eprintln!("Failed to set up logging: {e}");
    }

    match run(&cli) {
        Ok(summary) => println!("{summary}"),
        Err(msg) => {
            log::error!("{msg}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &CliArgs) -> Result<serde_json::Value, String> {
    let config = match &cli.config {
        Some(path) => PlannerConfig::load(path)
            .map_err(|e| format!("cannot load config {}: {e}", path.display()))?,
        None => PlannerConfig::default(),
    };

    let surface = cli.surface();
    if !(1..cli.depth).contains(&surface) {
        return Err(format!(
            "surface {surface} must lie within 1..{} for depth {}",
            cli.depth, cli.depth
        ));
    }
    let world = terrain::build_terrain(cli.radius, cli.depth, surface, cli.water_except);
    let anchor = terrain::anchor(cli.radius, surface);
    let planner = FortressPlanner::new(&world, &config);

    let plan = planner
        .generate(anchor, &mut phase_rng(cli.seed, 0))
        .map_err(|e| format!("planning failed: {e}"))?;
    let plan_summary = json!({
        "direction": plan.direction(),
        "hub_center": plan.hub_center(),
        "hub_z": plan.hub_z(),
        "depot_z": plan.depot_z(),
        "ops": op_counts(plan.tiles()),
    });

    let mut graph = plan.into_graph();
    let mut expansions = Vec::new();
    for round in 1..=u64::from(cli.expand) {
        let expansion = planner.expand(
            &mut graph,
            cli.population,
            cli.military,
            &mut phase_rng(cli.seed, round),
        );
        if expansion.is_empty() {
            log::info!("expansion round {round} added nothing; stopping");
            break;
        }
        expansions.push(json!({
            "round": round,
            "level": expansion.level,
            "rooms": expansion.new_rooms.iter().map(|id| id.0).collect::<Vec<_>>(),
            "ops": op_counts(&expansion.tiles),
        }));
    }

    Ok(json!({
        "seed": cli.seed,
        "anchor": anchor,
        "plan": plan_summary,
        "expansions": expansions,
        "room_counts": graph.room_counts(),
        "graph": graph.to_persisted(),
    }))
}

fn op_counts(ops: &[TileOperation]) -> BTreeMap<TileOp, usize> {
    let mut counts = BTreeMap::new();
    for op in ops {
        *counts.entry(op.op).or_insert(0) += 1;
    }
    counts
}

/// Parse command-line arguments (program name already stripped).
fn parse_args(args: &[String]) -> Result<Command, String> {
    fn value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, String> {
        args.get(i)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| format!("{flag} requires a valid value"))
    }

    let mut cli = CliArgs::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--seed" => {
                i += 1;
                cli.seed = value(args, i, flag)?;
            }
            "--radius" => {
                i += 1;
                cli.radius = value(args, i, flag)?;
                if cli.radius < 4 {
                    return Err("--radius must be at least 4".into());
                }
            }
            "--depth" => {
                i += 1;
                cli.depth = value(args, i, flag)?;
            }
            "--surface" => {
                i += 1;
                cli.surface = Some(value(args, i, flag)?);
            }
            "--config" => {
                i += 1;
                cli.config = Some(value(args, i, flag)?);
            }
            "--water-except" => {
                i += 1;
                let name: String = value(args, i, flag)?;
                cli.water_except = Some(
                    Direction::from_name(&name)
                        .ok_or_else(|| format!("unknown direction {name:?}"))?,
                );
            }
            "--population" => {
                i += 1;
                cli.population = value(args, i, flag)?;
            }
            "--military" => {
                i += 1;
                cli.military = value(args, i, flag)?;
            }
            "--expand" => {
                i += 1;
                cli.expand = value(args, i, flag)?;
            }
            "--verbose" | "-v" => cli.verbosity = Verbosity::Verbose,
            "--quiet" | "-q" => cli.verbosity = Verbosity::Quiet,
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(format!("Unknown argument: {other}")),
        }
        i += 1;
    }
    Ok(Command::Run(cli))
}

fn print_usage() {
    println!("Usage: delver [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --seed <N>             RNG seed (default: 1)");
    println!("  --radius <R>           Map half-width around the anchor (default: 32)");
    println!("  --depth <D>            Number of z levels (default: 48)");
    println!("  --surface <Z>          Surface level (default: depth - 8)");
    println!("  --config <PATH>        Planner config JSON (default: built-in)");
    println!("  --water-except <DIR>   Flood every approach except this one");
    println!("  --population <N>       Population for expansion demand (default: 20)");
    println!("  --military <N>         Military headcount (default: 0)");
    println!("  --expand <N>           Expansion rounds to run (default: 0)");
    println!("  --verbose, -v          Log planner detail to stderr");
    println!("  --quiet, -q            Only log warnings and errors");
    println!("  --help, -h             Show this help");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(parse_args(&[]), Ok(Command::Run(CliArgs::default())));
        assert_eq!(CliArgs::default().surface(), 40);
    }

    #[test]
    fn parses_every_flag() {
        let parsed = parse_args(&args(&[
            "--seed", "9", "--radius", "20", "--depth", "40", "--surface", "30",
            "--water-except", "east", "--population", "35", "--military", "12",
            "--expand", "3", "--quiet",
        ]));
        let Ok(Command::Run(cli)) = parsed else {
            panic!("expected a run command, got {parsed:?}");
        };
        assert_eq!(cli.seed, 9);
        assert_eq!(cli.radius, 20);
        assert_eq!(cli.surface(), 30);
        assert_eq!(cli.water_except, Some(Direction::East));
        assert_eq!((cli.population, cli.military, cli.expand), (35, 12, 3));
        assert_eq!(cli.verbosity, Verbosity::Quiet);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(&args(&["--seed"])).is_err());
        assert!(parse_args(&args(&["--seed", "x"])).is_err());
        assert!(parse_args(&args(&["--water-except", "up"])).is_err());
        assert!(parse_args(&args(&["--radius", "2"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert_eq!(parse_args(&args(&["-h"])), Ok(Command::Help));
    }

    #[test]
    fn run_produces_a_summary() {
        let cli = CliArgs {
            radius: 24,
            depth: 40,
            surface: Some(30),
            expand: 1,
            ..CliArgs::default()
        };
        let summary = run(&cli).unwrap();
        assert_eq!(summary["plan"]["direction"], "north");
        assert!(summary["plan"]["ops"]["dig"].as_u64().unwrap() > 0);
        assert!(summary["graph"]["rooms"].as_array().unwrap().len() > 1);
    }

    #[test]
    fn run_reports_planning_failure() {
        let cli = CliArgs {
            radius: 8,
            depth: 6,
            surface: Some(2),
            ..CliArgs::default()
        };
        let err = run(&cli).unwrap_err();
        assert!(err.starts_with("planning failed"), "{err}");
    }
}
