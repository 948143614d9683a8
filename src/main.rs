//! gunlayer: artillery firing-solution calculator CLI.

use clap::{Parser, Subcommand};
use gunlayer::ballistics::{impact_point, simulate, step_budget, LaunchParams};
use gunlayer::config::{FireConfig, MAX_STEP_BUDGET};
use gunlayer::geometry::{
    bearing_rad_from_north, distance_2d, parse_coord_with_autoscale, rotate_world_to_fireframe,
    wind_components_from_speed_dir, Point2D,
};
use gunlayer::model::{Arc, SolveRequest, WindFireFrame};
use gunlayer::report::{solution_json, solution_text, write_json_report, SolutionReport};
use gunlayer::solver::solve;
use gunlayer::tables::{write_folder, BuildOptions, TableManager};
use gunlayer::util::{init_logging, mil_to_rad, rad_to_mil};
use gunlayer::weapon::{find_profile, WeaponProfile, DEFAULT_WEAPON_CATALOG};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gunlayer")]
#[command(about = "Artillery firing-solution calculator (RK4 point-mass ballistics)")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find charge and elevation for a target.
    Solve(SolveArgs),
    /// Fly a single shot and print where it lands.
    Shot {
        #[arg(long)]
        charge: u32,
        #[arg(long, value_name = "MIL")]
        elevation: f64,
        #[arg(long, value_name = "SECONDS")]
        dt: Option<f64>,
        #[arg(long, value_name = "SECONDS")]
        ttl: Option<f64>,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Precompute range tables for the configured weapon.
    Tables {
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        #[arg(long, default_value_t = 5.0)]
        step_mil: f64,
        #[arg(long, help = "Also record drift and range change per 1 m/s of wind")]
        wind_sensitivity: bool,
        #[arg(long, value_name = "SECONDS")]
        dt: Option<f64>,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// List weapon profiles and the configured charge velocities.
    Catalog {
        /// Show only this profile (e.g. mortar_82).
        #[arg(long, value_name = "KEY")]
        weapon: Option<String>,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct SolveArgs {
    /// Downrange distance to the target (m).
    #[arg(long, value_name = "M")]
    range: Option<f64>,
    /// Target height above the gun (m), used with --range.
    #[arg(long, value_name = "M", default_value_t = 0.0, allow_negative_numbers = true)]
    height: f64,
    #[arg(long, value_name = "COORD")]
    gun_x: Option<String>,
    #[arg(long, value_name = "COORD")]
    gun_y: Option<String>,
    #[arg(long, value_name = "COORD")]
    target_x: Option<String>,
    #[arg(long, value_name = "COORD")]
    target_y: Option<String>,
    /// Metres per coordinate unit; default picks by digit count.
    #[arg(long)]
    coord_scale: Option<f64>,
    #[arg(long, value_name = "M", default_value_t = 0.0, allow_negative_numbers = true)]
    gun_alt: f64,
    #[arg(long, value_name = "M", default_value_t = 0.0, allow_negative_numbers = true)]
    target_alt: f64,
    #[arg(long, value_name = "M/S", default_value_t = 0.0)]
    wind_speed: f64,
    /// Direction the wind blows from, degrees clockwise from north
    /// (from the line of fire when the target is given by --range).
    #[arg(long, value_name = "DEG", default_value_t = 0.0)]
    wind_from: f64,
    #[arg(long, value_enum, default_value_t = Arc::Any)]
    arc: Arc,
    #[arg(long)]
    direct: bool,
    #[arg(long, value_name = "M")]
    tolerance: Option<f64>,
    #[arg(long, value_name = "SECONDS")]
    dt: Option<f64>,
    #[arg(long, value_name = "SECONDS")]
    ttl: Option<f64>,
    #[arg(long, value_name = "DIR")]
    tables: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the solution as JSON.
    #[arg(long)]
    json: bool,
    /// Also write the JSON report to this file.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Solve(args) => run_solve(args),
        Commands::Shot {
            charge,
            elevation,
            dt,
            ttl,
            config,
        } => run_shot(charge, elevation, dt, ttl, config.as_deref()),
        Commands::Tables {
            out,
            step_mil,
            wind_sensitivity,
            dt,
            config,
        } => run_tables(&out, step_mil, wind_sensitivity, dt, config.as_deref()),
        Commands::Catalog { weapon, config } => {
            run_catalog(weapon.as_deref(), config.as_deref())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<FireConfig, String> {
    match path {
        Some(p) => FireConfig::load(p).map_err(|e| e.to_string()),
        None => Ok(FireConfig::default()),
    }
}

/// Fire-frame target (range, height) and bearing in mils when map coordinates were used.
fn resolve_target(args: &SolveArgs) -> Result<(f64, f64, Option<f64>), String> {
    if let Some(range) = args.range {
        return Ok((range, args.height, None));
    }
    let (Some(gx), Some(gy), Some(tx), Some(ty)) =
        (&args.gun_x, &args.gun_y, &args.target_x, &args.target_y)
    else {
        return Err("provide --range or all of --gun-x --gun-y --target-x --target-y".to_string());
    };
    let coord = |s: &str| {
        parse_coord_with_autoscale(s, args.coord_scale).map_err(|e| e.to_string())
    };
    let gun = Point2D::new(coord(gx.as_str())?, coord(gy.as_str())?);
    let target = Point2D::new(coord(tx.as_str())?, coord(ty.as_str())?);
    let bearing = bearing_rad_from_north(gun, target);
    Ok((
        distance_2d(gun, target),
        args.target_alt - args.gun_alt,
        Some(rad_to_mil(bearing)),
    ))
}

fn run_solve(args: SolveArgs) -> Result<(), String> {
    let cfg = load_config(args.config.as_deref())?;
    let weapon = cfg.weapon().map_err(|e| e.to_string())?;
    let (range, height, bearing_mil) = resolve_target(&args)?;

    let (wx, wy) = wind_components_from_speed_dir(args.wind_speed, args.wind_from);
    let wind = rotate_world_to_fireframe(wx, wy, mil_to_rad(bearing_mil.unwrap_or(0.0)));

    let mut req = SolveRequest::new(range, height);
    req.wind_fireframe = wind;
    req.arc = args.arc;
    req.direct_fire = args.direct;
    req.tolerance_m = args.tolerance.unwrap_or(cfg.solver.tolerance_m);
    req.step_time = args.dt.unwrap_or(cfg.solver.step_time_s);
    req.time_to_live = args.ttl.unwrap_or(cfg.solver.time_to_live_s);

    let tables = match args.tables.as_ref().or(cfg.table_dir.as_ref()) {
        Some(dir) => Some(TableManager::from_folder(dir).map_err(|e| e.to_string())?),
        None => None,
    };

    let result = solve(&req, &weapon, tables.as_ref()).map_err(|e| e.to_string())?;
    let report = SolutionReport::new(req, bearing_mil, result);
    if let Some(path) = &args.out {
        write_json_report(&report, path)?;
        tracing::info!("wrote {}", path.display());
    }

    if args.json {
        println!("{}", solution_json(&report)?);
        return Ok(());
    }
    match &report.solution {
        Some(r) => {
            println!("{}", solution_text(r, bearing_mil));
            if !report.within_tolerance {
                println!(
                    "Best candidate misses by more than the {:.1} m tolerance.",
                    req.tolerance_m
                );
            }
        }
        None => println!("No solution: the weapon has no charges to try."),
    }
    Ok(())
}

fn run_shot(
    charge: u32,
    elevation: f64,
    dt: Option<f64>,
    ttl: Option<f64>,
    config: Option<&Path>,
) -> Result<(), String> {
    let cfg = load_config(config)?;
    let weapon = cfg.weapon().map_err(|e| e.to_string())?;
    let v0 = weapon.v0_for_charge(charge).map_err(|e| e.to_string())?;
    let step_time = dt.unwrap_or(cfg.solver.step_time_s);
    let time_to_live = ttl.unwrap_or(cfg.solver.time_to_live_s);
    if !(step_time > 0.0)
        || time_to_live < step_time
        || step_budget(time_to_live, step_time) > MAX_STEP_BUDGET
    {
        return Err(format!(
            "invalid integration settings: dt {} ttl {}",
            step_time, time_to_live
        ));
    }
    let tr = simulate(&LaunchParams {
        v0,
        elevation_rad: mil_to_rad(elevation),
        mass_kg: weapon.projectile.mass_kg,
        drag_coeff: weapon.projectile.drag_coeff,
        wind: WindFireFrame::default(),
        step_time,
        time_to_live,
        stop_on_ground: true,
    });
    let p = impact_point(&tr);
    println!(
        "Charge {} at {:.1} mil (v0 {:.1} m/s): impact {:.1} m, drift {:.2} m, time {:.2} s",
        charge, elevation, v0, p.range, p.drift, p.time
    );
    Ok(())
}

fn run_tables(
    out: &Path,
    step_mil: f64,
    wind_sensitivity: bool,
    dt: Option<f64>,
    config: Option<&Path>,
) -> Result<(), String> {
    if !(step_mil > 0.0) {
        return Err(format!("--step-mil must be positive, got {}", step_mil));
    }
    let cfg = load_config(config)?;
    let weapon = cfg.weapon().map_err(|e| e.to_string())?;
    let opts = BuildOptions {
        step_mil,
        wind_sensitivity,
        step_time: dt.unwrap_or(cfg.solver.step_time_s),
        time_to_live: cfg.solver.time_to_live_s,
    };
    write_folder(out, &weapon, &opts).map_err(|e| e.to_string())?;
    tracing::info!("tables written to {}", out.display());
    Ok(())
}

fn run_catalog(key: Option<&str>, config: Option<&Path>) -> Result<(), String> {
    let cfg = load_config(config)?;
    let weapon = cfg.weapon().map_err(|e| e.to_string())?;
    let profiles: Vec<&WeaponProfile> = match key {
        Some(k) => vec![find_profile(k).ok_or_else(|| format!("unknown weapon profile: {}", k))?],
        None => DEFAULT_WEAPON_CATALOG.iter().collect(),
    };
    for profile in profiles {
        println!("{} ({}, {})", profile.name, profile.key, profile.kind);
        for p in profile.projectiles {
            println!("  {}  tables: {}", p.name, p.table_folder);
        }
    }
    println!("\nCharges:");
    for (&id, &mult) in weapon.charges() {
        println!(
            "  {}  x{:.2}  v0 {:.1} m/s",
            id,
            mult,
            weapon.base_speed() * mult
        );
    }
    Ok(())
}
