//! Decode a wind document and print the u/v components at one point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use constellation_tracker::config::DEFAULT_WIND_PATH;
use constellation_tracker::wind::GridSampler;
use constellation_tracker::wind::components::WIND_COMPONENTS;

#[derive(Parser)]
#[command(author, version, about = "Sample the static wind field at a point")]
struct Cli {
    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude in degrees (any range; wrapped into [0, 360))
    #[arg(long, allow_hyphen_values = true)]
    lng: f64,

    /// Wind document (JSON array of grids)
    #[arg(long, default_value = DEFAULT_WIND_PATH)]
    wind: PathBuf,
}

fn main() -> ExitCode {
    constellation_tracker::init_logging();
    let cli = Cli::parse();
    let sampler = GridSampler::load(&cli.wind);

    let Some(field) = sampler.field() else {
        let reason = sampler
            .unavailable_reason()
            .map(|err| err.to_string())
            .unwrap_or_default();
        eprintln!("wind field unavailable: {reason}");
        return ExitCode::from(2);
    };

    let summary = field.summary();
    println!(
        "Grid           : {} x {} ({}° x {}°)",
        summary.nx, summary.ny, summary.dx, summary.dy
    );
    for kind in WIND_COMPONENTS {
        println!("  - {:<13} {}", kind.label(), kind.description());
    }

    match sampler.sample(cli.lat, cli.lng) {
        Some(wind) => {
            println!("u              : {:.3}", wind.u);
            println!("v              : {:.3}", wind.v);
            println!("speed          : {:.3}", wind.speed());
            ExitCode::SUCCESS
        }
        None => {
            println!("({}, {}) is outside grid coverage", cli.lat, cli.lng);
            ExitCode::from(1)
        }
    }
}
