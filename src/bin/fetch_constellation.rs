//! Fetch the 24 hourly snapshots, derive the scene for a selection, and
//! optionally export it for the viewer.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use constellation_tracker::config::{JoinPolicyConfig, load_or_default};
use constellation_tracker::export::{scene, trajectory, writer_for_path};
use constellation_tracker::geometry::{
    DisplayParams, SelectionState, build_scene, focused_details,
};
use constellation_tracker::importer::SnapshotAggregator;
use constellation_tracker::model::EntityId;
use constellation_tracker::wind::GridSampler;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Fetch constellation snapshots and derive overlays")]
struct Cli {
    /// Configuration file (TOML or YAML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the position feed base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Override the wind document path
    #[arg(long)]
    wind: Option<PathBuf>,

    /// Per-request timeout in seconds (0 waits indefinitely)
    #[arg(long)]
    timeout: Option<u64>,

    /// How failed hours are handled
    #[arg(long, value_enum)]
    policy: Option<Policy>,

    /// Hour whose snapshot is displayed (clamped to 0..=23)
    #[arg(long, default_value_t = 0)]
    hour: i64,

    /// Focus a single entity by index
    #[arg(long)]
    focus: Option<usize>,

    /// Show every entity's full-window path
    #[arg(long, default_value_t = false)]
    all_hours: bool,

    /// Write the derived scene as JSON (`-` for stdout)
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Write the focused entity's trajectory as CSV (`-` for stdout)
    #[arg(long, requires = "focus")]
    trajectory: Option<PathBuf>,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum Policy {
    AllOrNothing,
    KeepSucceeded,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    constellation_tracker::init_logging();
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.feed.base_url = base_url;
    }
    if let Some(path) = cli.wind {
        config.wind.path = path;
    }
    if let Some(timeout) = cli.timeout {
        config.feed.request_timeout_secs = Some(timeout);
    }
    if let Some(policy) = cli.policy {
        config.feed.join_policy = match policy {
            Policy::AllOrNothing => JoinPolicyConfig::AllOrNothing,
            Policy::KeepSucceeded => JoinPolicyConfig::KeepSucceeded,
        };
    }
    config.validate()?;

    let params = DisplayParams::new(config.display.altitude_scale, config.display.wind_vector_scale)?
        .with_wind_vectors(config.display.show_wind_vectors);

    let mut selection = SelectionState::new();
    selection.set_hour(cli.hour);
    selection.set_all_hours_mode(cli.all_hours);
    if let Some(index) = cli.focus {
        selection.select_entity(EntityId(index));
    }

    let sampler = GridSampler::load(&config.wind.path);
    let aggregator = SnapshotAggregator::from_config(&config.feed)?;
    info!(base_url = %config.feed.base_url, "fetching constellation");
    let constellation = aggregator.fetch_all().await?;

    let scene_geometry = build_scene(&constellation, Some(&sampler), &selection, &params);
    let fetched_at = aggregator.last_fetch().map(|t| t.to_rfc3339());

    println!("=== Constellation ===");
    println!("Fetched at     : {}", fetched_at.as_deref().unwrap_or("-"));
    println!("Hours          : {}", constellation.len());
    let gaps: Vec<u8> = constellation.gaps().map(|h| h.value()).collect();
    if !gaps.is_empty() {
        println!("Missing hours  : {:?}", gaps);
    }
    println!("Entities (now) : {}", constellation.current_positions().len());
    println!(
        "Wind field     : {}",
        match sampler.field() {
            Some(field) => {
                let s = field.summary();
                format!("{} x {} grid, {}° x {}°", s.nx, s.ny, s.dx, s.dy)
            }
            None => "unavailable".to_string(),
        }
    );
    println!("=== Scene ===");
    println!("Markers        : {}", scene_geometry.markers.len());
    println!("Altitude bars  : {}", scene_geometry.altitude_indicators.len());
    println!("Paths          : {}", scene_geometry.paths.len());
    println!("Wind vectors   : {}", scene_geometry.wind_vectors.len());
    if let Some(details) = focused_details(&scene_geometry.markers, &selection, &params) {
        println!(
            "Focused {}    : lat {:.4}°, lng {:.4}°, altitude {:.1}",
            details.id, details.lat, details.lng, details.altitude
        );
    }

    if let Some(path) = &cli.scene {
        let meta = scene::Metadata {
            fetched_at: fetched_at.as_deref(),
            hours: constellation.len(),
            gaps,
            entities: constellation.entity_count(),
            focused: selection.focused().map(EntityId::index),
            display_hour: selection.display_hour().value(),
            all_hours_mode: selection.all_hours_mode(),
            altitude_scale: params.altitude_scale(),
            wind_vector_scale: params.wind_vector_scale(),
            wind_available: sampler.is_available(),
        };
        scene::write_scene(path, &meta, &scene_geometry)?;
        info!(path = %path.display(), "scene written");
    }

    if let (Some(path), Some(id)) = (&cli.trajectory, selection.focused()) {
        let mut writer = writer_for_path(path)?;
        trajectory::write_entries(&mut *writer, &aggregator.trajectory(id))?;
        info!(path = %path.display(), entity = %id, "trajectory written");
    }

    Ok(())
}
