//! Constellation tracking core shared by the command-line tools.
//!
//! The library crate re-exports the workspace crates under short module
//! names so front-ends (CLI today, a viewer later) depend on one package.

pub use tracker_config as config;
pub use tracker_core as model;
pub use tracker_export as export;
pub use tracker_geometry as geometry;
pub use tracker_importer as importer;
pub use tracker_wind as wind;

/// Install the `tracing` subscriber used by the binaries (filter from `RUST_LOG`).
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
