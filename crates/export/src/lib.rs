//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod trajectory {
    use std::io::{self, Write};

    use tracker_core::TrajectoryEntry;

    const HEADER: &str = "hour,present,lat,lng,altitude";

    fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// Write the header and one row per entry; absent hours keep empty
    /// coordinate cells.
    pub fn write_entries(writer: &mut dyn Write, entries: &[TrajectoryEntry]) -> io::Result<()> {
        write_header(writer)?;
        for entry in entries {
            match entry.position {
                Some(p) => writeln!(
                    writer,
                    "{},true,{:.6},{:.6},{:.3}",
                    entry.hour.value(),
                    p.lat,
                    p.lng,
                    p.altitude
                )?,
                None => writeln!(writer, "{},false,,,", entry.hour.value())?,
            }
        }
        writer.flush()
    }
}

pub mod scene {
    use std::io::{self, Write};
    use std::path::Path;

    use serde::Serialize;
    use serde_json::to_writer_pretty;
    use tracker_geometry::SceneGeometry;

    /// Context written next to the derived collections.
    #[derive(Debug, Clone, Serialize)]
    pub struct Metadata<'a> {
        pub fetched_at: Option<&'a str>,
        pub hours: usize,
        pub gaps: Vec<u8>,
        pub entities: usize,
        pub focused: Option<usize>,
        pub display_hour: u8,
        pub all_hours_mode: bool,
        pub altitude_scale: f64,
        pub wind_vector_scale: f64,
        pub wind_available: bool,
    }

    #[derive(Serialize)]
    struct SceneDocument<'a> {
        metadata: &'a Metadata<'a>,
        #[serde(flatten)]
        scene: &'a SceneGeometry,
    }

    /// Write the scene and its metadata as pretty JSON (`-` for stdout).
    pub fn write_scene(path: &Path, meta: &Metadata<'_>, scene: &SceneGeometry) -> io::Result<()> {
        let mut writer = super::writer_for_path(path)?;
        let document = SceneDocument {
            metadata: meta,
            scene,
        };
        to_writer_pretty(&mut writer, &document)?;
        writeln!(writer)?;
        writer.flush()
    }
}
