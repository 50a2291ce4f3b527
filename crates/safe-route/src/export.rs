//! GPX export of a computed route

use gpx::{Gpx, GpxVersion, Track, TrackSegment};
use safe_route_lib::Waypoint;
use std::io::Write;
use std::path::Path;

/// Build a single-track GPX 1.1 document following `waypoints`
pub fn route_to_gpx(waypoints: &[Waypoint]) -> Gpx {
    let mut segment = TrackSegment::default();
    segment.points = waypoints
        .iter()
        .map(|&w| gpx::Waypoint::new(geo::Point::from(w)))
        .collect();

    let mut track = Track::default();
    track.name = Some("Safe route".to_string());
    track.segments.push(segment);

    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(concat!("safe-route ", env!("CARGO_PKG_VERSION")).to_string()),
        ..Default::default()
    };
    gpx.tracks.push(track);
    gpx
}

/// Write the route as GPX to any writer
pub fn write_gpx<W: Write>(waypoints: &[Waypoint], writer: W) -> Result<(), gpx::errors::GpxError> {
    gpx::write(&route_to_gpx(waypoints), writer)
}

/// Write the route as GPX to a file
pub fn write_gpx_file(waypoints: &[Waypoint], path: &Path) -> crate::Result<()> {
    let file = std::fs::File::create(path)?;
    write_gpx(waypoints, std::io::BufWriter::new(file))?;
    tracing::info!("Wrote {} route points to {}", waypoints.len(), path.display());
    Ok(())
}
