//! Batch routing
//!
//! Each non-empty line of a batch file is one request, `src_lat,src_lon,dst_lat,dst_lon`.
//! Lines starting with `#` are comments. All requests run in parallel against the same index
//! snapshot; results keep input order and a bad line only fails its own entry.

use crate::output::BatchEntry;
use crate::settings::Coordinate;
use crate::state::AppState;
use rayon::prelude::*;

/// One parsed batch line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchRequest {
    /// 1-based line number in the batch file
    pub line: usize,
    pub from: Coordinate,
    pub to: Coordinate,
}

/// Parse a batch file; unparseable lines yield `(line, reason)`
pub fn parse_batch(text: &str) -> Vec<Result<BatchRequest, (usize, String)>> {
    text.lines()
        .enumerate()
        .map(|(i, raw)| (i + 1, raw.trim()))
        .filter(|(_, raw)| !raw.is_empty() && !raw.starts_with('#'))
        .map(|(line, raw)| parse_line(line, raw).map_err(|e| (line, e)))
        .collect()
}

fn parse_line(line: usize, raw: &str) -> Result<BatchRequest, String> {
    let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [src_lat, src_lon, dst_lat, dst_lon] = fields[..] else {
        return Err(format!(
            "expected 4 comma-separated values, got {}",
            fields.len()
        ));
    };
    Ok(BatchRequest {
        line,
        from: format!("{src_lat},{src_lon}").parse()?,
        to: format!("{dst_lat},{dst_lon}").parse()?,
    })
}

/// Route every request of a batch file
pub fn run_batch(state: &AppState, text: &str) -> Vec<BatchEntry> {
    #[cfg(feature = "profiling")]
    profiling::scope!("run_batch");

    let requests = parse_batch(text);
    let snapshot = state.index.snapshot();
    tracing::info!(
        "Routing {} batch requests against incident index v{}",
        requests.len(),
        snapshot.version
    );

    let entries: Vec<BatchEntry> = requests
        .into_par_iter()
        .map(|request| match request {
            Ok(request) => state
                .route(
                    &snapshot.index,
                    request.from.pair(),
                    request.to.pair(),
                    request.line as u64,
                )
                .map(BatchEntry::Route)
                .unwrap_or_else(|e| BatchEntry::Error {
                    line: request.line,
                    error: e.to_string(),
                }),
            Err((line, error)) => {
                tracing::warn!("Skipping batch line {}: {}", line, error);
                BatchEntry::Error { line, error }
            }
        })
        .collect();

    let failed = entries
        .iter()
        .filter(|entry| matches!(entry, BatchEntry::Error { .. }))
        .count();
    if failed > 0 {
        tracing::warn!("{} of {} batch requests failed", failed, entries.len());
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use clap::Parser;
    use safe_route_lib::IncidentPoint;

    const BATCH: &str = "\
# src_lat,src_lon,dst_lat,dst_lon
12.8259,80.0395,13.0843,80.2705

12.90, 80.10, 12.95, 80.20
not,a,valid,line
13.0,80.2,95.0,80.2
12.95,80.20
";

    fn state() -> AppState {
        AppState::new(
            Settings::try_parse_from(["safe-route", "--batch", "b.txt", "--seed", "1"]).unwrap(),
        )
    }

    #[test]
    fn test_parse_batch_lines() {
        let parsed = parse_batch(BATCH);
        assert_eq!(parsed.len(), 5);

        let first = parsed[0].as_ref().unwrap();
        assert_eq!(first.line, 2);
        assert_eq!(first.from.pair(), (12.8259, 80.0395));
        assert_eq!(first.to.pair(), (13.0843, 80.2705));

        assert_eq!(parsed[1].as_ref().unwrap().line, 4);
        assert_eq!(parsed[2].as_ref().unwrap_err().0, 5);
        // Out-of-range latitude
        assert_eq!(parsed[3].as_ref().unwrap_err().0, 6);
        assert!(parsed[4].as_ref().unwrap_err().1.contains("got 2"));
    }

    #[test]
    fn test_run_batch_keeps_order_and_isolates_errors() {
        let state = state();
        state.index.load(vec![IncidentPoint::new(1, 12.95, 80.15)]);

        let entries = run_batch(&state, BATCH);
        assert_eq!(entries.len(), 5);
        assert!(matches!(&entries[0], BatchEntry::Route(r) if r.waypoints.len() >= 2));
        assert!(matches!(&entries[1], BatchEntry::Route(_)));
        assert!(matches!(entries[2], BatchEntry::Error { line: 5, .. }));
        assert!(matches!(entries[3], BatchEntry::Error { line: 6, .. }));
        assert!(matches!(entries[4], BatchEntry::Error { line: 7, .. }));
    }

    #[test]
    fn test_seeded_batch_is_reproducible() {
        let state = state();
        let first = run_batch(&state, BATCH);
        let second = run_batch(&state, BATCH);

        let urls = |entries: &[BatchEntry]| -> Vec<String> {
            entries
                .iter()
                .filter_map(|entry| match entry {
                    BatchEntry::Route(r) => Some(r.path_export_url.clone()),
                    BatchEntry::Error { .. } => None,
                })
                .collect()
        };
        assert_eq!(urls(&first), urls(&second));
    }
}
