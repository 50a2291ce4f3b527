//! Incident CSV loading
//!
//! Reads incident coordinates from a CSV file with a header row. Column names vary between
//! datasets, so latitude and longitude are looked up under several common aliases. Datasets
//! larger than the configured cap are reduced to a uniform random sample of exactly that size.

use crate::{IncidentPoint, Result, RouteError, utils};
use geo::{Coord, Intersects, Rect};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Read;
use std::path::Path;

const LATITUDE_COLUMNS: &[&str] = &["lat", "latitude"];
const LONGITUDE_COLUMNS: &[&str] = &["long", "longitude", "lon"];
const ID_COLUMNS: &[&str] = &["id"];

/// Options controlling which incidents are kept
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Keep at most this many incidents (uniform sample when exceeded).
    /// Default: 1000
    pub max_points: Option<usize>,
    /// Only keep incidents inside this box (x = longitude, y = latitude, edges inclusive)
    pub bounds: Option<Rect<f64>>,
    /// Seed for the sampling RNG; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_points: Some(1000),
            bounds: None,
            seed: None,
        }
    }
}

/// Load incidents from a CSV file
///
/// # Errors
/// - [`RouteError::Io`] / [`RouteError::Csv`] when the file or its header cannot be read
/// - [`RouteError::IndexUnavailable`] when the file has no coordinate columns or no usable rows
pub fn load_incidents_csv<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Vec<IncidentPoint>> {
    #[cfg(feature = "profiling")]
    profiling::scope!("loader::load_incidents_csv");

    let path = path.as_ref();
    tracing::info!("Loading incident data from {}", path.display());
    let file = std::fs::File::open(path)?;
    read_incidents(std::io::BufReader::new(file), options)
}

/// Read incidents from any CSV source
///
/// # Errors
/// See [`load_incidents_csv`].
pub fn read_incidents<R: Read>(reader: R, options: &LoadOptions) -> Result<Vec<IncidentPoint>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let find = |aliases: &[&str]| {
        headers
            .iter()
            .position(|h| aliases.iter().any(|alias| h.eq_ignore_ascii_case(alias)))
    };
    let (Some(lat_col), Some(lon_col)) = (find(LATITUDE_COLUMNS), find(LONGITUDE_COLUMNS)) else {
        return Err(RouteError::IndexUnavailable(
            "no latitude/longitude columns in incident data".to_string(),
        ));
    };
    let id_col = find(ID_COLUMNS);

    let mut incidents = Vec::new();
    let mut skipped = 0usize;
    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            // A failing stream will not recover, a malformed row only loses itself
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Skipping malformed incident row: {}", e);
                skipped += 1;
                continue;
            }
        };
        let parse = |col: usize| record.get(col).and_then(|v| v.parse::<f64>().ok());

        let (Some(lat), Some(lon)) = (parse(lat_col), parse(lon_col)) else {
            skipped += 1;
            continue;
        };
        if !utils::is_valid_coordinate(lat, lon) {
            skipped += 1;
            continue;
        }
        if let Some(bounds) = options.bounds
            && !bounds.intersects(&Coord { x: lon, y: lat })
        {
            continue;
        }

        let id = id_col
            .and_then(|col| record.get(col))
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(incidents.len() as i64);
        incidents.push(IncidentPoint::new(id, lat, lon));
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} rows without usable coordinates", skipped);
    }
    if incidents.is_empty() {
        return Err(RouteError::IndexUnavailable(
            "no usable incident rows".to_string(),
        ));
    }

    let incidents = match options.max_points {
        Some(max) if incidents.len() > max => {
            let total = incidents.len();
            let mut rng = options
                .seed
                .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
            let sample = reservoir_sample(incidents, max, &mut rng);
            tracing::info!("Sampled {} of {} incidents", sample.len(), total);
            sample
        }
        _ => incidents,
    };

    tracing::info!("Loaded {} incident points", incidents.len());
    Ok(incidents)
}

/// Uniform fixed-size sample (Algorithm R): every item ends up in the result with
/// probability `size / items.len()`
pub(crate) fn reservoir_sample<T, R: Rng>(items: Vec<T>, size: usize, rng: &mut R) -> Vec<T> {
    let mut reservoir = Vec::with_capacity(size.min(items.len()));
    for (seen, item) in items.into_iter().enumerate() {
        if seen < size {
            reservoir.push(item);
        } else {
            let slot = rng.gen_range(0..=seen);
            if slot < size {
                reservoir[slot] = item;
            }
        }
    }
    reservoir
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(max_points: Option<usize>) -> LoadOptions {
        LoadOptions {
            max_points,
            bounds: None,
            seed: Some(7),
        }
    }

    #[test]
    fn test_read_with_aliases() {
        let data = "id,latitude,lon\n1,12.9856,80.2001\n2,13.0021,80.2153\n";
        let incidents = read_incidents(data.as_bytes(), &options(None)).unwrap();
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0], IncidentPoint::new(1, 12.9856, 80.2001));
        assert_eq!(incidents[1].id, 2);
    }

    #[test]
    fn test_short_column_names_and_missing_id() {
        let data = "Lat,Long,category\n12.96, 80.19 ,theft\n12.97,80.21,assault\n";
        let incidents = read_incidents(data.as_bytes(), &options(None)).unwrap();
        assert_eq!(incidents.len(), 2);
        // Without an id column the running ordinal is used
        assert_eq!(incidents[0].id, 0);
        assert_eq!(incidents[1].id, 1);
        assert!((incidents[0].longitude - 80.19).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unparseable_rows_skipped() {
        let data = "lat,long\n12.9,80.2\nabc,80.2\n,\n95.0,80.2\n13.0,80.3\n";
        let incidents = read_incidents(data.as_bytes(), &options(None)).unwrap();
        assert_eq!(incidents.len(), 2);
    }

    #[test]
    fn test_malformed_record_skipped() {
        let data: &[u8] = b"id,lat,long\n1,12.9,80.2\n2,\xff\xfe,80.2\n3,13.0,80.3\n";
        let incidents = read_incidents(data, &options(None)).unwrap();
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].id, 1);
        assert_eq!(incidents[1].id, 3);
    }

    #[test]
    fn test_missing_columns_is_index_unavailable() {
        let data = "x,y\n1,2\n";
        assert!(matches!(
            read_incidents(data.as_bytes(), &options(None)),
            Err(RouteError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn test_no_rows_is_index_unavailable() {
        let data = "lat,long\n";
        assert!(matches!(
            read_incidents(data.as_bytes(), &options(None)),
            Err(RouteError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn test_bounds_filter() {
        let data = "lat,long\n12.9,80.2\n13.5,80.2\n12.7,80.0\n";
        let bounds = Rect::new(Coord { x: 80.0, y: 12.7 }, Coord { x: 80.3, y: 13.2 });
        let opts = LoadOptions {
            bounds: Some(bounds),
            ..options(None)
        };
        let incidents = read_incidents(data.as_bytes(), &opts).unwrap();
        // The corner point is kept (edges inclusive)
        assert_eq!(incidents.len(), 2);
        assert!(incidents.iter().all(|p| p.latitude <= 13.2));
    }

    #[test]
    fn test_sampling_caps_exactly() {
        let mut data = String::from("id,lat,long\n");
        for i in 0..500 {
            data.push_str(&format!("{},{},{}\n", i, 12.7 + i as f64 * 0.001, 80.1));
        }
        let incidents = read_incidents(data.as_bytes(), &options(Some(100))).unwrap();
        assert_eq!(incidents.len(), 100);

        // Seeded sampling is reproducible
        let again = read_incidents(data.as_bytes(), &options(Some(100))).unwrap();
        assert_eq!(incidents, again);
    }

    #[test]
    fn test_reservoir_sample_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut hits = [0usize; 10];
        for _ in 0..5000 {
            for item in reservoir_sample((0..10).collect(), 3, &mut rng) {
                hits[item] += 1;
            }
        }
        // Each item expected 1500 times
        assert!(hits.iter().all(|&h| (1300..1700).contains(&h)), "{hits:?}");
    }

    #[test]
    fn test_reservoir_smaller_input_returned_whole() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(reservoir_sample(vec![1, 2], 5, &mut rng), vec![1, 2]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_incidents_csv("/nonexistent/incidents.csv", &LoadOptions::default());
        assert!(matches!(result, Err(RouteError::Io(_))));
    }
}
