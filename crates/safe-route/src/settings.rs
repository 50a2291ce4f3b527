use clap::Parser;
use geo::{Coord, Rect};
use safe_route_lib::{Config, LoadOptions, MAX_WAYPOINT_COUNT, utils};
use std::path::PathBuf;
use std::str::FromStr;

/// Default base URL of the path export link
pub const DEFAULT_EXPORT_BASE_URL: &str = "https://www.google.com/maps/dir/";

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Safe Route - Compute routes that steer away from recorded incident locations
pub struct Settings {
    /// Incident CSV file (columns lat/latitude, long/longitude/lon, optional id)
    #[clap(short, long, value_name = "FILE")]
    pub incidents: Option<PathBuf>,

    /// Route source as "lat,lon"
    #[clap(short, long, value_name = "LAT,LON", required_unless_present = "batch", allow_hyphen_values = true)]
    pub from: Option<Coordinate>,

    /// Route destination as "lat,lon"
    #[clap(short, long, value_name = "LAT,LON", required_unless_present = "batch", allow_hyphen_values = true)]
    pub to: Option<Coordinate>,

    /// Batch file with one "src_lat,src_lon,dst_lat,dst_lon" request per line
    #[clap(short, long, value_name = "FILE", conflicts_with_all = ["from", "to"])]
    pub batch: Option<PathBuf>,

    /// Number of intermediate waypoints
    #[clap(short, long, default_value = "8", value_parser = parse_waypoint_count)]
    pub waypoints: usize,

    /// How many nodes ahead shortcut edges may reach beyond the next node
    #[clap(long, default_value = "2", value_parser = parse_skip_ahead)]
    pub skip_ahead: usize,

    /// Incident search radius around each edge sample in kilometers
    #[clap(short, long, default_value = "0.4", value_parser = parse_radius)]
    pub radius: f64,

    /// Maximum incident points kept after loading (0 = keep all)
    #[clap(long, default_value = "1000")]
    pub max_points: usize,

    /// Only keep incidents inside "min_lat,min_lon,max_lat,max_lon"
    #[clap(long, value_name = "BOX", allow_hyphen_values = true)]
    pub bounds: Option<Bounds>,

    /// Seed for incident sampling and waypoint jitter (reproducible output)
    #[clap(long)]
    pub seed: Option<u64>,

    /// Base URL of the path export link
    #[clap(long, default_value = DEFAULT_EXPORT_BASE_URL)]
    pub export_base_url: String,

    /// Write the chosen path as a GPX track (single request only)
    #[clap(long, value_name = "FILE", conflicts_with = "batch")]
    pub gpx_out: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[clap(short, long, default_value = "false")]
    pub pretty: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[clap(short, long, default_value = "false")]
    pub verbose: bool,
}

impl Settings {
    /// Engine configuration derived from the command line
    pub fn engine_config(&self) -> Config {
        Config {
            waypoint_count: self.waypoints,
            skip_ahead: self.skip_ahead,
            radius_km: self.radius,
            ..Config::default()
        }
    }

    /// Incident loading options derived from the command line
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            max_points: (self.max_points > 0).then_some(self.max_points),
            bounds: self.bounds.map(Rect::from),
            seed: self.seed,
        }
    }
}

/// A validated "lat,lon" pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn pair(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = parse_numbers(s)?;
        let [latitude, longitude] = values[..] else {
            return Err(format!("expected \"lat,lon\", got {:?}", s));
        };
        if !utils::is_valid_coordinate(latitude, longitude) {
            return Err(format!("coordinate ({latitude}, {longitude}) is out of range"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A validated "min_lat,min_lon,max_lat,max_lon" box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Coordinate,
    pub max: Coordinate,
}

impl FromStr for Bounds {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = parse_numbers(s)?;
        let [min_lat, min_lon, max_lat, max_lon] = values[..] else {
            return Err(format!(
                "expected \"min_lat,min_lon,max_lat,max_lon\", got {:?}",
                s
            ));
        };
        let corner = |latitude: f64, longitude: f64| {
            if utils::is_valid_coordinate(latitude, longitude) {
                Ok(Coordinate {
                    latitude,
                    longitude,
                })
            } else {
                Err(format!("corner ({latitude}, {longitude}) is out of range"))
            }
        };
        let (min, max) = (corner(min_lat, min_lon)?, corner(max_lat, max_lon)?);
        if min.latitude > max.latitude || min.longitude > max.longitude {
            return Err("bounding box minimum exceeds its maximum".to_string());
        }
        Ok(Self { min, max })
    }
}

impl From<Bounds> for Rect<f64> {
    fn from(bounds: Bounds) -> Self {
        Rect::new(
            Coord {
                x: bounds.min.longitude,
                y: bounds.min.latitude,
            },
            Coord {
                x: bounds.max.longitude,
                y: bounds.max.latitude,
            },
        )
    }
}

fn parse_waypoint_count(s: &str) -> Result<usize, String> {
    let count: usize = s.trim().parse().map_err(|e| format!("{e}"))?;
    if count > MAX_WAYPOINT_COUNT {
        return Err(format!("at most {MAX_WAYPOINT_COUNT} waypoints are supported"));
    }
    Ok(count)
}

/// A shortcut can never skip more nodes than a route has
fn parse_skip_ahead(s: &str) -> Result<usize, String> {
    let skip: usize = s.trim().parse().map_err(|e| format!("{e}"))?;
    if skip > MAX_WAYPOINT_COUNT + 1 {
        return Err(format!("skip-ahead must be at most {}", MAX_WAYPOINT_COUNT + 1));
    }
    Ok(skip)
}

fn parse_radius(s: &str) -> Result<f64, String> {
    let radius: f64 = s.trim().parse().map_err(|e| format!("{e}"))?;
    if !radius.is_finite() || radius <= 0.0 {
        return Err(format!("radius must be a positive number of kilometers, got {s}"));
    }
    Ok(radius)
}

/// Parse a comma-separated list of finite numbers
fn parse_numbers(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("{:?} is not a finite number", part))
        })
        .collect()
}
