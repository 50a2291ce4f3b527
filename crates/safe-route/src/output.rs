//! JSON response documents

use safe_route_lib::{Fallback, RoutePlan, Waypoint};
use serde::Serialize;
use std::fmt::Write;

/// Result of one routing request as printed on stdout
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub waypoints: Vec<Waypoint>,
    pub distance_meters: f64,
    pub cost: f64,
    pub path_export_url: String,
    pub fallback: Option<Fallback>,
}

impl RouteResponse {
    pub fn from_plan(plan: RoutePlan, export_base_url: &str) -> Self {
        let path_export_url = path_export_url(export_base_url, &plan.waypoints);
        Self {
            waypoints: plan.waypoints,
            distance_meters: plan.distance_meters,
            cost: plan.cost,
            path_export_url,
            fallback: plan.fallback,
        }
    }
}

/// One entry of a batch result: a route, or the reason the line produced none
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Route(RouteResponse),
    Error { line: usize, error: String },
}

/// Build the path export link: `base` followed by `lat,lon/` for every waypoint
pub fn path_export_url(base: &str, waypoints: &[Waypoint]) -> String {
    let mut url = String::with_capacity(base.len() + waypoints.len() * 24);
    url.push_str(base);
    if !url.is_empty() && !url.ends_with('/') {
        url.push('/');
    }
    for waypoint in waypoints {
        // Writing to a String cannot fail
        let _ = write!(url, "{},{}/", waypoint.latitude, waypoint.longitude);
    }
    url
}

/// Serialize `value` as compact or pretty JSON
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_EXPORT_BASE_URL;

    fn plan() -> RoutePlan {
        RoutePlan {
            waypoints: vec![Waypoint::new(12.8259, 80.0395), Waypoint::new(13.0843, 80.2705)],
            node_path: vec![0, 9],
            distance_meters: 37_500.0,
            cost: 40_000.0,
            penalized_edges: 1,
            fallback: Some(Fallback::DirectRoute),
        }
    }

    #[test]
    fn test_path_export_url() {
        let url = path_export_url(DEFAULT_EXPORT_BASE_URL, &plan().waypoints);
        assert_eq!(
            url,
            "https://www.google.com/maps/dir/12.8259,80.0395/13.0843,80.2705/"
        );
    }

    #[test]
    fn test_path_export_url_adds_separator() {
        let url = path_export_url("https://example.org/route", &[Waypoint::new(1.5, -2.25)]);
        assert_eq!(url, "https://example.org/route/1.5,-2.25/");
    }

    #[test]
    fn test_response_json_fields() {
        let response = RouteResponse::from_plan(plan(), DEFAULT_EXPORT_BASE_URL);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["distanceMeters"], 37_500.0);
        assert_eq!(value["cost"], 40_000.0);
        assert_eq!(value["fallback"], "DirectRoute");
        assert_eq!(value["waypoints"][0]["latitude"], 12.8259);
        assert_eq!(value["waypoints"][1]["longitude"], 80.2705);
        assert!(value["pathExportUrl"].as_str().unwrap().ends_with("80.2705/"));
    }

    #[test]
    fn test_batch_error_entry() {
        let entry = BatchEntry::Error {
            line: 3,
            error: "bad".to_string(),
        };
        assert_eq!(to_json(&entry, false).unwrap(), r#"{"line":3,"error":"bad"}"#);
    }
}
