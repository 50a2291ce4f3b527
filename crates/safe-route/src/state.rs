//! Application state
//!
//! Holds the process-wide incident index and the routing engine. Requests take one index
//! snapshot and route against it, so a reload never changes the data under a running request.

use crate::output::RouteResponse;
use crate::settings::Settings;
use rand::SeedableRng;
use rand::rngs::StdRng;
use safe_route_lib::{RouteError, RoutingEngine, SharedIndex, SpatialIndex, load_incidents_csv};
use std::path::Path;

/// Main application state
pub struct AppState {
    /// Current incident index, replaced wholesale on reload
    pub index: SharedIndex,
    pub engine: RoutingEngine,
    pub settings: Settings,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            index: SharedIndex::empty(),
            engine: RoutingEngine::new(settings.engine_config()),
            settings,
        }
    }

    /// Load incidents from a CSV file and publish them as the current index
    ///
    /// A dataset without usable rows is not fatal: the current index stays in place and routes
    /// are computed without penalties.
    pub fn load_incidents(&self, path: &Path) -> crate::Result<()> {
        #[cfg(feature = "profiling")]
        profiling::scope!("load_incidents");

        // Read and parse outside of the index lock
        match load_incidents_csv(path, &self.settings.load_options()) {
            Ok(points) => {
                let snapshot = self.index.load(points);
                if snapshot.index.dropped() > 0 {
                    tracing::warn!(
                        "Dropped {} incidents with invalid coordinates",
                        snapshot.index.dropped()
                    );
                }
                Ok(())
            }
            Err(RouteError::IndexUnavailable(reason)) => {
                tracing::warn!(
                    "No incident data from {} ({}), routing without penalties",
                    path.display(),
                    reason
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Route one request against `index`
    ///
    /// With a configured seed, `stream` selects an independent reproducible jitter sequence.
    pub fn route(
        &self,
        index: &SpatialIndex,
        src: (f64, f64),
        dst: (f64, f64),
        stream: u64,
    ) -> safe_route_lib::Result<RouteResponse> {
        let plan = match self.settings.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(stream));
                self.engine.compute_route_with_rng(index, src, dst, &mut rng)?
            }
            None => self.engine.compute_route(index, src, dst)?,
        };
        if let Some(fallback) = plan.fallback {
            tracing::warn!("Route computed with fallback {:?}", fallback);
        }
        Ok(RouteResponse::from_plan(plan, &self.settings.export_base_url))
    }
}
