use std::env;

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{DatasetKind, DatasetLocation},
    error::PlaceQueryError,
};

/// Finest H3 resolution the density function accepts.
pub const FUNCTION_MAX_H3_RESOLUTION: u8 = 8;
/// Finest H3 resolution offered for the in-query density shape.
pub const MAX_H3_RESOLUTION: u8 = 12;
pub const MIN_H3_RESOLUTION: u8 = 1;

/// Input defaults applied whenever the search form is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDefaults {
    pub circle_radius_m: u32,
    pub function_radius_m: u32,
    pub route_buffer_m: u32,
    pub h3_resolution: u8,
    pub marker_limit: usize,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            circle_radius_m: 1000,
            function_radius_m: 5000,
            route_buffer_m: 100,
            h3_resolution: 8,
            marker_limit: crate::markers::SAMPLE_MARKER_LIMIT,
        }
    }
}

/// Validated application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub project_id: String,
    pub maps_api_key: String,
    pub location: DatasetLocation,
    pub max_results: u32,
    pub defaults: SearchDefaults,
}

impl AppConfig {
    pub const fn dataset(&self) -> DatasetKind {
        self.location.dataset
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug, Clone)]
pub struct AppConfigBuilder {
    project_id: String,
    maps_api_key: String,
    dataset: DatasetKind,
    location: Option<String>,
    max_results: u32,
    defaults: SearchDefaults,
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfigBuilder {
    pub fn new() -> Self {
        Self {
            project_id: String::new(),
            maps_api_key: String::new(),
            dataset: DatasetKind::Full,
            location: None,
            max_results: 100_000,
            defaults: SearchDefaults::default(),
        }
    }

    /// Start from the single-city sample tables.
    pub fn sample() -> Self {
        Self::new().dataset(DatasetKind::Sample)
    }

    /// Read `GCP_PROJECT_ID`, `MAPS_API_KEY`, `DATASET` and `PLACES_LOCATION`.
    pub fn from_env() -> Result<Self, PlaceQueryError> {
        let mut builder = Self::new();
        if let Ok(project) = env::var("GCP_PROJECT_ID") {
            builder.project_id = project;
        }
        if let Ok(key) = env::var("MAPS_API_KEY") {
            builder.maps_api_key = key;
        }
        if let Ok(dataset) = env::var("DATASET") {
            builder.dataset = dataset.parse().map_err(PlaceQueryError::Config)?;
        }
        builder.location = env::var("PLACES_LOCATION").ok();
        Ok(builder)
    }

    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn maps_api_key(mut self, key: impl Into<String>) -> Self {
        self.maps_api_key = key.into();
        self
    }

    pub fn dataset(mut self, dataset: DatasetKind) -> Self {
        self.dataset = dataset;
        self
    }

    /// Country name for the full dataset, city label for the sample dataset.
    pub fn location(mut self, label: impl Into<String>) -> Self {
        self.location = Some(label.into());
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn circle_radius(mut self, meters: u32) -> Self {
        self.defaults.circle_radius_m = meters;
        self
    }

    pub fn route_buffer(mut self, meters: u32) -> Self {
        self.defaults.route_buffer_m = meters;
        self
    }

    pub fn h3_resolution(mut self, resolution: u8) -> Self {
        self.defaults.h3_resolution = resolution.clamp(MIN_H3_RESOLUTION, MAX_H3_RESOLUTION);
        self
    }

    pub fn build(self) -> Result<AppConfig, PlaceQueryError> {
        if self.project_id.trim().is_empty() {
            return Err(PlaceQueryError::Config(
                "GCP project id must be set".to_string(),
            ));
        }
        let label = self.location.unwrap_or_default();
        let location = DatasetLocation::lookup(self.dataset, &label).ok_or_else(|| {
            PlaceQueryError::Config(format!(
                "Unknown location '{label}' for the {} dataset; expected one of: {}",
                self.dataset,
                DatasetLocation::labels(self.dataset).join(", ")
            ))
        })?;
        Ok(AppConfig {
            project_id: self.project_id,
            maps_api_key: self.maps_api_key,
            location,
            max_results: self.max_results,
            defaults: self.defaults,
        })
    }
}
