//! Session state for one search form.
//!
//! Every edit is a [`StateChange`] passed to [`ApplicationRunState::apply`],
//! which is the only place inputs are mutated. Each call clears the cached
//! query text and, when the change is accepted, notifies observers.

use std::{fmt, str::FromStr};

use tracing::{debug, warn};

use crate::{
    config::{FUNCTION_MAX_H3_RESOLUTION, MAX_H3_RESOLUTION, MIN_H3_RESOLUTION, SearchDefaults},
    error::{PlaceQueryError, Result},
    filters::{BusinessStatus, FilterSet, OpeningHoursWindow, RatingRange},
    geometry::{GeometryError, LatLng, RouteEndpoints, SearchPolygon},
    resolve::{RegionColumn, title_case},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Circle,
    Polygon,
    Region,
    Route,
    /// Density computed by the server-side function around a clicked center.
    H3Function,
}

impl SearchMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Circle => "circle-search",
            Self::Polygon => "polygon-search",
            Self::Region => "region-search",
            Self::Route => "route-search",
            Self::H3Function => "h3-function",
        }
    }

    pub const fn is_function(self) -> bool {
        matches!(self, Self::H3Function)
    }
}

impl FromStr for SearchMode {
    type Err = PlaceQueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "circle-search" | "circle" => Ok(Self::Circle),
            "polygon-search" | "polygon" => Ok(Self::Polygon),
            "region-search" | "region" => Ok(Self::Region),
            "route-search" | "route" => Ok(Self::Route),
            "h3-function" | "function" => Ok(Self::H3Function),
            other => Err(PlaceQueryError::Config(format!(
                "Invalid demo type selected: '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user edit.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// Switch mode; resets every input to the mode's defaults.
    SetMode(SearchMode),
    /// Back to defaults without changing mode.
    ResetInputs,
    SetCenter(LatLng),
    SetRadius(u32),
    DrawPolygon(Vec<LatLng>),
    PasteWkt(String),
    MovePolygonVertex { index: usize, position: LatLng },
    InsertPolygonVertex { index: usize, position: LatLng },
    SetRegionColumn(Option<RegionColumn>),
    SetRegionInput(String),
    /// Moves the typed region name (or the given name) into the tag list.
    AddRegionTag(String),
    RemoveRegionTag(String),
    SetOrigin(Option<LatLng>),
    SetDestination(Option<LatLng>),
    SetRouteBuffer(u32),
    AddPlaceType(String),
    RemovePlaceType(String),
    SetPrimaryTypeOnly(bool),
    SetAttribute { name: String, enabled: bool },
    SetRating(RatingRange),
    SetBusinessStatus(Option<BusinessStatus>),
    AddBrandName(String),
    RemoveBrandName(String),
    SetBrandCategory(Option<String>),
    SetOpeningHours(Option<OpeningHoursWindow>),
    SetH3Density(bool),
    SetH3Resolution(u8),
}

pub type Observer = Box<dyn Fn(&StateChange, &ApplicationRunState) + Send + Sync>;

/// Geometry, filter selections and the cached query for the current session.
pub struct ApplicationRunState {
    defaults: SearchDefaults,
    mode: SearchMode,
    center: Option<LatLng>,
    radius_m: u32,
    polygon: Option<SearchPolygon>,
    wkt_input: String,
    wkt_invalid: bool,
    region_column: Option<RegionColumn>,
    region_input: String,
    region_tags: Vec<String>,
    route: RouteEndpoints,
    route_buffer_m: u32,
    filters: FilterSet,
    h3_density: bool,
    h3_resolution: u8,
    last_query: Option<String>,
    observers: Vec<Observer>,
}

impl fmt::Debug for ApplicationRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationRunState")
            .field("mode", &self.mode)
            .field("center", &self.center)
            .field("radius_m", &self.radius_m)
            .field("polygon", &self.polygon)
            .field("region_tags", &self.region_tags)
            .field("route", &self.route)
            .field("filters", &self.filters)
            .field("h3_density", &self.h3_density)
            .field("h3_resolution", &self.h3_resolution)
            .field("last_query", &self.last_query.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for ApplicationRunState {
    fn default() -> Self {
        Self::new(SearchDefaults::default())
    }
}

impl ApplicationRunState {
    pub fn new(defaults: SearchDefaults) -> Self {
        let mut state = Self {
            defaults,
            mode: SearchMode::Circle,
            center: None,
            radius_m: defaults.circle_radius_m,
            polygon: None,
            wkt_input: String::new(),
            wkt_invalid: false,
            region_column: None,
            region_input: String::new(),
            region_tags: Vec::new(),
            route: RouteEndpoints::default(),
            route_buffer_m: defaults.route_buffer_m,
            filters: FilterSet::new(),
            h3_density: false,
            h3_resolution: defaults.h3_resolution,
            last_query: None,
            observers: Vec::new(),
        };
        state.reset_inputs();
        state
    }

    /// Register a callback run after every accepted change.
    pub fn subscribe(&mut self, observer: impl Fn(&StateChange, &Self) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Apply one edit. The cached query is cleared even when the edit is rejected.
    pub fn apply(&mut self, change: StateChange) -> Result<()> {
        self.invalidate_query();
        self.transition(&change)?;
        debug!(?change, "State changed");
        for observer in &self.observers {
            observer(&change, self);
        }
        Ok(())
    }

    fn transition(&mut self, change: &StateChange) -> Result<()> {
        match change {
            StateChange::SetMode(mode) => {
                self.mode = *mode;
                self.reset_inputs();
            }
            StateChange::ResetInputs => self.reset_inputs(),
            StateChange::SetCenter(center) => self.center = Some(finite_point(*center)?),
            StateChange::SetRadius(radius) => self.radius_m = *radius,
            StateChange::DrawPolygon(vertices) => {
                let polygon = SearchPolygon::from_vertices(vertices.clone())?;
                self.wkt_input = polygon.to_wkt();
                self.wkt_invalid = false;
                self.polygon = Some(polygon);
            }
            StateChange::PasteWkt(text) => {
                self.wkt_input.clone_from(text);
                match SearchPolygon::from_wkt(text) {
                    Ok(polygon) => {
                        self.wkt_invalid = false;
                        self.polygon = Some(polygon);
                    }
                    Err(e) => {
                        warn!(error = %e, "Rejected pasted polygon");
                        self.wkt_invalid = true;
                        return Err(e.into());
                    }
                }
            }
            StateChange::MovePolygonVertex { index, position } => {
                self.polygon_mut()?.set_vertex(*index, *position)?;
                self.sync_wkt();
            }
            StateChange::InsertPolygonVertex { index, position } => {
                self.polygon_mut()?.insert_vertex(*index, *position)?;
                self.sync_wkt();
            }
            StateChange::SetRegionColumn(column) => self.region_column.clone_from(column),
            StateChange::SetRegionInput(text) => self.region_input.clone_from(text),
            StateChange::AddRegionTag(name) => {
                let source = if name.trim().is_empty() {
                    std::mem::take(&mut self.region_input)
                } else {
                    name.clone()
                };
                let tag = title_case(source.trim());
                if !tag.is_empty() && !self.region_tags.contains(&tag) {
                    self.region_tags.push(tag);
                }
            }
            StateChange::RemoveRegionTag(name) => self.region_tags.retain(|t| t != name),
            StateChange::SetOrigin(origin) => {
                self.route.origin = origin.map(finite_point).transpose()?;
            }
            StateChange::SetDestination(destination) => {
                self.route.destination = destination.map(finite_point).transpose()?;
            }
            StateChange::SetRouteBuffer(buffer) => self.route_buffer_m = *buffer,
            StateChange::AddPlaceType(place_type) => self.filters.add_place_type(place_type),
            StateChange::RemovePlaceType(place_type) => {
                self.filters.place_types.retain(|t| t != place_type);
            }
            StateChange::SetPrimaryTypeOnly(primary) => self.filters.primary_type_only = *primary,
            StateChange::SetAttribute { name, enabled } => {
                if *enabled {
                    self.filters.add_attribute(name)?;
                } else {
                    self.filters.attributes.retain(|a| a.as_str() != name);
                }
            }
            StateChange::SetRating(range) => self.filters.rating = range.finite(),
            StateChange::SetBusinessStatus(status) => self.filters.business_status = *status,
            StateChange::AddBrandName(name) => self.filters.add_brand_name(name),
            StateChange::RemoveBrandName(name) => self.filters.brand_names.retain(|b| b != name),
            StateChange::SetBrandCategory(category) => {
                self.filters.brand_category = category.clone().filter(|c| !c.is_empty());
            }
            StateChange::SetOpeningHours(window) => self.filters.opening_hours = *window,
            StateChange::SetH3Density(enabled) => {
                // The density function always produces cells.
                self.h3_density = *enabled || self.mode.is_function();
            }
            StateChange::SetH3Resolution(resolution) => {
                self.h3_resolution = (*resolution).clamp(MIN_H3_RESOLUTION, self.max_h3_resolution());
            }
        }
        Ok(())
    }

    fn reset_inputs(&mut self) {
        let function = self.mode.is_function();
        self.radius_m = if function {
            self.defaults.function_radius_m
        } else {
            self.defaults.circle_radius_m
        };
        self.center = None;
        self.polygon = None;
        self.wkt_input.clear();
        self.wkt_invalid = false;
        self.region_input.clear();
        self.region_tags.clear();
        self.route = RouteEndpoints::default();
        self.route_buffer_m = self.defaults.route_buffer_m;
        self.filters = FilterSet::new();
        self.h3_density = function;
        self.h3_resolution = self
            .defaults
            .h3_resolution
            .clamp(MIN_H3_RESOLUTION, self.max_h3_resolution());
    }

    fn polygon_mut(&mut self) -> Result<&mut SearchPolygon> {
        self.polygon.as_mut().ok_or_else(|| {
            GeometryError::InvalidWkt("no polygon to edit".to_string()).into()
        })
    }

    fn sync_wkt(&mut self) {
        if let Some(polygon) = &self.polygon {
            self.wkt_input = polygon.to_wkt();
        }
    }

    /// Drop the cached query. Calling it again changes nothing.
    pub fn invalidate_query(&mut self) {
        self.last_query = None;
    }

    /// Cache the text of a query that just executed successfully.
    pub fn record_query(&mut self, sql: impl Into<String>) {
        self.last_query = Some(sql.into());
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub const fn max_h3_resolution(&self) -> u8 {
        if self.mode.is_function() {
            FUNCTION_MAX_H3_RESOLUTION
        } else {
            MAX_H3_RESOLUTION
        }
    }

    pub const fn mode(&self) -> SearchMode {
        self.mode
    }

    pub const fn center(&self) -> Option<LatLng> {
        self.center
    }

    pub const fn radius_m(&self) -> u32 {
        self.radius_m
    }

    pub const fn polygon(&self) -> Option<&SearchPolygon> {
        self.polygon.as_ref()
    }

    pub fn wkt_input(&self) -> &str {
        &self.wkt_input
    }

    /// The pasted WKT was rejected and should be flagged in the form.
    pub const fn wkt_invalid(&self) -> bool {
        self.wkt_invalid
    }

    pub const fn region_column(&self) -> Option<&RegionColumn> {
        self.region_column.as_ref()
    }

    pub fn region_input(&self) -> &str {
        &self.region_input
    }

    pub fn region_tags(&self) -> &[String] {
        &self.region_tags
    }

    pub const fn route(&self) -> RouteEndpoints {
        self.route
    }

    pub const fn route_buffer_m(&self) -> u32 {
        self.route_buffer_m
    }

    pub const fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub const fn h3_density(&self) -> bool {
        self.h3_density
    }

    pub const fn h3_resolution(&self) -> u8 {
        self.h3_resolution
    }

    pub const fn defaults(&self) -> &SearchDefaults {
        &self.defaults
    }
}

/// Map clicks must land on a real coordinate.
fn finite_point(point: LatLng) -> Result<LatLng> {
    if point.is_finite() {
        Ok(point)
    } else {
        Err(GeometryError::InvalidCoordinate(point.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[test]
    fn test_any_change_invalidates_query() {
        let mut state = ApplicationRunState::default();
        state.record_query("SELECT 1");
        state.apply(StateChange::SetRadius(250)).unwrap();
        assert!(state.last_query().is_none());

        state.record_query("SELECT 1");
        assert!(state.apply(StateChange::PasteWkt("nonsense".into())).is_err());
        assert!(state.last_query().is_none());
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let mut state = ApplicationRunState::default();
        state.record_query("SELECT 1");
        state.invalidate_query();
        let once = format!("{state:?}");
        state.invalidate_query();
        assert_eq!(format!("{state:?}"), once);
        assert!(state.last_query().is_none());
    }

    #[test]
    fn test_paste_valid_and_invalid_wkt() {
        let mut state = ApplicationRunState::default();
        state.apply(StateChange::SetMode(SearchMode::Polygon)).unwrap();
        state
            .apply(StateChange::PasteWkt("POLYGON((-1 51, -1 52, 0 52, -1 51))".into()))
            .unwrap();
        assert_eq!(state.polygon().unwrap().vertices().len(), 4);
        assert!(!state.wkt_invalid());

        let before = state.polygon().cloned();
        assert!(state.apply(StateChange::PasteWkt("POLYGON((0 0, 1 1))".into())).is_err());
        assert!(state.wkt_invalid());
        assert_eq!(state.polygon().cloned(), before);
    }

    #[test]
    fn test_vertex_edit_updates_wkt() {
        let mut state = ApplicationRunState::default();
        state
            .apply(StateChange::DrawPolygon(vec![
                LatLng::new(0.0, 0.0),
                LatLng::new(0.0, 1.0),
                LatLng::new(1.0, 1.0),
            ]))
            .unwrap();
        state
            .apply(StateChange::MovePolygonVertex {
                index: 2,
                position: LatLng::new(2.0, 2.0),
            })
            .unwrap();
        assert_eq!(state.wkt_input(), "POLYGON((0 0, 1 0, 2 2, 0 0))");
    }

    #[test]
    fn test_non_finite_points_rejected() {
        let mut state = ApplicationRunState::default();
        state.apply(StateChange::SetCenter(LatLng::new(45.5, -73.57))).unwrap();

        let result = state.apply(StateChange::SetCenter(LatLng::new(f64::NAN, -73.57)));
        assert!(matches!(
            result,
            Err(PlaceQueryError::Geometry(GeometryError::InvalidCoordinate(_)))
        ));
        let result = state.apply(StateChange::SetCenter(LatLng::new(45.5, f64::INFINITY)));
        assert!(result.is_err());
        assert_eq!(state.center(), Some(LatLng::new(45.5, -73.57)));

        assert!(state
            .apply(StateChange::SetOrigin(Some(LatLng::new(f64::NAN, 0.0))))
            .is_err());
        assert!(state
            .apply(StateChange::SetDestination(Some(LatLng::new(0.0, f64::NEG_INFINITY))))
            .is_err());
        assert!(state.route().origin.is_none());
        assert!(state.route().destination.is_none());
        state.apply(StateChange::SetOrigin(None)).unwrap();
    }

    #[test]
    fn test_infinite_rating_is_dropped() {
        let mut state = ApplicationRunState::default();
        state
            .apply(StateChange::SetRating(RatingRange {
                min: Some(f64::INFINITY),
                max: Some(4.0),
            }))
            .unwrap();
        assert_eq!(
            state.filters().rating,
            RatingRange {
                min: None,
                max: Some(4.0)
            }
        );
    }

    #[test]
    fn test_mode_switch_resets_inputs() {
        let mut state = ApplicationRunState::default();
        state.apply(StateChange::SetCenter(LatLng::new(1.0, 1.0))).unwrap();
        state.apply(StateChange::AddPlaceType("cafe".into())).unwrap();
        state.apply(StateChange::SetPrimaryTypeOnly(true)).unwrap();
        state.apply(StateChange::AddRegionTag("ontario".into())).unwrap();
        state.apply(StateChange::SetH3Resolution(11)).unwrap();

        state.apply(StateChange::SetMode(SearchMode::H3Function)).unwrap();
        assert!(state.center().is_none());
        assert!(state.filters().place_types.is_empty());
        assert!(!state.filters().primary_type_only);
        assert!(state.region_tags().is_empty());
        assert_eq!(state.radius_m(), 5000);
        assert!(state.h3_density());
        assert_eq!(state.h3_resolution(), 8);

        state.apply(StateChange::SetH3Density(false)).unwrap();
        assert!(state.h3_density());
        state.apply(StateChange::SetH3Resolution(12)).unwrap();
        assert_eq!(state.h3_resolution(), 8);

        state.apply(StateChange::SetMode(SearchMode::Route)).unwrap();
        assert_eq!(state.radius_m(), 1000);
        assert_eq!(state.route_buffer_m(), 100);
        assert!(!state.h3_density());
        state.apply(StateChange::SetH3Resolution(12)).unwrap();
        assert_eq!(state.h3_resolution(), 12);
        state.apply(StateChange::SetH3Resolution(0)).unwrap();
        assert_eq!(state.h3_resolution(), 1);
    }

    #[test]
    fn test_region_tags_are_title_cased() {
        let mut state = ApplicationRunState::default();
        state.apply(StateChange::AddRegionTag("new york".into())).unwrap();
        state.apply(StateChange::SetRegionInput("  NEW YORK ".into())).unwrap();
        state.apply(StateChange::AddRegionTag(String::new())).unwrap();
        state.apply(StateChange::AddRegionTag("   ".into())).unwrap();
        assert_eq!(state.region_tags(), ["New York"]);
        assert!(state.region_input().is_empty());
    }

    #[test]
    fn test_observers_see_accepted_changes() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut state = ApplicationRunState::default();
        let counter = Arc::clone(&seen);
        state.subscribe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        state.apply(StateChange::SetRadius(10)).unwrap();
        assert!(
            state
                .apply(StateChange::SetAttribute {
                    name: "bad name".into(),
                    enabled: true
                })
                .is_err()
        );
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("h3-function".parse::<SearchMode>().unwrap(), SearchMode::H3Function);
        assert!("bogus".parse::<SearchMode>().is_err());
    }
}
