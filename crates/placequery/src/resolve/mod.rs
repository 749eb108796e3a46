//! Geometry parameter resolvers: one per search mode.
//!
//! Each turns the current geometry input into [`SearchParams`], the geometry
//! half of a query. Missing input is not an error; it yields
//! [`ResolveOutcome::Invalid`] with a message for the status line, and the
//! resolver stops before any network call. Network failures (routing) are
//! returned as errors.

use futures::future::join_all;
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

use crate::{
    catalog::{RegionDataType, RegionField},
    error::Result,
    filters::{self, FilterError},
    geometry::{LatLng, RouteEndpoints, SearchPolygon, Viewport},
    providers::{Geocoder, RouteProvider},
    sql::{self, Identifier},
};

pub const MISSING_CENTER: &str = "Click a location on the map to set the search center.";
pub const MISSING_POLYGON: &str = "Draw or paste a polygon to define the search area.";
pub const MISSING_REGION: &str = "Select a Region Type and enter at least one Region Name.";
pub const REGIONS_NOT_GEOCODED: &str = "Could not geocode any of the specified regions.";
pub const MISSING_ROUTE: &str = "Select both an origin and a destination for the route.";

/// The geometry half of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Boolean SQL expression over `places`; may be empty.
    pub filter: String,
    /// Anchor for result summaries.
    pub center: LatLng,
    /// `DECLARE ...; SET ...;` preamble, or empty.
    pub search_area_var: String,
    /// Set by the region resolver only.
    pub region: Option<RegionScope>,
    /// Area the map should fit to, when the resolver computed one.
    pub viewport: Option<Viewport>,
}

impl SearchParams {
    pub fn new(filter: impl Into<String>, center: LatLng) -> Self {
        Self {
            filter: filter.into(),
            center,
            search_area_var: String::new(),
            region: None,
            viewport: None,
        }
    }
}

/// The region column a search was scoped to and the names matched against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionScope {
    pub field: Identifier,
    pub data_type: RegionDataType,
    pub names: Vec<String>,
}

impl RegionScope {
    pub fn is_multi_region(&self) -> bool {
        self.names.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Ready(SearchParams),
    Invalid { message: String },
}

impl ResolveOutcome {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// A region column choice: a field name plus its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionColumn {
    pub field: Identifier,
    pub data_type: RegionDataType,
}

impl RegionColumn {
    /// Parse the `field|TYPE` selector encoding.
    pub fn parse_selector(value: &str) -> std::result::Result<Self, FilterError> {
        let (field, data_type) = RegionField::parse_selector(value)
            .ok_or_else(|| FilterError::InvalidIdentifier(value.to_string()))?;
        let field = Identifier::new(field.clone()).ok_or(FilterError::InvalidIdentifier(field))?;
        Ok(Self { field, data_type })
    }
}

impl TryFrom<&RegionField> for RegionColumn {
    type Error = FilterError;

    fn try_from(field: &RegionField) -> std::result::Result<Self, FilterError> {
        Ok(Self {
            field: Identifier::new(field.field)
                .ok_or_else(|| FilterError::InvalidIdentifier(field.field.to_string()))?,
            data_type: field.data_type,
        })
    }
}

/// `"new york"` → `"New York"`: lower-case everything, then upper-case the
/// first character of each space-separated word.
pub fn title_case(value: &str) -> String {
    value
        .to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .join(" ")
}

/// Distance-within predicate around a clicked center.
pub fn resolve_circle(center: Option<LatLng>, radius_m: u32) -> ResolveOutcome {
    let Some(center) = center else {
        return ResolveOutcome::invalid(MISSING_CENTER);
    };
    let filter = format!(
        "ST_DWITHIN(ST_GEOGPOINT({}, {}), places.point, {radius_m})",
        sql::number(center.lng),
        sql::number(center.lat)
    );
    ResolveOutcome::Ready(SearchParams::new(filter, center))
}

/// Containment in a declared `search_area` geography.
pub fn resolve_polygon(polygon: Option<&SearchPolygon>) -> ResolveOutcome {
    let Some(polygon) = polygon else {
        return ResolveOutcome::invalid(MISSING_POLYGON);
    };
    let mut params = SearchParams::new("ST_CONTAINS(search_area, places.point)", polygon.anchor());
    params.search_area_var = format!(
        "DECLARE search_area GEOGRAPHY; SET search_area = ST_GEOGFROMTEXT({});",
        sql::triple_quoted(&polygon.to_wkt())
    );
    params.viewport = Some(polygon.viewport());
    ResolveOutcome::Ready(params)
}

/// Membership in one or more named regions.
///
/// Names are title-cased and de-duplicated (tags first, then the typed
/// name), then geocoded concurrently as `"{name}, {location}"`. A name that
/// fails to geocode is logged and skipped; if none resolve the outcome is
/// invalid.
#[instrument(skip(geocoder, tags), fields(tags = tags.len()))]
pub async fn resolve_region<G: Geocoder>(
    geocoder: &G,
    column: Option<&RegionColumn>,
    typed_name: &str,
    tags: &[String],
    location_label: &str,
) -> ResolveOutcome {
    let typed = title_case(typed_name.trim());
    let Some(column) = column else {
        return ResolveOutcome::invalid(MISSING_REGION);
    };
    if typed.is_empty() && tags.is_empty() {
        return ResolveOutcome::invalid(MISSING_REGION);
    }

    let names: Vec<String> = tags
        .iter()
        .map(|tag| title_case(tag.trim()))
        .chain(std::iter::once(typed))
        .filter(|name| !name.is_empty())
        .unique()
        .collect();

    let Some(filter) = filters::region_filter(&column.field, column.data_type, &names) else {
        return ResolveOutcome::invalid(MISSING_REGION);
    };

    let lookups = names.iter().map(|name| async move {
        let address = format!("{name}, {location_label}");
        match geocoder.geocode(&address).await {
            Ok(viewport) => viewport,
            Err(e) => {
                warn!(region = %name, error = %e, "Geocoding failed");
                None
            }
        }
    });
    let viewports = join_all(lookups).await;
    let resolved = viewports.iter().flatten().count();
    let Some(bounds) = viewports.into_iter().flatten().reduce(Viewport::union) else {
        return ResolveOutcome::invalid(REGIONS_NOT_GEOCODED);
    };
    info!(names = names.len(), resolved, "Geocoded regions");

    let mut params = SearchParams::new(filter, bounds.center());
    params.viewport = Some(bounds);
    params.region = Some(RegionScope {
        field: column.field.clone(),
        data_type: column.data_type,
        names,
    });
    ResolveOutcome::Ready(params)
}

/// Distance-within predicate around a driving route.
#[instrument(skip(router))]
pub async fn resolve_route<R: RouteProvider>(
    router: &R,
    endpoints: RouteEndpoints,
    buffer_m: u32,
) -> Result<ResolveOutcome> {
    let Some((origin, destination)) = endpoints.both() else {
        return Ok(ResolveOutcome::invalid(MISSING_ROUTE));
    };
    let route = router.compute_route(origin, destination).await?;
    debug!(vertices = route.path.len(), "Route computed");

    let mut params = SearchParams::new(
        format!("ST_DWITHIN(route, places.point, {buffer_m})"),
        route.viewport.center(),
    );
    params.search_area_var = format!(
        "DECLARE route GEOGRAPHY; SET route = ST_GEOGFROMTEXT({});",
        sql::triple_quoted(&route.wkt)
    );
    params.viewport = Some(route.viewport);
    Ok(ResolveOutcome::Ready(params))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use placequery_warehouse::WarehouseError;

    use super::*;
    use crate::error::PlaceQueryError;

    #[derive(Default)]
    struct MapGeocoder {
        known: HashMap<String, Viewport>,
        failing: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl Geocoder for MapGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<Viewport>> {
            self.calls.lock().unwrap().push(address.to_string());
            if self.failing.iter().any(|f| f == address) {
                return Err(PlaceQueryError::Warehouse(WarehouseError::Geocoding {
                    status: "OVER_QUERY_LIMIT".into(),
                    message: "slow down".into(),
                }));
            }
            Ok(self.known.get(address).copied())
        }
    }

    struct FixedRoute(Option<placequery_warehouse::RouteGeometry>);

    impl RouteProvider for FixedRoute {
        async fn compute_route(
            &self,
            _origin: LatLng,
            _destination: LatLng,
        ) -> Result<placequery_warehouse::RouteGeometry> {
            self.0.clone().ok_or(PlaceQueryError::Warehouse(WarehouseError::NoRoutes))
        }
    }

    fn province() -> RegionColumn {
        RegionColumn::parse_selector("administrative_area_level_1_name|STRING").unwrap()
    }

    fn ready(outcome: ResolveOutcome) -> SearchParams {
        match outcome {
            ResolveOutcome::Ready(params) => params,
            ResolveOutcome::Invalid { message } => panic!("unexpected invalid outcome: {message}"),
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("new YORK"), "New York");
        assert_eq!(title_case("ontario"), "Ontario");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_circle_filter() {
        let params = ready(resolve_circle(Some(LatLng::new(45.50, -73.57)), 1000));
        assert_eq!(
            params.filter,
            "ST_DWITHIN(ST_GEOGPOINT(-73.57, 45.5), places.point, 1000)"
        );
        assert!(params.search_area_var.is_empty());
        assert_eq!(params.center, LatLng::new(45.5, -73.57));
    }

    #[test]
    fn test_circle_radius_and_center_in_filter() {
        for (lat, lng, radius) in [(0.0, 0.0, 1), (-33.86, 151.2, 250), (51.5, -0.12, 50_000)] {
            let params = ready(resolve_circle(Some(LatLng::new(lat, lng)), radius));
            assert!(params.filter.ends_with(&format!("places.point, {radius})")));
            assert!(params.filter.contains(&format!("ST_GEOGPOINT({lng}, {lat})")));
        }
    }

    #[test]
    fn test_circle_requires_center() {
        assert_eq!(resolve_circle(None, 1000), ResolveOutcome::invalid(MISSING_CENTER));
    }

    #[test]
    fn test_polygon_declares_search_area() {
        let polygon = SearchPolygon::from_wkt("POLYGON((-1 51, -1 52, 0 52, -1 51))").unwrap();
        let params = ready(resolve_polygon(Some(&polygon)));
        assert_eq!(params.filter, "ST_CONTAINS(search_area, places.point)");
        assert_eq!(
            params.search_area_var,
            r#"DECLARE search_area GEOGRAPHY; SET search_area = ST_GEOGFROMTEXT("""POLYGON((-1 51, -1 52, 0 52, -1 51))""");"#
        );
        assert_eq!(params.center, LatLng::new(51.0, -1.0));
        assert_eq!(resolve_polygon(None), ResolveOutcome::invalid(MISSING_POLYGON));
    }

    #[tokio::test]
    async fn test_region_dedups_and_unions() {
        let mut geocoder = MapGeocoder::default();
        geocoder.known.insert(
            "Ontario, Canada".into(),
            Viewport::new(LatLng::new(41.0, -95.0), LatLng::new(56.0, -74.0)),
        );
        geocoder.known.insert(
            "Quebec, Canada".into(),
            Viewport::new(LatLng::new(45.0, -79.0), LatLng::new(62.0, -57.0)),
        );
        let tags = vec!["Ontario".to_string(), "Quebec".to_string()];

        let params = ready(resolve_region(&geocoder, Some(&province()), "ontario", &tags, "Canada").await);

        assert_eq!(
            params.filter,
            "places.administrative_area_level_1_name IN ('Ontario', 'Quebec')"
        );
        let region = params.region.unwrap();
        assert!(region.is_multi_region());
        assert_eq!(region.names, vec!["Ontario", "Quebec"]);
        let bounds = params.viewport.unwrap();
        assert_eq!(bounds.low, LatLng::new(41.0, -95.0));
        assert_eq!(bounds.high, LatLng::new(62.0, -57.0));
        assert_eq!(geocoder.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_region_tags_are_title_cased_before_dedup() {
        let mut geocoder = MapGeocoder::default();
        geocoder.known.insert(
            "Ontario, Canada".into(),
            Viewport::new(LatLng::new(41.0, -95.0), LatLng::new(56.0, -74.0)),
        );
        let tags = vec!["ontario".to_string(), " ONTARIO ".to_string()];

        let params = ready(resolve_region(&geocoder, Some(&province()), "Ontario", &tags, "Canada").await);

        let region = params.region.unwrap();
        assert_eq!(region.names, vec!["Ontario"]);
        assert!(!region.is_multi_region());
        assert_eq!(
            params.filter,
            "places.administrative_area_level_1_name IN ('Ontario')"
        );
        assert_eq!(*geocoder.calls.lock().unwrap(), vec!["Ontario, Canada"]);
    }

    #[tokio::test]
    async fn test_region_single_geocode_failure_is_isolated() {
        let mut geocoder = MapGeocoder::default();
        geocoder.known.insert(
            "Ontario, Canada".into(),
            Viewport::new(LatLng::new(41.0, -95.0), LatLng::new(56.0, -74.0)),
        );
        geocoder.failing.push("Quebec, Canada".into());
        let tags = vec!["Quebec".to_string()];

        let params = ready(resolve_region(&geocoder, Some(&province()), "Ontario", &tags, "Canada").await);
        assert_eq!(params.viewport.unwrap().high, LatLng::new(56.0, -74.0));
        assert_eq!(params.region.unwrap().names.len(), 2);
    }

    #[tokio::test]
    async fn test_region_nothing_geocoded() {
        let geocoder = MapGeocoder::default();
        let outcome = resolve_region(&geocoder, Some(&province()), "Atlantis", &[], "Canada").await;
        assert_eq!(outcome, ResolveOutcome::invalid(REGIONS_NOT_GEOCODED));
    }

    #[tokio::test]
    async fn test_region_missing_inputs_skip_geocoding() {
        let geocoder = MapGeocoder::default();
        assert_eq!(
            resolve_region(&geocoder, None, "Ontario", &[], "Canada").await,
            ResolveOutcome::invalid(MISSING_REGION)
        );
        assert_eq!(
            resolve_region(&geocoder, Some(&province()), "   ", &[], "Canada").await,
            ResolveOutcome::invalid(MISSING_REGION)
        );
        assert!(geocoder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_route_declares_route_variable() {
        let route = placequery_warehouse::RouteGeometry {
            wkt: "LINESTRING(-0.12 51.5, -0.1 51.52)".into(),
            path: vec![LatLng::new(51.5, -0.12), LatLng::new(51.52, -0.1)],
            viewport: Viewport::new(LatLng::new(51.5, -0.12), LatLng::new(51.52, -0.1)),
        };
        let endpoints = RouteEndpoints {
            origin: Some(LatLng::new(51.5, -0.12)),
            destination: Some(LatLng::new(51.52, -0.1)),
        };
        let params = ready(resolve_route(&FixedRoute(Some(route)), endpoints, 100).await.unwrap());
        assert_eq!(params.filter, "ST_DWITHIN(route, places.point, 100)");
        assert_eq!(
            params.search_area_var,
            r#"DECLARE route GEOGRAPHY; SET route = ST_GEOGFROMTEXT("""LINESTRING(-0.12 51.5, -0.1 51.52)""");"#
        );
    }

    #[tokio::test]
    async fn test_route_requires_both_endpoints_and_propagates_errors() {
        let endpoints = RouteEndpoints {
            origin: Some(LatLng::new(51.5, -0.12)),
            destination: None,
        };
        assert_eq!(
            resolve_route(&FixedRoute(None), endpoints, 100).await.unwrap(),
            ResolveOutcome::invalid(MISSING_ROUTE)
        );
        let endpoints = RouteEndpoints {
            destination: Some(LatLng::new(51.52, -0.1)),
            ..endpoints
        };
        assert!(resolve_route(&FixedRoute(None), endpoints, 100).await.is_err());
    }

    #[test]
    fn test_catalog_fields_are_valid_columns() {
        for field in crate::catalog::region_fields("us") {
            assert!(RegionColumn::try_from(field).is_ok());
        }
    }

    #[test]
    fn test_region_selector_validation() {
        assert!(RegionColumn::parse_selector("locality_names|ARRAY").is_ok());
        assert!(RegionColumn::parse_selector("locality names|ARRAY").is_err());
        assert!(RegionColumn::parse_selector("locality_names").is_err());
    }
}
