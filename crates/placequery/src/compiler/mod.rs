//! Assembles resolved geometry and filter fragments into one SQL statement.
//!
//! The statement's shape is picked by [`classify`], a pure function of the
//! mode flags. [`QueryCompiler::compile`] matches on the result exhaustively.
//! Compilation never fails: any missing input has already been turned into a
//! [`ResolveOutcome::Invalid`](crate::resolve::ResolveOutcome::Invalid) by the
//! resolvers.

use std::fmt;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::{
    catalog::{DatasetLocation, RegionDataType},
    filters::FilterSet,
    resolve::SearchParams,
    sql,
};

/// Modifier that suppresses small groups in aggregate results.
pub const AGGREGATION_THRESHOLD: &str = "WITH AGGREGATION_THRESHOLD";
/// Server-side table function used by function mode.
pub const DENSITY_FUNCTION: &str = "PLACES_COUNT_PER_H3";
/// Point-to-cell function applied by the density shape.
pub const H3_FROM_POINT: &str = "`carto-os.carto.H3_FROMGEOGPOINT`";

/// The six statement shapes. Exactly one is produced per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryShape {
    SimpleAggregate,
    MultiTypeBreakdown,
    BrandBreakdown,
    RegionBreakdown,
    H3Density,
    H3Function,
}

impl QueryShape {
    /// Shapes whose result is a table of counts rather than cells.
    pub const fn is_aggregate(self) -> bool {
        !matches!(self, Self::H3Density | Self::H3Function)
    }
}

impl fmt::Display for QueryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SimpleAggregate => "simple aggregate",
            Self::MultiTypeBreakdown => "multi-type breakdown",
            Self::BrandBreakdown => "brand breakdown",
            Self::RegionBreakdown => "region breakdown",
            Self::H3Density => "H3 density",
            Self::H3Function => "H3 function",
        };
        f.write_str(name)
    }
}

/// Everything [`classify`] looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapeInputs {
    pub h3_density: bool,
    pub function_mode: bool,
    /// More than one region name over a STRING region column.
    pub multi_region_string: bool,
    pub brand_query: bool,
    pub place_type_count: usize,
}

/// Pick the statement shape. The first matching rule wins.
pub const fn classify(inputs: ShapeInputs) -> QueryShape {
    if !inputs.h3_density {
        if inputs.multi_region_string {
            QueryShape::RegionBreakdown
        } else if inputs.brand_query {
            QueryShape::BrandBreakdown
        } else if inputs.place_type_count > 1 {
            QueryShape::MultiTypeBreakdown
        } else {
            QueryShape::SimpleAggregate
        }
    } else if !inputs.function_mode {
        QueryShape::H3Density
    } else {
        QueryShape::H3Function
    }
}

/// One compile call's inputs.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub params: &'a SearchParams,
    pub filters: &'a FilterSet,
    pub h3_density: bool,
    pub function_mode: bool,
    /// Cell resolution for both density shapes.
    pub h3_resolution: u8,
    /// Radius handed to the density function around `params.center`.
    pub radius_m: u32,
}

impl CompileRequest<'_> {
    pub fn shape_inputs(&self) -> ShapeInputs {
        ShapeInputs {
            h3_density: self.h3_density,
            function_mode: self.function_mode,
            multi_region_string: self
                .params
                .region
                .as_ref()
                .is_some_and(|r| r.is_multi_region() && r.data_type == RegionDataType::String),
            brand_query: self.filters.is_brand_query(),
            place_type_count: self.filters.place_types.len(),
        }
    }
}

/// A finished statement and the shape it was built as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub shape: QueryShape,
    pub sql: String,
}

/// Compiles statements against one dataset location.
#[derive(Debug, Clone)]
pub struct QueryCompiler<'a> {
    location: &'a DatasetLocation,
}

impl<'a> QueryCompiler<'a> {
    pub const fn new(location: &'a DatasetLocation) -> Self {
        Self { location }
    }

    #[instrument(skip_all, fields(location = %self.location.label))]
    pub fn compile(&self, request: &CompileRequest<'_>) -> CompiledQuery {
        let shape = classify(request.shape_inputs());
        let params = request.params;
        let sql = match shape {
            QueryShape::H3Function => self.function_query(request),
            QueryShape::H3Density => {
                let (from, where_clause) = self.from_and_where(request);
                density_query(
                    &params.search_area_var,
                    &from,
                    &where_clause,
                    request.h3_resolution,
                )
            }
            QueryShape::RegionBreakdown
            | QueryShape::BrandBreakdown
            | QueryShape::MultiTypeBreakdown
            | QueryShape::SimpleAggregate => {
                let (from, where_clause) = self.from_and_where(request);
                let select = aggregate_select(shape, request);
                let tail = match shape {
                    QueryShape::RegionBreakdown => "GROUP BY region_name ORDER BY count DESC",
                    QueryShape::BrandBreakdown => "GROUP BY brands.name ORDER BY count DESC",
                    _ => "",
                };
                sql::join_parts(&[
                    &params.search_area_var,
                    &format!("SELECT {AGGREGATION_THRESHOLD} {select}"),
                    &from,
                    &where_clause,
                    tail,
                ])
            }
        };
        debug!(%shape, bytes = sql.len(), "Compiled query");
        CompiledQuery { shape, sql }
    }

    /// `FROM` clause with any opening-hours UNNEST and brand join, plus the
    /// `WHERE` clause led by the geometry predicate.
    fn from_and_where(&self, request: &CompileRequest<'_>) -> (String, String) {
        let filters = request.filters;
        let mut from = format!("FROM `{}` places", self.location.places_table());
        if let Some(hours) = filters.opening_hours_clause() {
            from.push_str(&hours.unnest_clause);
        }
        if filters.is_brand_query() {
            from.push_str(&format!(
                ", UNNEST(places.brand_ids) AS brand_id LEFT JOIN `{}` brands ON brand_id = brands.id",
                self.location.brands_table()
            ));
        }

        let mut predicates = Vec::new();
        if !request.params.filter.is_empty() {
            predicates.push(request.params.filter.clone());
        }
        predicates.extend(filters.standard_predicates());
        (from, sql::where_clause(&predicates))
    }

    fn function_query(&self, request: &CompileRequest<'_>) -> String {
        let center = request.params.center;
        let mut fields = vec![
            format!(
                "'geography', ST_GEOGPOINT({}, {})",
                sql::number(center.lng),
                sql::number(center.lat)
            ),
            format!("'geography_radius', {}", request.radius_m),
            format!("'h3_resolution', {}", request.h3_resolution),
        ];
        fields.extend(request.filters.function_filters().json_fields());
        format!(
            "SELECT * FROM `{}.{DENSITY_FUNCTION}`(\n  JSON_OBJECT(\n    {}\n  )\n)",
            self.location.function_dataset(),
            fields.join(",\n    ")
        )
    }
}

fn aggregate_select(shape: QueryShape, request: &CompileRequest<'_>) -> String {
    match shape {
        QueryShape::RegionBreakdown => {
            let field = request
                .params
                .region
                .as_ref()
                .map_or("region", |r| r.field.as_str());
            format!("places.{field} AS region_name, COUNT(*) AS count")
        }
        QueryShape::BrandBreakdown => "brands.name, COUNT(places.id) AS count".to_string(),
        QueryShape::MultiTypeBreakdown => {
            let columns = request
                .filters
                .place_types
                .iter()
                .map(|t| {
                    format!(
                        "COUNTIF({} IN UNNEST(places.types)) AS {}_count",
                        sql::single_quoted(t),
                        column_alias(t)
                    )
                })
                .join(",\n  ");
            format!("{columns}, COUNT(*) AS total_count")
        }
        QueryShape::SimpleAggregate | QueryShape::H3Density | QueryShape::H3Function => {
            "COUNT(*) AS total_count".to_string()
        }
    }
}

/// Place types become column aliases; anything outside `[A-Za-z0-9_]` maps to `_`.
fn column_alias(place_type: &str) -> String {
    place_type
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Inner query buckets points per cell, the outer one folds the buckets into
/// two parallel arrays so the whole cell set arrives as a single row.
fn density_query(search_area_var: &str, from: &str, where_clause: &str, resolution: u8) -> String {
    let inner = [
        "SELECT".to_string(),
        format!("    {H3_FROM_POINT}(places.point, {resolution}) AS h3_index,"),
        "    COUNT(*) AS place_count".to_string(),
        format!("  {from}"),
        format!("  {where_clause}"),
        "  GROUP BY h3_index".to_string(),
    ]
    .into_iter()
    .filter(|line| !line.trim().is_empty())
    .join("\n");

    let body = format!(
        "SELECT\n  ARRAY_AGG(h3_index) AS indices,\n  ARRAY_AGG(place_count) AS counts\nFROM (\n  {inner}\n)\nWHERE h3_index IS NOT NULL"
    );
    if search_area_var.is_empty() {
        body
    } else {
        format!("{search_area_var}\n{body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::DatasetKind,
        filters::{OpeningHoursWindow, RatingRange},
        geometry::LatLng,
        resolve::RegionScope,
        sql::Identifier,
    };

    fn location(dataset: DatasetKind, label: &str) -> DatasetLocation {
        DatasetLocation::lookup(dataset, label).unwrap()
    }

    fn circle_params() -> SearchParams {
        SearchParams::new(
            "ST_DWITHIN(ST_GEOGPOINT(-73.57, 45.5), places.point, 1000)",
            LatLng::new(45.5, -73.57),
        )
    }

    fn request<'a>(params: &'a SearchParams, filters: &'a FilterSet) -> CompileRequest<'a> {
        CompileRequest {
            params,
            filters,
            h3_density: false,
            function_mode: false,
            h3_resolution: 8,
            radius_m: 5000,
        }
    }

    #[test]
    fn test_classify_precedence() {
        let base = ShapeInputs::default();
        assert_eq!(classify(base), QueryShape::SimpleAggregate);
        assert_eq!(
            classify(ShapeInputs { place_type_count: 1, ..base }),
            QueryShape::SimpleAggregate
        );
        assert_eq!(
            classify(ShapeInputs { place_type_count: 2, ..base }),
            QueryShape::MultiTypeBreakdown
        );
        assert_eq!(
            classify(ShapeInputs { brand_query: true, place_type_count: 3, ..base }),
            QueryShape::BrandBreakdown
        );
        assert_eq!(
            classify(ShapeInputs { multi_region_string: true, brand_query: true, ..base }),
            QueryShape::RegionBreakdown
        );
        assert_eq!(
            classify(ShapeInputs { h3_density: true, multi_region_string: true, brand_query: true, ..base }),
            QueryShape::H3Density
        );
        assert_eq!(
            classify(ShapeInputs { h3_density: true, function_mode: true, ..base }),
            QueryShape::H3Function
        );
    }

    #[test]
    fn test_simple_aggregate_circle() {
        let loc = location(DatasetKind::Full, "Canada");
        let params = circle_params();
        let filters = FilterSet::default();
        let query = QueryCompiler::new(&loc).compile(&request(&params, &filters));

        assert_eq!(query.shape, QueryShape::SimpleAggregate);
        assert_eq!(
            query.sql,
            "SELECT WITH AGGREGATION_THRESHOLD COUNT(*) AS total_count \
             FROM `places_insights___ca.places` places \
             WHERE ST_DWITHIN(ST_GEOGPOINT(-73.57, 45.5), places.point, 1000)"
        );
        assert!(!query.sql.contains("DECLARE"));
    }

    #[test]
    fn test_where_clause_follows_filter_order() {
        let loc = location(DatasetKind::Full, "Canada");
        let params = circle_params();
        let mut filters = FilterSet::new();
        filters.add_attribute("has_wifi").unwrap();
        filters.rating = RatingRange::from_inputs(4.0, f64::NAN);
        let query = QueryCompiler::new(&loc).compile(&request(&params, &filters));

        assert!(query.sql.ends_with(
            "WHERE ST_DWITHIN(ST_GEOGPOINT(-73.57, 45.5), places.point, 1000) \
             AND places.has_wifi = TRUE AND places.rating >= 4 \
             AND places.business_status = 'OPERATIONAL'"
        ));
    }

    #[test]
    fn test_multi_type_breakdown_columns() {
        let loc = location(DatasetKind::Full, "Canada");
        let params = circle_params();
        let mut filters = FilterSet::default();
        filters.add_place_type("cafe");
        filters.add_place_type("book_store");
        let query = QueryCompiler::new(&loc).compile(&request(&params, &filters));

        assert_eq!(query.shape, QueryShape::MultiTypeBreakdown);
        assert_eq!(query.sql.matches("COUNTIF(").count(), 2);
        assert!(query.sql.contains(
            "COUNTIF('cafe' IN UNNEST(places.types)) AS cafe_count,\n  \
             COUNTIF('book_store' IN UNNEST(places.types)) AS book_store_count, \
             COUNT(*) AS total_count"
        ));
        assert!(
            query
                .sql
                .contains("('cafe' IN UNNEST(places.types) OR 'book_store' IN UNNEST(places.types))")
        );
    }

    #[test]
    fn test_brand_breakdown_joins_brands() {
        let loc = location(DatasetKind::Sample, "New York City, United States");
        let params = circle_params();
        let mut filters = FilterSet::default();
        filters.add_brand_name("Starbucks");
        let query = QueryCompiler::new(&loc).compile(&request(&params, &filters));

        assert_eq!(query.shape, QueryShape::BrandBreakdown);
        assert!(query.sql.contains(
            "SELECT WITH AGGREGATION_THRESHOLD brands.name, COUNT(places.id) AS count \
             FROM `places_insights___us___sample.places_sample` places, \
             UNNEST(places.brand_ids) AS brand_id \
             LEFT JOIN `places_insights___us___sample.brands` brands ON brand_id = brands.id"
        ));
        assert!(query.sql.ends_with("GROUP BY brands.name ORDER BY count DESC"));
    }

    #[test]
    fn test_region_breakdown_groups_by_field() {
        let loc = location(DatasetKind::Full, "Canada");
        let field = Identifier::new("administrative_area_level_1_name").unwrap();
        let mut params = SearchParams::new(
            "places.administrative_area_level_1_name IN ('Ontario', 'Quebec')",
            LatLng::new(50.0, -80.0),
        );
        params.region = Some(RegionScope {
            field,
            data_type: RegionDataType::String,
            names: vec!["Ontario".into(), "Quebec".into()],
        });
        let filters = FilterSet::default();
        let query = QueryCompiler::new(&loc).compile(&request(&params, &filters));

        assert_eq!(query.shape, QueryShape::RegionBreakdown);
        assert!(query.sql.starts_with(
            "SELECT WITH AGGREGATION_THRESHOLD places.administrative_area_level_1_name AS region_name, COUNT(*) AS count"
        ));
        assert!(query.sql.ends_with("GROUP BY region_name ORDER BY count DESC"));
    }

    #[test]
    fn test_multi_region_array_falls_through() {
        let loc = location(DatasetKind::Full, "Canada");
        let mut params = SearchParams::new("EXISTS (...)", LatLng::new(50.0, -80.0));
        params.region = Some(RegionScope {
            field: Identifier::new("locality_names").unwrap(),
            data_type: RegionDataType::Array,
            names: vec!["Toronto".into(), "Ottawa".into()],
        });
        let filters = FilterSet::default();
        let query = QueryCompiler::new(&loc).compile(&request(&params, &filters));
        assert_eq!(query.shape, QueryShape::SimpleAggregate);
    }

    #[test]
    fn test_density_query_has_preamble_and_no_threshold() {
        let loc = location(DatasetKind::Full, "United Kingdom");
        let mut params = SearchParams::new("ST_CONTAINS(search_area, places.point)", LatLng::new(51.0, -1.0));
        params.search_area_var = "DECLARE search_area GEOGRAPHY; SET search_area = ST_GEOGFROMTEXT(\"\"\"POLYGON((-1 51, -1 52, 0 52, -1 51))\"\"\");".into();
        let mut filters = FilterSet::default();
        filters.opening_hours = OpeningHoursWindow::parse("monday", "09:00", "").unwrap();
        let req = CompileRequest {
            h3_density: true,
            h3_resolution: 7,
            ..request(&params, &filters)
        };
        let query = QueryCompiler::new(&loc).compile(&req);

        assert_eq!(query.shape, QueryShape::H3Density);
        assert!(query.sql.starts_with("DECLARE search_area GEOGRAPHY;"));
        assert!(!query.sql.contains("AGGREGATION_THRESHOLD"));
        assert!(query.sql.contains("`carto-os.carto.H3_FROMGEOGPOINT`(places.point, 7) AS h3_index"));
        assert!(query.sql.contains(
            "FROM `places_insights___gb.places` places, UNNEST(places.regular_opening_hours.monday) AS opening_period"
        ));
        assert!(query.sql.contains("ARRAY_AGG(h3_index) AS indices"));
        assert!(query.sql.ends_with("WHERE h3_index IS NOT NULL"));
    }

    #[test]
    fn test_function_query_excludes_brand_and_hours() {
        let loc = location(DatasetKind::Full, "United States");
        let params = SearchParams::new("", LatLng::new(40.75, -73.99));
        let mut filters = FilterSet::new();
        filters.add_brand_name("Starbucks");
        filters.brand_category = Some("Coffee".into());
        filters.opening_hours = OpeningHoursWindow::parse("monday", "09:00", "17:00").unwrap();
        filters.add_place_type("cafe");
        let req = CompileRequest {
            h3_density: true,
            function_mode: true,
            ..request(&params, &filters)
        };
        let query = QueryCompiler::new(&loc).compile(&req);

        assert_eq!(query.shape, QueryShape::H3Function);
        assert!(query.sql.starts_with("SELECT * FROM `places_insights___us.PLACES_COUNT_PER_H3`("));
        assert!(query.sql.contains("'geography', ST_GEOGPOINT(-73.99, 40.75)"));
        assert!(query.sql.contains("'geography_radius', 5000"));
        assert!(query.sql.contains("'h3_resolution', 8"));
        assert!(query.sql.contains(r#"'types', ["cafe"]"#));
        assert!(!query.sql.contains("brand"));
        assert!(!query.sql.contains("opening"));
        assert!(!query.sql.contains("AGGREGATION_THRESHOLD"));
    }

    #[test]
    fn test_column_alias() {
        assert_eq!(column_alias("ice cream shop"), "ice_cream_shop");
        assert_eq!(column_alias("cafe"), "cafe");
    }
}
