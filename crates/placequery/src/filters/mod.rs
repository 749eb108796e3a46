//! Attribute filters that sit alongside the search geometry.
//!
//! A [`FilterSet`] holds the user's current selections. Each builder function in
//! this module is pure and turns one selection into zero or one SQL predicate.
//! The order of [`FilterSet::standard_predicates`] is fixed: place types,
//! boolean attributes, rating, business status, brand names, brand category,
//! opening hours.
//!
//! Function-mode queries take a restricted view, [`FunctionFilters`], which
//! has no brand or opening-hours fields at all.

use std::{fmt, str::FromStr};

use chrono::{NaiveTime, Weekday};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub use error::FilterError;
use error::Result;

use crate::{
    catalog::RegionDataType,
    sql::{self, Identifier},
};

/// Operating state of a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessStatus {
    #[default]
    Operational,
    ClosedTemporarily,
    ClosedPermanently,
}

impl BusinessStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Operational => "OPERATIONAL",
            Self::ClosedTemporarily => "CLOSED_TEMPORARILY",
            Self::ClosedPermanently => "CLOSED_PERMANENTLY",
        }
    }
}

impl FromStr for BusinessStatus {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPERATIONAL" => Ok(Self::Operational),
            "CLOSED_TEMPORARILY" => Ok(Self::ClosedTemporarily),
            "CLOSED_PERMANENTLY" => Ok(Self::ClosedPermanently),
            other => Err(FilterError::UnknownBusinessStatus(other.to_string())),
        }
    }
}

impl fmt::Display for BusinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive rating bounds; either side may be unset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RatingRange {
    /// Build from raw numeric inputs where `NaN` means "not entered".
    /// Infinite inputs are treated as not entered too.
    pub fn from_inputs(min: f64, max: f64) -> Self {
        Self {
            min: Some(min).filter(|v| v.is_finite()),
            max: Some(max).filter(|v| v.is_finite()),
        }
    }

    /// Drop any bound that is not a finite number.
    #[must_use]
    pub fn finite(self) -> Self {
        Self {
            min: self.min.filter(|v| v.is_finite()),
            max: self.max.filter(|v| v.is_finite()),
        }
    }

    pub const fn is_unset(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Day plus optional start/end clock times a place must be open across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHoursWindow {
    pub day: Weekday,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl OpeningHoursWindow {
    /// Parse form inputs: a day name and `HH:MM` (or `HH:MM:SS`) times, blanks meaning unset.
    ///
    /// Returns `Ok(None)` when no day is chosen.
    pub fn parse(day: &str, start: &str, end: &str) -> Result<Option<Self>> {
        let day = day.trim();
        if day.is_empty() {
            return Ok(None);
        }
        let day = Weekday::from_str(day).map_err(|_| FilterError::UnknownDay(day.to_string()))?;
        Ok(Some(Self {
            day,
            start: parse_clock(start)?,
            end: parse_clock(end)?,
        }))
    }

    /// True when at least one bound is set; a bare day contributes nothing.
    pub const fn is_effective(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

fn parse_clock(value: &str) -> Result<Option<NaiveTime>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map(Some)
        .map_err(|_| FilterError::InvalidTime(value.to_string()))
}

const fn weekday_column(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// The two halves of an opening-hours filter: a FROM-clause UNNEST and a WHERE predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningHoursClause {
    pub unnest_clause: String,
    pub where_clause: String,
}

/// Every filter selection for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub place_types: Vec<String>,
    /// Match only `primary_type` instead of any entry of `types`.
    pub primary_type_only: bool,
    pub attributes: Vec<Identifier>,
    pub rating: RatingRange,
    /// `None` means any status.
    pub business_status: Option<BusinessStatus>,
    pub brand_names: Vec<String>,
    pub brand_category: Option<String>,
    pub opening_hours: Option<OpeningHoursWindow>,
}

impl FilterSet {
    /// Defaults matching a fresh search form: operational places only.
    pub fn new() -> Self {
        Self {
            business_status: Some(BusinessStatus::Operational),
            ..Default::default()
        }
    }

    /// Add a boolean attribute such as `has_wifi`; the name becomes a column reference.
    pub fn add_attribute(&mut self, name: &str) -> Result<()> {
        let attr = Identifier::new(name)
            .ok_or_else(|| FilterError::InvalidIdentifier(name.to_string()))?;
        if !self.attributes.contains(&attr) {
            self.attributes.push(attr);
        }
        Ok(())
    }

    pub fn add_place_type(&mut self, place_type: &str) {
        let place_type = place_type.trim();
        if !place_type.is_empty() && !self.place_types.iter().any(|t| t == place_type) {
            self.place_types.push(place_type.to_string());
        }
    }

    pub fn add_brand_name(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !self.brand_names.iter().any(|b| b == name) {
            self.brand_names.push(name.to_string());
        }
    }

    /// Brand name or brand category selected; the query needs the brands join.
    pub fn is_brand_query(&self) -> bool {
        !self.brand_names.is_empty() || self.brand_category.is_some()
    }

    /// Opening-hours clause, present only when a day and at least one time are set.
    pub fn opening_hours_clause(&self) -> Option<OpeningHoursClause> {
        self.opening_hours.as_ref().and_then(opening_hours_filter)
    }

    /// All predicates for the standard (non-function) query path, in splice order.
    pub fn standard_predicates(&self) -> Vec<String> {
        let mut predicates = Vec::new();
        predicates.extend(place_type_filter(&self.place_types, self.primary_type_only));
        predicates.extend(attribute_filters(&self.attributes));
        predicates.extend(rating_filter(self.rating));
        predicates.extend(self.business_status.map(business_status_filter));
        predicates.extend(brand_name_filter(&self.brand_names));
        predicates.extend(self.brand_category.as_deref().and_then(brand_category_filter));
        predicates.extend(self.opening_hours_clause().map(|c| c.where_clause));
        predicates
    }

    /// The subset of selections the server-side density function understands.
    pub fn function_filters(&self) -> FunctionFilters {
        FunctionFilters {
            place_types: self.place_types.clone(),
            primary_type_only: self.primary_type_only,
            attributes: self.attributes.clone(),
            rating: self.rating,
            business_status: self.business_status,
        }
    }
}

/// Filters accepted by the density table function. Brand and opening-hours
/// selections have no representation here, so they cannot leak into a
/// function-mode query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionFilters {
    pub place_types: Vec<String>,
    pub primary_type_only: bool,
    pub attributes: Vec<Identifier>,
    pub rating: RatingRange,
    pub business_status: Option<BusinessStatus>,
}

impl FunctionFilters {
    /// `'key', value` entries for the function's `JSON_OBJECT` argument.
    pub fn json_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if let Some(status) = self.business_status {
            fields.push(format!(
                "'business_status', [{}]",
                sql::single_quoted(status.as_str())
            ));
        }
        if !self.place_types.is_empty() {
            let key = if self.primary_type_only {
                "primary_type"
            } else {
                "types"
            };
            fields.push(format!(
                "'{key}', [{}]",
                sql::double_quoted_list(&self.place_types)
            ));
        }
        let rating = self.rating.finite();
        if let Some(min) = rating.min {
            fields.push(format!("'min_rating', {}", sql::number(min)));
        }
        if let Some(max) = rating.max {
            fields.push(format!("'max_rating', {}", sql::number(max)));
        }
        fields.extend(self.attributes.iter().map(|attr| format!("'{attr}', TRUE")));
        fields
    }
}

/// `places.primary_type IN (...)`, or an OR of `'t' IN UNNEST(places.types)`.
pub fn place_type_filter(types: &[String], primary_only: bool) -> Option<String> {
    if types.is_empty() {
        return None;
    }
    if primary_only {
        return Some(format!(
            "places.primary_type IN ({})",
            sql::single_quoted_list(types)
        ));
    }
    let any_of = types
        .iter()
        .map(|t| format!("{} IN UNNEST(places.types)", sql::single_quoted(t)))
        .join(" OR ");
    Some(if types.len() > 1 {
        format!("({any_of})")
    } else {
        any_of
    })
}

/// One `places.<attr> = TRUE` per attribute.
pub fn attribute_filters(attributes: &[Identifier]) -> Vec<String> {
    attributes
        .iter()
        .map(|attr| format!("places.{attr} = TRUE"))
        .collect()
}

pub fn rating_filter(range: RatingRange) -> Option<String> {
    let range = range.finite();
    match (range.min, range.max) {
        (Some(min), Some(max)) => Some(format!(
            "places.rating BETWEEN {} AND {}",
            sql::number(min),
            sql::number(max)
        )),
        (Some(min), None) => Some(format!("places.rating >= {}", sql::number(min))),
        (None, Some(max)) => Some(format!("places.rating <= {}", sql::number(max))),
        (None, None) => None,
    }
}

pub fn business_status_filter(status: BusinessStatus) -> String {
    format!(
        "places.business_status = {}",
        sql::single_quoted(status.as_str())
    )
}

pub fn opening_hours_filter(window: &OpeningHoursWindow) -> Option<OpeningHoursClause> {
    if !window.is_effective() {
        return None;
    }
    let unnest_clause = format!(
        ", UNNEST(places.regular_opening_hours.{}) AS opening_period",
        weekday_column(window.day)
    );
    let mut conditions = Vec::with_capacity(2);
    if let Some(start) = window.start {
        conditions.push(format!(
            "opening_period.start_time <= TIME {}",
            sql::single_quoted(&start.format("%H:%M:%S").to_string())
        ));
    }
    if let Some(end) = window.end {
        conditions.push(format!(
            "opening_period.end_time >= TIME {}",
            sql::single_quoted(&end.format("%H:%M:%S").to_string())
        ));
    }
    Some(OpeningHoursClause {
        unnest_clause,
        where_clause: conditions.join(" AND "),
    })
}

pub fn brand_name_filter(names: &[String]) -> Option<String> {
    (!names.is_empty()).then(|| format!("brands.name IN ({})", sql::double_quoted_list(names)))
}

pub fn brand_category_filter(category: &str) -> Option<String> {
    (!category.is_empty()).then(|| format!("brands.category = {}", sql::double_quoted(category)))
}

/// Region membership: `IN (...)` for a STRING column, an EXISTS over the
/// unnested array for an ARRAY column.
pub fn region_filter(
    field: &Identifier,
    data_type: RegionDataType,
    names: &[String],
) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let list = sql::single_quoted_list(names);
    Some(match data_type {
        RegionDataType::String => format!("places.{field} IN ({list})"),
        RegionDataType::Array => format!(
            "EXISTS (SELECT 1 FROM UNNEST(places.{field}) AS name WHERE name IN ({list}))"
        ),
    })
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum FilterError {
        #[error("'{0}' is not a valid column name")]
        InvalidIdentifier(String),
        #[error("'{0}' is not a valid time, expected HH:MM")]
        InvalidTime(String),
        #[error("Unknown day of week '{0}'")]
        UnknownDay(String),
        #[error("Unknown business status '{0}'")]
        UnknownBusinessStatus(String),
    }
    pub type Result<T> = std::result::Result<T, FilterError>;
}
