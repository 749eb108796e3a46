//! Static dataset catalog: which locations can be queried, the tables that back
//! them, and the region fields each country exposes.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Which flavour of the places dataset the project is subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DatasetKind {
    /// Country-wide tables, selected by country name.
    #[default]
    Full,
    /// Single-city sample tables, selected by city label.
    Sample,
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FULL" | "" => Ok(Self::Full),
            "SAMPLE" => Ok(Self::Sample),
            other => Err(format!("Unknown dataset kind '{other}', expected FULL or SAMPLE")),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "FULL"),
            Self::Sample => write!(f, "SAMPLE"),
        }
    }
}

const COUNTRY_CODES: &[(&str, &str)] = &[
    ("Australia", "au"),
    ("Brazil", "br"),
    ("Canada", "ca"),
    ("France", "fr"),
    ("Germany", "de"),
    ("India", "in"),
    ("Indonesia", "id"),
    ("Italy", "it"),
    ("Japan", "jp"),
    ("Mexico", "mx"),
    ("Spain", "es"),
    ("Switzerland", "ch"),
    ("United Kingdom", "gb"),
    ("United States", "us"),
];

const SAMPLE_LOCATIONS: &[(&str, &str)] = &[
    ("Sydney, Australia", "au"),
    ("Sao Paulo, Brazil", "br"),
    ("Toronto, Canada", "ca"),
    ("Paris, France", "fr"),
    ("Berlin, Germany", "de"),
    ("Mumbai, India", "in"),
    ("Jakarta, Indonesia", "id"),
    ("Rome, Italy", "it"),
    ("Tokyo, Japan", "jp"),
    ("Mexico City, Mexico", "mx"),
    ("Madrid, Spain", "es"),
    ("Zurich, Switzerland", "ch"),
    ("London, United Kingdom", "gb"),
    ("New York City, United States", "us"),
];

/// Declared type of a region column: a single name, or an array of names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionDataType {
    #[serde(rename = "STRING")]
    String,
    #[serde(rename = "ARRAY")]
    Array,
}

impl FromStr for RegionDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRING" => Ok(Self::String),
            "ARRAY" => Ok(Self::Array),
            other => Err(format!("Unknown region data type '{other}'")),
        }
    }
}

/// One selectable region column, e.g. "State" → `administrative_area_level_1_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionField {
    pub label: &'static str,
    pub field: &'static str,
    pub data_type: RegionDataType,
}

impl RegionField {
    /// Parse the `field|TYPE` encoding used by region selectors.
    pub fn parse_selector(value: &str) -> Option<(String, RegionDataType)> {
        let (field, data_type) = value.split_once('|')?;
        Some((field.to_string(), data_type.parse().ok()?))
    }
}

macro_rules! region {
    ($label:literal, $field:literal, STRING) => {
        RegionField {
            label: $label,
            field: $field,
            data_type: RegionDataType::String,
        }
    };
    ($label:literal, $field:literal, ARRAY) => {
        RegionField {
            label: $label,
            field: $field,
            data_type: RegionDataType::Array,
        }
    };
}

const ADMIN1: &str = "administrative_area_level_1_name";

const REGIONS_AU: &[RegionField] = &[
    region!("State / Territory", "administrative_area_level_1_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
];
const REGIONS_BR: &[RegionField] = &[
    region!("State", "administrative_area_level_1_name", STRING),
    region!("City / Municipality", "administrative_area_level_2_name", STRING),
    region!("Locality", "locality_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
    region!("Neighborhood", "sublocality_level_1_names", ARRAY),
];
const REGIONS_CA: &[RegionField] = &[
    region!("Province / Territory", "administrative_area_level_1_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Neighborhood", "neighborhood_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
];
const REGIONS_DE: &[RegionField] = &[
    region!("State", "administrative_area_level_1_name", STRING),
    region!("District", "administrative_area_level_3_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
    region!("Sublocality / Borough", "sublocality_level_1_names", ARRAY),
];
const REGIONS_ES: &[RegionField] = &[
    region!("Autonomous Community", "administrative_area_level_1_name", STRING),
    region!("Province", "administrative_area_level_2_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Neighborhood", "neighborhood_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
];
const REGIONS_FR: &[RegionField] = &[
    region!("Region", "administrative_area_level_1_name", STRING),
    region!("Department", "administrative_area_level_2_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
    region!("Sublocality", "sublocality_level_1_names", ARRAY),
];
const REGIONS_GB: &[RegionField] = &[
    region!("Country", "administrative_area_level_1_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Postal Town", "postal_town_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
];
const REGIONS_IN: &[RegionField] = &[
    region!("State", "administrative_area_level_1_name", STRING),
    region!("District", "administrative_area_level_3_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Postal Code (PIN)", "postal_code_names", ARRAY),
    region!("Sublocality", "sublocality_level_1_names", ARRAY),
];
const REGIONS_ID: &[RegionField] = &[
    region!("Province", "administrative_area_level_1_name", STRING),
    region!("Regency / City", "administrative_area_level_2_name", STRING),
    region!("District", "administrative_area_level_3_name", STRING),
    region!("Village / Kelurahan", "administrative_area_level_4_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
];
const REGIONS_IT: &[RegionField] = &[
    region!("Region", "administrative_area_level_1_name", STRING),
    region!("Province", "administrative_area_level_2_name", STRING),
    region!("Municipality (Comune)", "administrative_area_level_3_name", STRING),
    region!("Postal Code", "postal_code_names", ARRAY),
];
const REGIONS_JP: &[RegionField] = &[
    region!("Prefecture", "administrative_area_level_1_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
    region!("Sublocality", "sublocality_level_1_names", ARRAY),
];
const REGIONS_MX: &[RegionField] = &[
    region!("State", "administrative_area_level_1_name", STRING),
    region!("Municipality", "administrative_area_level_2_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
];
const REGIONS_CH: &[RegionField] = &[
    region!("Canton", "administrative_area_level_1_name", STRING),
    region!("District", "administrative_area_level_2_name", STRING),
    region!("Municipality / Locality", "locality_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
];
const REGIONS_US: &[RegionField] = &[
    region!("State", "administrative_area_level_1_name", STRING),
    region!("County", "administrative_area_level_2_name", STRING),
    region!("City / Locality", "locality_names", ARRAY),
    region!("Neighborhood", "neighborhood_names", ARRAY),
    region!("Postal Code", "postal_code_names", ARRAY),
];

/// A resolved location: the label the user picked plus where its data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLocation {
    pub dataset: DatasetKind,
    pub label: String,
    pub country_code: &'static str,
}

impl DatasetLocation {
    /// Look up a country name (full dataset) or city label (sample dataset).
    pub fn lookup(dataset: DatasetKind, label: &str) -> Option<Self> {
        let table = match dataset {
            DatasetKind::Full => COUNTRY_CODES,
            DatasetKind::Sample => SAMPLE_LOCATIONS,
        };
        table
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(name, code)| Self {
                dataset,
                label: (*name).to_string(),
                country_code: *code,
            })
    }

    /// Every selectable label for a dataset, sorted for display.
    pub fn labels(dataset: DatasetKind) -> Vec<&'static str> {
        let table = match dataset {
            DatasetKind::Full => COUNTRY_CODES,
            DatasetKind::Sample => SAMPLE_LOCATIONS,
        };
        let mut labels: Vec<_> = table.iter().map(|(name, _)| *name).collect();
        labels.sort_unstable();
        labels
    }

    /// Fully-qualified places table, without backticks.
    pub fn places_table(&self) -> String {
        match self.dataset {
            DatasetKind::Full => format!("places_insights___{}.places", self.country_code),
            DatasetKind::Sample => format!(
                "places_insights___{}___sample.places_sample",
                self.country_code
            ),
        }
    }

    /// Brand reference table. Brands are only published with the US dataset.
    pub const fn brands_table(&self) -> &'static str {
        match self.dataset {
            DatasetKind::Full => "places_insights___us.brands",
            DatasetKind::Sample => "places_insights___us___sample.brands",
        }
    }

    /// Dataset holding the server-side table functions.
    pub fn function_dataset(&self) -> String {
        match self.dataset {
            DatasetKind::Full => format!("places_insights___{}", self.country_code),
            DatasetKind::Sample => format!("places_insights___{}___sample", self.country_code),
        }
    }

    pub fn brand_filters_available(&self) -> bool {
        self.country_code == "us"
    }

    pub fn region_fields(&self) -> &'static [RegionField] {
        region_fields(self.country_code)
    }
}

/// Region columns offered for a country code; unknown codes get none.
pub fn region_fields(country_code: &str) -> &'static [RegionField] {
    match country_code {
        "au" => REGIONS_AU,
        "br" => REGIONS_BR,
        "ca" => REGIONS_CA,
        "ch" => REGIONS_CH,
        "de" => REGIONS_DE,
        "es" => REGIONS_ES,
        "fr" => REGIONS_FR,
        "gb" => REGIONS_GB,
        "id" => REGIONS_ID,
        "in" => REGIONS_IN,
        "it" => REGIONS_IT,
        "jp" => REGIONS_JP,
        "mx" => REGIONS_MX,
        "us" => REGIONS_US,
        _ => &[],
    }
}

/// First-level administrative region field, present in every country.
pub const fn admin_level_1_field() -> &'static str {
    ADMIN1
}
