//! Turning decoded query tables into things a map can show.
//!
//! Aggregate shapes become an [`AggregateSummary`] anchored at the search
//! center. Density shapes become a [`DensityLayer`] of colored hexagons,
//! either built from H3 indices ([`density_from_arrays`]) or from WKT
//! polygons returned by the server-side function ([`density_from_function`]).

mod aggregate;
mod density;

pub use aggregate::{AggregateSummary, NO_AGGREGATE_RESULTS, field_label};
pub use density::{
    DensityFeature, DensityLayer, NO_DENSITY_RESULTS, density_from_arrays, density_from_function,
};
pub use error::InterpretError;

/// Fill color for the lowest counts.
pub const LOW_COLOR: [u8; 3] = [255, 255, 0];
/// Fill color for the highest count.
pub const HIGH_COLOR: [u8; 3] = [255, 55, 0];
pub const FILL_ALPHA: u8 = 180;

/// Yellow to red, square-root scaled so low counts stay distinguishable.
///
/// A `max` of zero maps everything to the low end.
pub fn color_scale(count: u64, max: u64) -> [u8; 4] {
    let intensity = if max == 0 {
        0.0
    } else {
        (count as f64 / max as f64).clamp(0.0, 1.0).sqrt()
    };
    let blend = |from: u8, to: u8| {
        (f64::from(from) + (f64::from(to) - f64::from(from)) * intensity).round() as u8
    };
    [
        blend(LOW_COLOR[0], HIGH_COLOR[0]),
        blend(LOW_COLOR[1], HIGH_COLOR[1]),
        blend(LOW_COLOR[2], HIGH_COLOR[2]),
        FILL_ALPHA,
    ]
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum InterpretError {
        #[error("Result is missing column '{0}'")]
        MissingColumn(&'static str),
        #[error("Index and count arrays differ in length ({indices} vs {counts})")]
        MismatchedArrays { indices: usize, counts: usize },
    }
    pub type Result<T> = std::result::Result<T, InterpretError>;
}
