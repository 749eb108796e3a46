//! Minimal coordinate types shared by every service boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `[lng, lat]`, the axis order used by WKT and GeoJSON.
    pub const fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    pub const fn from_lng_lat([lng, lat]: [f64; 2]) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// A lat/lng bounding box given by its south-west (`low`) and north-east
/// (`high`) corners.
///
/// When `low.lng > high.lng` the box crosses the antimeridian and covers
/// `low.lng..=180` plus `-180..=high.lng`. Empty bounds are represented as
/// `Option<Viewport>::None` by callers; a `Viewport` always covers at least
/// one point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub low: LatLng,
    pub high: LatLng,
}

const FULL_TURN: f64 = 360.0;

impl Viewport {
    /// Latitudes are ordered; longitudes are kept as given so a south-west
    /// corner east of the north-east corner still means "crosses 180".
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            low: LatLng::new(south_west.lat.min(north_east.lat), south_west.lng),
            high: LatLng::new(south_west.lat.max(north_east.lat), north_east.lng),
        }
    }

    pub const fn from_point(point: LatLng) -> Self {
        Self {
            low: point,
            high: point,
        }
    }

    /// Smallest viewport covering every point, or `None` for an empty input.
    ///
    /// The longitude range is the circle minus its widest empty gap, so points
    /// either side of 180 produce a narrow box that crosses it.
    pub fn from_points<I: IntoIterator<Item = LatLng>>(points: I) -> Option<Self> {
        let points: Vec<LatLng> = points.into_iter().collect();
        let first = points.first()?;
        let (low_lat, high_lat) = points.iter().fold((first.lat, first.lat), |(lo, hi), p| {
            (lo.min(p.lat), hi.max(p.lat))
        });

        let mut lngs: Vec<f64> = points.iter().map(|p| p.lng).collect();
        lngs.sort_by(f64::total_cmp);
        let (min_lng, max_lng) = (lngs[0], lngs[lngs.len() - 1]);
        // Start from the gap that wraps past 180; only an interior gap that is
        // strictly wider moves the box across the antimeridian.
        let mut widest = (min_lng + FULL_TURN - max_lng, min_lng, max_lng);
        for pair in lngs.windows(2) {
            let gap = pair[1] - pair[0];
            if gap > widest.0 {
                widest = (gap, pair[1], pair[0]);
            }
        }
        let (_, low_lng, high_lng) = widest;

        Some(Self {
            low: LatLng::new(low_lat, low_lng),
            high: LatLng::new(high_lat, high_lng),
        })
    }

    #[must_use]
    pub fn extend(self, point: LatLng) -> Self {
        self.union(Self::from_point(point))
    }

    /// Smallest viewport covering both. Longitude arcs are joined around the
    /// circle, so two boxes either side of 180 stay narrow.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        let low_lat = self.low.lat.min(other.low.lat);
        let high_lat = self.high.lat.max(other.high.lat);

        let (a_start, a_span) = (self.low.lng, self.lng_span());
        let (b_start, b_span) = (other.low.lng, other.lng_span());
        let from_a = a_span.max((b_start - a_start).rem_euclid(FULL_TURN) + b_span);
        let from_b = b_span.max((a_start - b_start).rem_euclid(FULL_TURN) + a_span);
        let (start, span) = if from_a <= from_b {
            (a_start, from_a)
        } else {
            (b_start, from_b)
        };

        if span >= FULL_TURN {
            return Self {
                low: LatLng::new(low_lat, -180.0),
                high: LatLng::new(high_lat, 180.0),
            };
        }
        let mut end = start + span;
        if end > 180.0 {
            end -= FULL_TURN;
        }
        Self {
            low: LatLng::new(low_lat, start),
            high: LatLng::new(high_lat, end),
        }
    }

    /// Degrees of longitude covered, counting eastward from `low` to `high`.
    pub fn lng_span(&self) -> f64 {
        if self.crosses_antimeridian() {
            self.high.lng - self.low.lng + FULL_TURN
        } else {
            self.high.lng - self.low.lng
        }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.low.lng > self.high.lng
    }

    pub fn center(&self) -> LatLng {
        let mut lng = self.low.lng + self.lng_span() / 2.0;
        if lng > 180.0 {
            lng -= FULL_TURN;
        }
        LatLng::new((self.low.lat + self.high.lat) / 2.0, lng)
    }

    pub fn contains(&self, point: LatLng) -> bool {
        (self.low.lat..=self.high.lat).contains(&point.lat)
            && (point.lng - self.low.lng).rem_euclid(FULL_TURN) <= self.lng_span()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_orders_latitude_only() {
        let v = Viewport::new(LatLng::new(52.0, -1.0), LatLng::new(51.0, 1.0));
        assert_eq!(v.low, LatLng::new(51.0, -1.0));
        assert_eq!(v.high, LatLng::new(52.0, 1.0));
        assert!(!v.crosses_antimeridian());

        // A south-west corner east of the north-east one wraps through 180.
        let fiji = Viewport::new(LatLng::new(-21.0, 177.0), LatLng::new(-12.0, -178.0));
        assert_eq!(fiji.low, LatLng::new(-21.0, 177.0));
        assert_eq!(fiji.high, LatLng::new(-12.0, -178.0));
        assert!(fiji.crosses_antimeridian());
        assert_eq!(fiji.lng_span(), 5.0);
    }

    #[test]
    fn test_antimeridian_center_and_contains() {
        let fiji = Viewport::new(LatLng::new(-21.0, 177.0), LatLng::new(-12.0, -178.0));
        assert_eq!(fiji.center(), LatLng::new(-16.5, 179.5));
        assert!(fiji.contains(LatLng::new(-17.0, 179.0)));
        assert!(fiji.contains(LatLng::new(-17.0, -179.0)));
        assert!(fiji.contains(LatLng::new(-17.0, 180.0)));
        assert!(!fiji.contains(LatLng::new(-17.0, 0.0)));
        assert!(!fiji.contains(LatLng::new(-17.0, 170.0)));

        let east_of_180 = Viewport::new(LatLng::new(0.0, 178.0), LatLng::new(1.0, -170.0));
        assert_eq!(east_of_180.center().lng, -176.0);
    }

    #[test]
    fn test_union_across_antimeridian_stays_narrow() {
        let west = Viewport::new(LatLng::new(-20.0, 176.0), LatLng::new(-15.0, 179.0));
        let east = Viewport::new(LatLng::new(-18.0, -179.0), LatLng::new(-12.0, -177.0));
        let u = west.union(east);
        assert_eq!(u.low, LatLng::new(-20.0, 176.0));
        assert_eq!(u.high, LatLng::new(-12.0, -177.0));
        assert_eq!(u.lng_span(), 7.0);
        assert_eq!(east.union(west), u);
        assert!(!u.contains(LatLng::new(-16.0, 0.0)));

        let fiji = Viewport::new(LatLng::new(-21.0, 177.0), LatLng::new(-12.0, -178.0));
        let wider = fiji.union(Viewport::from_point(LatLng::new(-14.0, -175.0)));
        assert_eq!(wider.low.lng, 177.0);
        assert_eq!(wider.high.lng, -175.0);
    }

    #[test]
    fn test_union_covering_whole_circle() {
        let a = Viewport::new(LatLng::new(0.0, -170.0), LatLng::new(1.0, 10.0));
        let b = Viewport::new(LatLng::new(0.0, 0.0), LatLng::new(1.0, -160.0));
        let u = a.union(b);
        assert_eq!(u.low.lng, -180.0);
        assert_eq!(u.high.lng, 180.0);
        assert!(u.contains(LatLng::new(0.5, 123.0)));
    }

    #[test]
    fn test_from_points_straddling_antimeridian() {
        let v = Viewport::from_points([
            LatLng::new(-17.0, 179.5),
            LatLng::new(-16.0, -179.5),
            LatLng::new(-18.0, 178.0),
        ])
        .unwrap();
        assert_eq!(v.low, LatLng::new(-18.0, 178.0));
        assert_eq!(v.high, LatLng::new(-16.0, -179.5));
        assert!(v.crosses_antimeridian());

        let ordinary = Viewport::from_points([
            LatLng::new(0.0, -100.0),
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 100.0),
        ])
        .unwrap();
        assert_eq!(ordinary.low.lng, -100.0);
        assert_eq!(ordinary.high.lng, 100.0);
    }

    #[test]
    fn test_union_and_center() {
        let a = Viewport::new(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0));
        let b = Viewport::new(LatLng::new(2.0, 2.0), LatLng::new(3.0, 3.0));
        let u = a.union(b);
        assert_eq!(u.low, LatLng::new(0.0, 0.0));
        assert_eq!(u.high, LatLng::new(3.0, 3.0));
        assert_eq!(u.center(), LatLng::new(1.5, 1.5));
        assert!(u.contains(LatLng::new(2.5, 0.5)));
    }

    #[test]
    fn test_from_points_empty() {
        assert!(Viewport::from_points(Vec::new()).is_none());
        let v = Viewport::from_points([LatLng::new(1.0, 2.0), LatLng::new(-1.0, 4.0)]).unwrap();
        assert_eq!(v.low, LatLng::new(-1.0, 2.0));
        assert_eq!(v.high, LatLng::new(1.0, 4.0));
    }
}
