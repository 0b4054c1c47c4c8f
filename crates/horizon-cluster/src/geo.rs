//! Geographic primitives and Web Mercator helpers.
//!
//! Zoom math follows the Web Mercator convention used by slippy-map hosts:
//! at zoom `z` the whole world is `256 * 2^z` pixels wide.

use serde::{Deserialize, Serialize};

/// Maximum latitude representable in Web Mercator (degrees).
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;
/// Pixel size of one map tile.
pub const TILE_SIZE: f64 = 256.0;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both coordinates are finite and inside the valid ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Clamp latitude to `[-90, 90]` and longitude to `[-180, 180]`.
    ///
    /// Non-finite components collapse to `0.0`.
    pub fn clamped(self) -> Self {
        Self {
            lat: clamp_finite(self.lat, -90.0, 90.0),
            lng: clamp_finite(self.lng, -180.0, 180.0),
        }
    }
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(min, max)
    }
}

/// A geographic rectangle.
///
/// `west > east` describes a box crossing the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLngBounds {
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// A zero-area box around a single point.
    pub const fn from_point(point: LatLng) -> Self {
        Self::new(point.lat, point.lng, point.lat, point.lng)
    }

    /// The smallest box containing every point, or `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut iter = points.into_iter();
        let mut bounds = Self::from_point(iter.next()?);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Grow the box to include `point`. Does not wrap across the antimeridian.
    pub fn extend(&mut self, point: LatLng) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Latitude extent in degrees.
    pub fn lat_span(&self) -> f64 {
        (self.north - self.south).max(0.0)
    }

    /// Longitude extent in degrees, accounting for antimeridian wrap.
    pub fn lng_span(&self) -> f64 {
        if self.crosses_antimeridian() {
            self.east + 360.0 - self.west
        } else {
            self.east - self.west
        }
    }

    pub fn contains(&self, point: LatLng) -> bool {
        let lat_ok = point.lat >= self.south && point.lat <= self.north;
        let lng_ok = if self.crosses_antimeridian() {
            point.lng >= self.west || point.lng <= self.east
        } else {
            point.lng >= self.west && point.lng <= self.east
        };
        lat_ok && lng_ok
    }

    /// Center of the box in Web Mercator space.
    pub fn center(&self) -> LatLng {
        let mut lng = self.west + self.lng_span() / 2.0;
        if lng > 180.0 {
            lng -= 360.0;
        }
        let y = (mercator_y(self.south) + mercator_y(self.north)) / 2.0;
        LatLng::new(inverse_mercator_y(y), lng)
    }

    /// Whether every edge is finite and in range with `south <= north`.
    pub fn is_valid(&self) -> bool {
        LatLng::new(self.south, self.west).is_valid()
            && LatLng::new(self.north, self.east).is_valid()
            && self.south <= self.north
    }

    /// Clamp every edge to valid ranges and order `south <= north`.
    ///
    /// Longitudes are clamped, not wrapped, so an antimeridian-crossing box
    /// produced by out-of-range aggregation math is only approximated.
    pub fn clamped(self) -> Self {
        let south = clamp_finite(self.south, -90.0, 90.0);
        let north = clamp_finite(self.north, -90.0, 90.0);
        Self {
            south: south.min(north),
            west: clamp_finite(self.west, -180.0, 180.0),
            north: south.max(north),
            east: clamp_finite(self.east, -180.0, 180.0),
        }
    }
}

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Normalized Web Mercator x in `[0, 1]`, west to east.
pub fn mercator_x(lng: f64) -> f64 {
    (lng + 180.0) / 360.0
}

/// Normalized Web Mercator y in `[0, 1]`, north to south.
pub fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
    let sin = lat.to_radians().sin();
    0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * std::f64::consts::PI)
}

/// Inverse of [`mercator_y`].
pub fn inverse_mercator_y(y: f64) -> f64 {
    let n = std::f64::consts::PI * (1.0 - 2.0 * y);
    n.sinh().atan().to_degrees()
}

/// Inverse of [`mercator_x`].
pub fn inverse_mercator_x(x: f64) -> f64 {
    x * 360.0 - 180.0
}

/// World width in pixels at `zoom`.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// The largest zoom at which `bounds` fits inside `viewport`, leaving
/// `padding` pixels free on every side.
///
/// Returns `f64::INFINITY` for zero-extent bounds; callers cap the result at
/// their own maximum zoom.
pub fn fit_zoom(bounds: &LatLngBounds, viewport: ScreenSize, padding: f64) -> f64 {
    let padding = padding.max(0.0);
    let available_w = (viewport.width - 2.0 * padding).max(1.0);
    let available_h = (viewport.height - 2.0 * padding).max(1.0);

    let dx = bounds.lng_span() / 360.0;
    let dy = (mercator_y(bounds.south) - mercator_y(bounds.north)).abs();

    let zoom_x = if dx > 0.0 {
        (available_w / (dx * TILE_SIZE)).log2()
    } else {
        f64::INFINITY
    };
    let zoom_y = if dy > 0.0 {
        (available_h / (dy * TILE_SIZE)).log2()
    } else {
        f64::INFINITY
    };
    zoom_x.min(zoom_y)
}

/// The bounds visible when a viewport of `size` is centered on `center` at
/// `zoom`. Edges are clamped to the Mercator world.
pub fn viewport_bounds(center: LatLng, zoom: f64, size: ScreenSize) -> LatLngBounds {
    let world = world_size(zoom);
    let cx = mercator_x(center.lng) * world;
    let cy = mercator_y(center.lat) * world;
    let half_w = size.width / 2.0;
    let half_h = size.height / 2.0;

    let west = inverse_mercator_x(((cx - half_w) / world).max(0.0));
    let east = inverse_mercator_x(((cx + half_w) / world).min(1.0));
    let north = inverse_mercator_y(((cy - half_h) / world).max(0.0));
    let south = inverse_mercator_y(((cy + half_h) / world).min(1.0));
    LatLngBounds::new(south, west, north, east)
}
