//! Sphere geometry for terrain sculpting.
//!
//! The map is a longitude/latitude parameterisation of the unit sphere:
//! column 0 starts at longitude -pi and the last column ends at +pi; row 0
//! is the north pole band and the last row the south pole band. Tile
//! centres are sampled at half-tile offsets so no tile sits exactly on a
//! pole.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use aeon_types::{CircleType, GreatCircle, Vec3};

/// Dot product.
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a.x.mul_add(b.x, a.y.mul_add(b.y, a.z * b.z))
}

/// Cross product.
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3 {
        x: a.y.mul_add(b.z, -(a.z * b.y)),
        y: a.z.mul_add(b.x, -(a.x * b.z)),
        z: a.x.mul_add(b.y, -(a.y * b.x)),
    }
}

/// Scale a vector to unit length. Returns `None` for a zero vector.
pub fn normalize(v: Vec3) -> Option<Vec3> {
    let length = dot(v, v).sqrt();
    if length.is_finite() && length > f64::EPSILON {
        Some(Vec3 {
            x: v.x / length,
            y: v.y / length,
            z: v.z / length,
        })
    } else {
        None
    }
}

/// Unit vector for a longitude/latitude pair in radians.
pub fn lon_lat_to_vec(lon: f64, lat: f64) -> Vec3 {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    Vec3 {
        x: cos_lat * cos_lon,
        y: cos_lat * sin_lon,
        z: sin_lat,
    }
}

/// Longitude of the centre of column `x` on a map `width` tiles wide.
pub fn column_longitude(x: u32, width: u32) -> f64 {
    ((f64::from(x) + 0.5) / f64::from(width.max(1))).mul_add(TAU, -PI)
}

/// Latitude of the centre of row `y` on a map `height` tiles tall.
pub fn row_latitude(y: u32, height: u32) -> f64 {
    (-(f64::from(y) + 0.5) / f64::from(height.max(1))).mul_add(PI, FRAC_PI_2)
}

/// Point on the unit sphere for the centre of tile `(x, y)`.
pub fn tile_point(x: u32, y: u32, width: u32, height: u32) -> Vec3 {
    lon_lat_to_vec(column_longitude(x, width), row_latitude(y, height))
}

/// Build a circle anchored at `(lon, lat)` heading along `bearing`
/// (radians clockwise from north).
pub fn circle_from_bearing(
    lon: f64,
    lat: f64,
    bearing: f64,
    circle_type: CircleType,
    radius: f64,
    height_modifier: f64,
    weight: f64,
) -> GreatCircle {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    let east = Vec3 {
        x: -sin_lon,
        y: cos_lon,
        z: 0.0,
    };
    let north = Vec3 {
        x: -sin_lat * cos_lon,
        y: -sin_lat * sin_lon,
        z: cos_lat,
    };
    let (sin_b, cos_b) = bearing.sin_cos();
    let direction = Vec3 {
        x: cos_b.mul_add(north.x, sin_b * east.x),
        y: cos_b.mul_add(north.y, sin_b * east.y),
        z: cos_b.mul_add(north.z, sin_b * east.z),
    };
    GreatCircle {
        center_lon: lon,
        center_lat: lat,
        direction,
        circle_type,
        radius,
        height_modifier,
        weight,
    }
}

/// Unit normal of the plane containing the circle, or `None` if the
/// direction is degenerate (parallel to the centre vector).
pub fn circle_normal(circle: &GreatCircle) -> Option<Vec3> {
    let center = lon_lat_to_vec(circle.center_lon, circle.center_lat);
    normalize(cross(center, circle.direction))
}

/// Angular distance in radians from a unit point to the great circle with
/// the given unit normal. Always in `[0, pi/2]`.
pub fn angular_distance(point: Vec3, normal: Vec3) -> f64 {
    dot(point, normal).abs().min(1.0).asin()
}

/// Raised-cosine falloff: 1 at distance 0, 0 at `radius` and beyond.
pub fn falloff(distance: f64, radius: f64) -> f64 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    0.5 * (1.0 + (PI * distance / radius).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn falloff_endpoints() {
        assert!((falloff(0.0, 0.3) - 1.0).abs() < EPS);
        assert!(falloff(0.3, 0.3).abs() < EPS);
        assert!(falloff(0.5, 0.3).abs() < EPS);
        assert!((falloff(0.15, 0.3) - 0.5).abs() < EPS);
        assert!(falloff(0.0, 0.0).abs() < EPS);
    }

    #[test]
    fn falloff_decreases_with_distance() {
        let mut previous = falloff(0.0, 1.0);
        for step in 1..=10 {
            let current = falloff(f64::from(step) * 0.1, 1.0);
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn tile_points_are_unit_vectors() {
        for (x, y) in [(0, 0), (5, 3), (9, 9)] {
            let p = tile_point(x, y, 10, 10);
            assert!((dot(p, p) - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn latitude_runs_north_to_south() {
        assert!(row_latitude(0, 10) > 0.0);
        assert!(row_latitude(9, 10) < 0.0);
        assert!((row_latitude(0, 10) + row_latitude(9, 10)).abs() < EPS);
    }

    #[test]
    fn equator_circle_distance_equals_latitude() {
        // Anchored on the equator heading due east: the circle is the equator.
        let circle = circle_from_bearing(
            0.0,
            0.0,
            FRAC_PI_2,
            CircleType::MountainRange,
            0.2,
            100.0,
            1.0,
        );
        let normal = circle_normal(&circle);
        assert!(normal.is_some());
        let normal = normal.unwrap_or(Vec3 { x: 0.0, y: 0.0, z: 1.0 });
        let lat = 0.3;
        let p = lon_lat_to_vec(1.2, lat);
        assert!((angular_distance(p, normal) - lat).abs() < 1e-6);
    }

    #[test]
    fn direction_is_tangent_at_center() {
        let circle = circle_from_bearing(0.7, -0.4, 1.1, CircleType::OceanTrench, 0.1, -10.0, 1.0);
        let center = lon_lat_to_vec(circle.center_lon, circle.center_lat);
        assert!(dot(center, circle.direction).abs() < EPS);
        assert!((dot(circle.direction, circle.direction) - 1.0).abs() < EPS);
    }

    #[test]
    fn degenerate_direction_has_no_normal() {
        let mut circle = circle_from_bearing(0.0, 0.0, 0.0, CircleType::OceanTrench, 0.1, 1.0, 1.0);
        circle.direction = lon_lat_to_vec(0.0, 0.0);
        assert!(circle_normal(&circle).is_none());
    }
}
