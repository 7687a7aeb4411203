//! Great-circle planning and height sculpting.
//!
//! A [`MapPlan`] is everything needed to rebuild a map: the seed, the
//! dimensions, the circles and the chosen sea level. Circles are drawn
//! from the circle stream of the seed; the sea level is the `ocean_ratio`
//! percentile of the sculpted height field.

use std::f64::consts::{PI, TAU};

use aeon_types::{
    CircleType, GameId, GreatCircle, MAX_ELEVATION, MIN_ELEVATION, MapMetadata,
};
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::{MapGenConfig, validate_dimensions};
use crate::error::WorldError;
use crate::geometry::{angular_distance, circle_from_bearing, circle_normal, falloff, tile_point};
use crate::seed::{CIRCLE_STREAM, stream_rng};

/// Shape parameters for one circle type.
struct CircleShape {
    circle_type: CircleType,
    min_radius: f64,
    max_radius: f64,
    height_modifier: f64,
}

const CONTINENT: CircleShape = CircleShape {
    circle_type: CircleType::ContinentalBoundary,
    min_radius: 0.25,
    max_radius: 0.5,
    height_modifier: 700.0,
};

const MOUNTAINS: CircleShape = CircleShape {
    circle_type: CircleType::MountainRange,
    min_radius: 0.06,
    max_radius: 0.14,
    height_modifier: 1600.0,
};

const TRENCH: CircleShape = CircleShape {
    circle_type: CircleType::OceanTrench,
    min_radius: 0.1,
    max_radius: 0.25,
    height_modifier: -600.0,
};

/// Inputs that fully determine a generated map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPlan {
    /// Generation seed.
    pub seed: u64,
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Intended player count.
    pub player_count: u32,
    /// Elevation at or below which tiles are ocean.
    pub sea_level: i32,
    /// Circles in application order.
    pub circles: Vec<GreatCircle>,
}

impl MapPlan {
    /// Draw circles for a new map and choose its sea level.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] or
    /// [`WorldError::InvalidConfig`] for unusable inputs.
    pub fn new(
        seed: u64,
        width: u32,
        height: u32,
        players: u32,
        config: &MapGenConfig,
    ) -> Result<Self, WorldError> {
        validate_dimensions(width, height)?;
        config.validate()?;
        if players == 0 {
            return Err(WorldError::InvalidConfig(
                "player count must be at least 1".to_owned(),
            ));
        }
        let circles = draw_circles(seed, config.circle_count(players)?);
        let heights = sculpt(width, height, &circles);
        let sea_level = sea_level_for(&heights, config.ocean_ratio);
        Ok(Self {
            seed,
            width,
            height,
            player_count: players,
            sea_level,
            circles,
        })
    }

    /// Rebuild a plan from stored metadata.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidMetadata`] if the dimensions, sea level
    /// or any circle parameter is unusable.
    pub fn from_metadata(metadata: &MapMetadata) -> Result<Self, WorldError> {
        validate_dimensions(metadata.width, metadata.height)
            .map_err(|e| WorldError::InvalidMetadata(e.to_string()))?;
        let lowest = MIN_ELEVATION.saturating_sub(1);
        if !(lowest..=MAX_ELEVATION).contains(&metadata.sea_level) {
            return Err(WorldError::InvalidMetadata(format!(
                "sea level {} out of range",
                metadata.sea_level
            )));
        }
        if let Some(index) = metadata.circles.iter().position(|c| !circle_is_finite(c)) {
            return Err(WorldError::InvalidMetadata(format!(
                "circle {index} has non-finite parameters"
            )));
        }
        Ok(Self {
            seed: metadata.seed,
            width: metadata.width,
            height: metadata.height,
            player_count: metadata.player_count,
            sea_level: metadata.sea_level,
            circles: metadata.circles.clone(),
        })
    }

    /// Attach identity and timing to produce storable metadata.
    pub fn into_metadata(
        self,
        game_id: GameId,
        generated_at: DateTime<Utc>,
        generation_ms: u64,
    ) -> MapMetadata {
        MapMetadata {
            game_id,
            seed: self.seed,
            width: self.width,
            height: self.height,
            player_count: self.player_count,
            sea_level: self.sea_level,
            circles: self.circles,
            generated_at,
            generation_ms,
        }
    }

    /// Clamped elevation of every tile, row-major.
    pub fn elevations(&self) -> Vec<i32> {
        sculpt(self.width, self.height, &self.circles)
    }
}

fn circle_is_finite(circle: &GreatCircle) -> bool {
    [
        circle.center_lon,
        circle.center_lat,
        circle.direction.x,
        circle.direction.y,
        circle.direction.z,
        circle.radius,
        circle.height_modifier,
        circle.weight,
    ]
    .iter()
    .all(|v| v.is_finite())
}

/// Draw `count` circles from the circle stream of `seed`.
fn draw_circles(seed: u64, count: u32) -> Vec<GreatCircle> {
    let mut rng = stream_rng(seed, CIRCLE_STREAM);
    (0..count)
        .map(|_| {
            let roll: f64 = rng.random();
            let shape = if roll < 0.5 {
                &CONTINENT
            } else if roll < 0.8 {
                &MOUNTAINS
            } else {
                &TRENCH
            };
            let lon = rng.random_range(-PI..PI);
            // Uniform on the sphere, not uniform in latitude.
            let lat = rng.random_range(-1.0_f64..=1.0).asin();
            let bearing = rng.random_range(0.0..TAU);
            let radius = rng.random_range(shape.min_radius..shape.max_radius);
            let weight = rng.random_range(0.6..1.4);
            circle_from_bearing(
                lon,
                lat,
                bearing,
                shape.circle_type,
                radius,
                shape.height_modifier,
                weight,
            )
        })
        .collect()
}

/// Sum circle contributions for every tile and clamp to the elevation
/// bounds. Degenerate circles contribute nothing.
pub(crate) fn sculpt(width: u32, height: u32, circles: &[GreatCircle]) -> Vec<i32> {
    let normals: Vec<_> = circles
        .iter()
        .filter_map(|circle| circle_normal(circle).map(|normal| (circle, normal)))
        .collect();
    let capacity = u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    let mut out = Vec::with_capacity(capacity);
    for y in 0..height {
        for x in 0..width {
            let point = tile_point(x, y, width, height);
            let raw: f64 = normals
                .iter()
                .map(|(circle, normal)| {
                    let distance = angular_distance(point, *normal);
                    circle.height_modifier * circle.weight * falloff(distance, circle.radius)
                })
                .sum();
            out.push(clamp_elevation(raw));
        }
    }
    out
}

#[allow(clippy::cast_possible_truncation)]
fn clamp_elevation(raw: f64) -> i32 {
    if raw.is_nan() {
        return 0;
    }
    // Clamped into i32 range before the cast.
    raw.round()
        .clamp(f64::from(MIN_ELEVATION), f64::from(MAX_ELEVATION)) as i32
}

/// Elevation such that `ocean_ratio` of the tiles lie at or below it.
///
/// A ratio of zero yields a level below every possible elevation.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn sea_level_for(heights: &[i32], ocean_ratio: f64) -> i32 {
    if ocean_ratio <= 0.0 || heights.is_empty() {
        return MIN_ELEVATION.saturating_sub(1);
    }
    let mut sorted = heights.to_vec();
    sorted.sort_unstable();
    // Tile counts are far below 2^52 and the ratio is below 1.
    let wanted = (sorted.len() as f64 * ocean_ratio).ceil() as usize;
    let index = wanted.saturating_sub(1).min(sorted.len().saturating_sub(1));
    sorted
        .get(index)
        .copied()
        .unwrap_or(MIN_ELEVATION.saturating_sub(1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_plan() {
        let config = MapGenConfig::default();
        let a = MapPlan::new(42, 40, 30, 2, &config).unwrap();
        let b = MapPlan::new(42, 40, 30, 2, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.circles.len(), 14);
    }

    #[test]
    fn different_seeds_differ() {
        let config = MapGenConfig::default();
        let a = MapPlan::new(1, 40, 30, 2, &config).unwrap();
        let b = MapPlan::new(2, 40, 30, 2, &config).unwrap();
        assert_ne!(a.circles, b.circles);
    }

    #[test]
    fn circle_parameters_follow_their_type() {
        let plan = MapPlan::new(9, 20, 20, 4, &MapGenConfig::default()).unwrap();
        for circle in &plan.circles {
            let shape = match circle.circle_type {
                CircleType::ContinentalBoundary => &CONTINENT,
                CircleType::MountainRange => &MOUNTAINS,
                CircleType::OceanTrench => &TRENCH,
            };
            assert!(circle.radius >= shape.min_radius && circle.radius < shape.max_radius);
            assert!((circle.height_modifier - shape.height_modifier).abs() < f64::EPSILON);
            assert!((0.6..1.4).contains(&circle.weight));
            assert!(circle.center_lat.abs() <= PI / 2.0);
        }
    }

    #[test]
    fn rejects_zero_players_and_bad_dimensions() {
        let config = MapGenConfig::default();
        assert!(MapPlan::new(1, 10, 10, 0, &config).is_err());
        assert!(matches!(
            MapPlan::new(1, 0, 10, 2, &config),
            Err(WorldError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn sculpted_heights_stay_in_bounds() {
        let plan = MapPlan::new(77, 48, 32, 4, &MapGenConfig::default()).unwrap();
        let heights = plan.elevations();
        assert_eq!(heights.len(), 48 * 32);
        assert!(heights
            .iter()
            .all(|h| (MIN_ELEVATION..=MAX_ELEVATION).contains(h)));
    }

    #[test]
    fn sea_level_is_the_ocean_percentile() {
        let heights: Vec<i32> = (1..=10).collect();
        assert_eq!(sea_level_for(&heights, 0.5), 5);
        assert_eq!(sea_level_for(&heights, 0.05), 1);
        assert_eq!(sea_level_for(&heights, 0.0), MIN_ELEVATION - 1);
        assert_eq!(sea_level_for(&heights, 0.99), 10);
    }

    #[test]
    fn clamp_handles_extremes() {
        assert_eq!(clamp_elevation(1e9), MAX_ELEVATION);
        assert_eq!(clamp_elevation(-1e9), MIN_ELEVATION);
        assert_eq!(clamp_elevation(12.4), 12);
        assert_eq!(clamp_elevation(f64::NAN), 0);
    }

    #[test]
    fn metadata_round_trip_rebuilds_the_plan() {
        let plan = MapPlan::new(5, 16, 16, 2, &MapGenConfig::default()).unwrap();
        let metadata = plan.clone().into_metadata(GameId::new(), Utc::now(), 3);
        assert_eq!(MapPlan::from_metadata(&metadata).unwrap(), plan);
    }

    #[test]
    fn metadata_with_bad_sea_level_is_rejected() {
        let plan = MapPlan::new(5, 16, 16, 2, &MapGenConfig::default()).unwrap();
        let mut metadata = plan.into_metadata(GameId::new(), Utc::now(), 3);
        metadata.sea_level = MAX_ELEVATION + 1;
        assert!(matches!(
            MapPlan::from_metadata(&metadata),
            Err(WorldError::InvalidMetadata(_))
        ));
    }
}
