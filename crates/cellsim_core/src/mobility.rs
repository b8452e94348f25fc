//! Waypoint random walk: terminals head for a target at a fixed speed and
//! occasionally pick a new target, independent of where they are.

use rand::Rng;

use crate::ecs::Point;
use crate::scenario::{Bounds, MobilityConfig};

pub fn clamp_to_area(point: Point, area_max: f64) -> Point {
    Point::new(point.x.clamp(0.0, area_max), point.y.clamp(0.0, area_max))
}

/// One step toward `target`, never past it, clamped to the service area.
pub fn step_towards(position: Point, target: Point, step_size: f64, area_max: f64) -> Point {
    let dx = target.x - position.x;
    let dy = target.y - position.y;
    let distance = dx.hypot(dy);
    if distance <= step_size {
        return clamp_to_area(target, area_max);
    }
    let moved = Point::new(
        position.x + step_size * dx / distance,
        position.y + step_size * dy / distance,
    );
    clamp_to_area(moved, area_max)
}

pub fn sample_in_bounds<R: Rng>(rng: &mut R, bounds: &Bounds) -> Point {
    Point::new(
        rng.gen_range(bounds.x_min..=bounds.x_max),
        rng.gen_range(bounds.y_min..=bounds.y_max),
    )
}

/// Advances `position` one tick and possibly resamples `target`.
pub fn move_terminal<R: Rng>(
    position: &mut Point,
    target: &mut Point,
    config: &MobilityConfig,
    rng: &mut R,
) {
    *position = step_towards(*position, *target, config.step_size, config.area_max);
    if rng.gen_bool(config.retarget_probability) {
        *target = sample_in_bounds(rng, &config.retarget_bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(retarget_probability: f64) -> MobilityConfig {
        MobilityConfig {
            retarget_probability,
            ..MobilityConfig::default()
        }
    }

    #[test]
    fn steps_along_unit_vector() {
        let next = step_towards(Point::new(0.0, 0.0), Point::new(30.0, 40.0), 1.2, 6000.0);
        assert!((next.x - 0.72).abs() < 1e-12);
        assert!((next.y - 0.96).abs() < 1e-12);
    }

    #[test]
    fn reaches_target_without_overshooting() {
        let target = Point::new(10.5, 0.0);
        let mut position = Point::new(10.0, 0.0);
        position = step_towards(position, target, 1.2, 6000.0);
        assert_eq!(position, target);
        assert_eq!(step_towards(position, target, 1.2, 6000.0), target);
    }

    #[test]
    fn clamps_into_service_area() {
        let next = step_towards(Point::new(-50.0, 6001.0), Point::new(-60.0, 7000.0), 1.2, 6000.0);
        assert_eq!(next.x, 0.0);
        assert_eq!(next.y, 6000.0);
    }

    #[test]
    fn target_persists_without_retargeting() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut position = Point::new(0.0, 0.0);
        let mut target = Point::new(3000.0, 3000.0);
        for _ in 0..500 {
            move_terminal(&mut position, &mut target, &config(0.0), &mut rng);
        }
        assert_eq!(target, Point::new(3000.0, 3000.0));
        assert!(position.x > 0.0 && position.y > 0.0);
    }

    #[test]
    fn retargets_inside_configured_rectangle() {
        let mut rng = StdRng::seed_from_u64(11);
        let cfg = config(1.0);
        let mut position = Point::new(5000.0, 5000.0);
        let mut target = Point::new(5000.0, 5000.0);
        for _ in 0..200 {
            move_terminal(&mut position, &mut target, &cfg, &mut rng);
            let b = &cfg.retarget_bounds;
            assert!(target.x >= b.x_min && target.x <= b.x_max);
            assert!(target.y >= b.y_min && target.y <= b.y_max);
        }
    }
}
