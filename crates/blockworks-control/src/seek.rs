//! Bang-bang position seeking: drive at a fixed speed toward a target and
//! hold once inside the tolerance band.

/// `true` when `position` is within `tolerance` of `target` (inclusive).
pub fn within_tolerance(position: f32, target: f32, tolerance: f32) -> bool {
    (position - target).abs() <= tolerance
}

/// Velocity to command this tick: `+speed` below the band, `-speed` above
/// it, `0.0` inside it.
pub fn seek_velocity(position: f32, target: f32, speed: f32, tolerance: f32) -> f32 {
    if within_tolerance(position, target, tolerance) {
        0.0
    } else if position < target {
        speed
    } else {
        -speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drives_toward_target() {
        assert!((seek_velocity(0.0, 2.51, 0.5, 0.1) - 0.5).abs() < f32::EPSILON);
        assert!((seek_velocity(4.89, 2.51, 0.5, 0.1) + 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn holds_inside_band() {
        assert_eq!(seek_velocity(2.45, 2.51, 0.5, 0.1), 0.0);
        assert_eq!(seek_velocity(2.59, 2.51, 0.5, 0.1), 0.0);
        assert_eq!(seek_velocity(2.51, 2.51, 0.5, 0.0), 0.0);
    }

    #[test]
    fn band_edge_is_inclusive() {
        assert!(within_tolerance(1.0, 1.5, 0.5));
        assert!(!within_tolerance(0.9, 1.5, 0.5));
    }
}
