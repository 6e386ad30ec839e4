// flock_core/src/angles.rs

use std::f64::consts::PI;

/// Below this resultant length a set of headings has no meaningful direction.
pub const RESULTANT_EPSILON: f64 = 1e-9;

/// Direction of the vector `(x, y)`, with the zero vector defined as heading `0`.
///
/// `f64::atan2` returns `±π` for `(±0.0, -0.0)`, and a resultant built from
/// cancelling headings is rarely exactly zero, so anything shorter than
/// [`RESULTANT_EPSILON`] maps to `0`.
pub fn heading_of(x: f64, y: f64) -> f64 {
    if x.hypot(y) < RESULTANT_EPSILON {
        0.0
    } else {
        y.atan2(x)
    }
}

/// Wraps an angle into `[-π, π]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut wrapped = angle % (2.0 * PI);
    if wrapped > PI {
        wrapped -= 2.0 * PI;
    } else if wrapped < -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn zero_vector_has_zero_heading() {
        assert_eq!(heading_of(0.0, 0.0), 0.0);
        assert_eq!(heading_of(-0.0, -0.0), 0.0);
        assert_eq!(heading_of(1e-12, -1e-12), 0.0);
    }

    #[test]
    fn heading_follows_atan2() {
        assert_abs_diff_eq!(heading_of(0.0, 2.0), FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(heading_of(-1.0, 0.0), PI, epsilon = 1e-12);
    }

    #[test]
    fn normalize_wraps_into_range() {
        assert_abs_diff_eq!(normalize_angle(3.0 * PI / 2.0), -FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(-3.0 * PI / 2.0), FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_angle(7.0 * FRAC_PI_2), -FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(normalize_angle(0.25), 0.25, epsilon = 1e-12);
    }
}
