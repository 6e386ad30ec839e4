// flock_core/src/consensus.rs

use crate::angles::heading_of;
use crate::neighborhood::Neighborhood;
use crate::roster::Roster;

/// Mean direction of a set of headings: `atan2(Σ sin θ, Σ cos θ)`.
///
/// A plain arithmetic mean breaks across the ±π seam (the mean of `π - ε` and
/// `-π + ε` would be `0`). Empty input and headings whose unit vectors cancel
/// have no direction and return `0`.
pub fn circular_mean<I>(headings: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum_cos, sum_sin) = headings
        .into_iter()
        .fold((0.0, 0.0), |(c, s), theta: f64| (c + theta.cos(), s + theta.sin()));
    heading_of(sum_cos, sum_sin)
}

/// Swarm-wide and neighborhood-local mean headings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConsensusHeading {
    /// Over every roster slot, self included.
    pub global: f64,
    /// Over exactly the neighborhood, self excluded.
    pub local: f64,
}

impl ConsensusHeading {
    pub fn compute(roster: &Roster, neighborhood: &Neighborhood) -> Self {
        let global = circular_mean(roster.all_poses().map(|(_, pose)| pose.theta));
        let local = circular_mean(
            neighborhood
                .members()
                .iter()
                .map(|id| roster.get(*id).theta),
        );
        Self { global, local }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::Membership;
    use crate::types::Pose;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn mean_of_identical_headings_is_that_heading() {
        for theta in [-3.0, -FRAC_PI_2, 0.0, 0.7, FRAC_PI_2, 3.1] {
            assert_abs_diff_eq!(circular_mean([theta, theta]), theta, epsilon = 1e-12);
        }
    }

    #[test]
    fn opposite_headings_have_defined_zero_mean() {
        assert_eq!(circular_mean([0.0, PI]), 0.0);
        assert_eq!(circular_mean([FRAC_PI_2, -FRAC_PI_2]), 0.0);
        assert_eq!(circular_mean(std::iter::empty()), 0.0);
    }

    #[test]
    fn mean_wraps_across_the_seam() {
        let mean = circular_mean([PI - 0.1, -PI + 0.1]);
        assert_abs_diff_eq!(mean.abs(), PI, epsilon = 1e-9);
    }

    #[test]
    fn local_heading_uses_only_neighbors() {
        let members = Membership::new(["a", "b", "c"]).unwrap();
        let [a, b, c] = ["a", "b", "c"].map(|n| members.resolve(n).unwrap());
        let mut roster = Roster::new(&members);
        roster.update(a, Pose::new(0.0, 0.0, 0.0));
        roster.update(b, Pose::new(1.0, 0.0, FRAC_PI_2));
        roster.update(c, Pose::new(30.0, 0.0, -FRAC_PI_2));

        let hood = Neighborhood::compute(&roster, a, 2.0);
        let heading = ConsensusHeading::compute(&roster, &hood);

        assert_eq!(hood.members(), &[b]);
        assert_abs_diff_eq!(heading.local, FRAC_PI_2, epsilon = 1e-12);
        // b and c cancel, leaving a's heading.
        assert_abs_diff_eq!(heading.global, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_neighborhood_local_heading_is_zero() {
        let members = Membership::new(["a", "b"]).unwrap();
        let [a, b] = ["a", "b"].map(|n| members.resolve(n).unwrap());
        let mut roster = Roster::new(&members);
        roster.update(a, Pose::new(0.0, 0.0, 1.0));
        roster.update(b, Pose::new(10.0, 0.0, 1.0));

        let hood = Neighborhood::compute(&roster, a, 2.0);
        let heading = ConsensusHeading::compute(&roster, &hood);
        assert_eq!(heading.local, 0.0);
        assert_abs_diff_eq!(heading.global, 1.0, epsilon = 1e-12);
    }
}
