// flock_core/src/neighborhood.rs

use nalgebra::Vector2;

use crate::angles::heading_of;
use crate::roster::Roster;
use crate::types::AgentId;

/// Members strictly closer to `self` than the proximity threshold, and the
/// summed offset toward them.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood {
    owner: AgentId,
    members: Vec<AgentId>,
    bearing: Vector2<f64>,
}

impl Neighborhood {
    /// Scans the roster around `owner`. The owner is never its own neighbor.
    pub fn compute(roster: &Roster, owner: AgentId, threshold: f64) -> Self {
        let origin = roster.get(owner);
        let mut members = Vec::new();
        let mut bearing = Vector2::zeros();

        for (id, pose) in roster.all_poses() {
            if id == owner {
                continue;
            }
            let offset = pose.position() - origin.position();
            if offset.norm() < threshold {
                members.push(id);
                bearing += offset;
            }
        }

        Self {
            owner,
            members,
            bearing,
        }
    }

    /// An empty neighborhood, used before the first broadcast arrives.
    pub fn empty(owner: AgentId) -> Self {
        Self {
            owner,
            members: Vec::new(),
            bearing: Vector2::zeros(),
        }
    }

    pub fn owner(&self) -> AgentId {
        self.owner
    }

    /// Neighbor ids in membership order.
    pub fn members(&self) -> &[AgentId] {
        &self.members
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `(sumDx, sumDy)` from the owner toward each neighbor.
    pub fn bearing(&self) -> Vector2<f64> {
        self.bearing
    }

    /// Heading of the bearing vector; `0` when there is nothing to steer toward.
    pub fn direction_theta(&self) -> f64 {
        heading_of(self.bearing.x, self.bearing.y)
    }
}
