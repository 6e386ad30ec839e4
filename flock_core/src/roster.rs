// flock_core/src/roster.rs

use crate::membership::Membership;
use crate::types::{AgentId, Pose};

/// Last-known pose of every swarm member, self included.
///
/// One slot per member, zeroed until first contact. Slots are overwritten and
/// never removed, so a silent peer keeps its last pose. There are no sequence
/// numbers: an out-of-order duplicate broadcast can briefly replace a newer
/// pose until the peer's next broadcast.
#[derive(Debug, Clone)]
pub struct Roster {
    poses: Vec<Pose>,
}

impl Roster {
    pub fn new(members: &Membership) -> Self {
        Self {
            poses: vec![Pose::zero(); members.len()],
        }
    }

    pub fn update(&mut self, id: AgentId, pose: Pose) {
        self.poses[id.index()] = pose;
    }

    pub fn get(&self, id: AgentId) -> Pose {
        self.poses[id.index()]
    }

    /// Every slot in membership order, independent of arrival order.
    pub fn all_poses(&self) -> impl Iterator<Item = (AgentId, Pose)> + '_ {
        self.poses
            .iter()
            .enumerate()
            .map(|(slot, pose)| (AgentId(slot), *pose))
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}
