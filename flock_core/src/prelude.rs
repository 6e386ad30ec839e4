// flock_core/src/prelude.rs

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::membership::{Membership, MembershipError};
pub use crate::messages::Odometry;
pub use crate::roster::Roster;
pub use crate::types::{AgentId, Pose, VelocityCommand};

// --- Wire Format ---
pub use crate::codec::{decode_pose, encode_pose, ParseError};

// --- Consensus Algorithms ---
pub use crate::consensus::{circular_mean, ConsensusHeading};
pub use crate::neighborhood::Neighborhood;

// --- Control ---
pub use crate::control::{
    ActuationScale, ControlInput, ControlOutput, ControllerGains, MotionController, MotionState,
    OperatingMode,
};
pub use crate::watchdog::Watchdog;
