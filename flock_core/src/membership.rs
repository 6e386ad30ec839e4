// flock_core/src/membership.rs

//! The static swarm membership table.
//!
//! Names are resolved to [`AgentId`] slots through a map built once at
//! startup. Adding a member to the swarm is a one-line configuration edit.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::AgentId;

/// The six rovers of the default swarm, in slot order.
pub const DEFAULT_MEMBERS: [&str; 6] = ["ajax", "aeneas", "achilles", "diomedes", "hector", "paris"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MembershipError {
    #[error("swarm membership must list at least one agent")]
    Empty,
    #[error("agent name at slot {slot} is empty")]
    EmptyName { slot: usize },
    #[error("agent '{name}' is listed more than once")]
    Duplicate { name: String },
}

/// Ordered, immutable list of swarm member names.
#[derive(Debug, Clone)]
pub struct Membership {
    names: Vec<String>,
    slots: HashMap<String, AgentId>,
}

impl Membership {
    /// Builds the lookup table. Names are matched exactly (after trimming).
    pub fn new<I, S>(names: I) -> Result<Self, MembershipError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered = Vec::new();
        let mut slots = HashMap::new();

        for (slot, raw) in names.into_iter().enumerate() {
            let name = raw.as_ref().trim();
            if name.is_empty() {
                return Err(MembershipError::EmptyName { slot });
            }
            if slots.insert(name.to_string(), AgentId(slot)).is_some() {
                return Err(MembershipError::Duplicate {
                    name: name.to_string(),
                });
            }
            ordered.push(name.to_string());
        }

        if ordered.is_empty() {
            return Err(MembershipError::Empty);
        }

        Ok(Self {
            names: ordered,
            slots,
        })
    }

    pub fn resolve(&self, name: &str) -> Option<AgentId> {
        self.slots.get(name).copied()
    }

    /// The member name for a slot. Every `AgentId` comes from this table, so
    /// the lookup cannot miss for ids it produced.
    pub fn name(&self, id: AgentId) -> &str {
        &self.names[id.0]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Every member id in slot order.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        (0..self.names.len()).map(AgentId)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }
}

impl Default for Membership {
    fn default() -> Self {
        Self {
            names: DEFAULT_MEMBERS.iter().map(|n| n.to_string()).collect(),
            slots: DEFAULT_MEMBERS
                .iter()
                .enumerate()
                .map(|(slot, n)| (n.to_string(), AgentId(slot)))
                .collect(),
        }
    }
}
