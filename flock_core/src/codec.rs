// flock_core/src/codec.rs

//! Wire text for pose broadcasts: `<agentName>, <x>, <y>, <theta>`.

use thiserror::Error;

use crate::membership::Membership;
use crate::types::{AgentId, Pose};

const FIELD_COUNT: usize = 4;

/// Why a pose broadcast was rejected. A rejected message never touches the roster.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected 4 comma-separated fields, found {found}")]
    FieldCount { found: usize },
    #[error("field '{field}' is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field '{field}' is not finite")]
    NonFinite { field: &'static str },
    #[error("unknown agent '{name}'")]
    UnknownAgent { name: String },
}

/// Renders a pose broadcast. Rust's float formatting is shortest-round-trip,
/// so decoding the result reproduces the pose exactly.
pub fn encode_pose(name: &str, pose: &Pose) -> String {
    format!("{}, {}, {}, {}", name, pose.x, pose.y, pose.theta)
}

/// Parses a pose broadcast and resolves its sender against the membership table.
pub fn decode_pose(text: &str, members: &Membership) -> Result<(AgentId, Pose), ParseError> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount {
            found: fields.len(),
        });
    }

    // Numbers first: a malformed message is malformed regardless of who sent it.
    let x = parse_field("x", fields[1])?;
    let y = parse_field("y", fields[2])?;
    let theta = parse_field("theta", fields[3])?;

    let id = members
        .resolve(fields[0])
        .ok_or_else(|| ParseError::UnknownAgent {
            name: fields[0].to_string(),
        })?;

    Ok((id, Pose::new(x, y, theta)))
}

fn parse_field(field: &'static str, value: &str) -> Result<f64, ParseError> {
    let parsed: f64 = value.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: value.to_string(),
    })?;
    if !parsed.is_finite() {
        return Err(ParseError::NonFinite { field });
    }
    Ok(parsed)
}
