// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Opaque, comparable identifier for one message within a task batch.
///
/// A single-connection repository keys messages by the broker's native
/// per-subject sequence number. A clustered repository reads from several
/// replicas that each number their own sequences independently, so it keys
/// messages by a composite of `(connection index, sequence)`, because two
/// replicas can hand out the same sequence number and must not collide in
/// one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Native per-subject sequence number on a single connection.
    Sequence(u64),
    /// Composite identifier disambiguating independently-numbered replicas.
    Replica { connection: usize, sequence: u64 },
}

impl MessageId {
    /// Composite identifier for a message read from connection `connection`.
    pub fn replica(connection: usize, sequence: u64) -> Self {
        Self::Replica {
            connection,
            sequence,
        }
    }

    /// The `(connection, sequence)` parts of a composite identifier, or
    /// `None` for a native sequence id.
    pub fn replica_parts(&self) -> Option<(usize, u64)> {
        match self {
            Self::Replica {
                connection,
                sequence,
            } => Some((*connection, *sequence)),
            Self::Sequence(_) => None,
        }
    }

    /// The broker-native sequence number, regardless of variant.
    pub fn sequence(&self) -> u64 {
        match self {
            Self::Sequence(sequence) | Self::Replica { sequence, .. } => *sequence,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence(sequence) => write!(f, "{}", sequence),
            Self::Replica {
                connection,
                sequence,
            } => write!(f, "{};{}", connection, sequence),
        }
    }
}
