//! Side resolution for a single path.
//!
//! Decides whether the local and remote copies of one path hold the same
//! content and, when they do not, which copy should overwrite the other.

use crate::metadata::FileMetadata;
use crate::types::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Winner when both copies exist, hashes differ and timestamps are identical.
///
/// The server wins. This is a policy, not a fallthrough: change it here and
/// every equal-timestamp resolution follows.
pub const EQUAL_TIMESTAMP_WINNER: Side = Side::Remote;

/// What applying a change does to the non-authoritative side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The other side has no copy yet.
    Create,
    /// The other side has a copy with different content.
    Modify,
}

/// Which rule picked the authoritative side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Only one side has the file.
    OnlyOneSide,
    /// Both sides have it; the strictly later modification won.
    NewerWins,
    /// Both sides have it with identical timestamps; [`EQUAL_TIMESTAMP_WINNER`] won.
    TieBreak,
}

/// Outcome of [`compare`] when the two copies differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub authoritative_side: Side,
    pub kind: ChangeKind,
    pub resolution: Resolution,
    pub last_modified: DateTime<Utc>,
    pub file_size: u64,
}

impl Comparison {
    fn winner(side: Side, metadata: &FileMetadata, kind: ChangeKind, resolution: Resolution) -> Self {
        Comparison {
            authoritative_side: side,
            kind,
            resolution,
            last_modified: metadata.last_modified,
            file_size: metadata.size,
        }
    }
}

/// `compare` was asked about a path that neither side has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("path is present on neither side")]
pub struct NeitherSidePresent;

/// Compare the two copies of one path.
///
/// Returns `Ok(None)` when the hashes match, whatever the timestamps or sizes
/// say. Entries with an empty hash count as absent.
pub fn compare(
    local: Option<&FileMetadata>,
    remote: Option<&FileMetadata>,
) -> Result<Option<Comparison>, NeitherSidePresent> {
    let local = local.filter(|m| m.exists());
    let remote = remote.filter(|m| m.exists());

    let (local, remote) = match (local, remote) {
        (None, None) => return Err(NeitherSidePresent),
        (None, Some(remote)) => {
            return Ok(Some(Comparison::winner(
                Side::Remote,
                remote,
                ChangeKind::Create,
                Resolution::OnlyOneSide,
            )))
        }
        (Some(local), None) => {
            return Ok(Some(Comparison::winner(
                Side::Local,
                local,
                ChangeKind::Create,
                Resolution::OnlyOneSide,
            )))
        }
        (Some(local), Some(remote)) => (local, remote),
    };

    if local.same_content(remote) {
        return Ok(None);
    }

    let comparison = if local.last_modified > remote.last_modified {
        Comparison::winner(Side::Local, local, ChangeKind::Modify, Resolution::NewerWins)
    } else if remote.last_modified > local.last_modified {
        Comparison::winner(Side::Remote, remote, ChangeKind::Modify, Resolution::NewerWins)
    } else {
        let winner = match EQUAL_TIMESTAMP_WINNER {
            Side::Local => local,
            Side::Remote => remote,
        };
        Comparison::winner(
            EQUAL_TIMESTAMP_WINNER,
            winner,
            ChangeKind::Modify,
            Resolution::TieBreak,
        )
    };
    Ok(Some(comparison))
}
