use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().trim_start_matches('@').to_owned())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one source data file. Stored identifiers are always bare
/// file names; any directory prefix supplied by the user is stripped so that
/// `/data/bandA.json` and `bandA.json` name the same source.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        let name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
        Self(name.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    AlreadyLinked,
}

/// The persisted association of users to their subscribed source files.
///
/// Each user maps to an ordered, deduplicated list of source identifiers.
/// Per-user insertion order is preserved; users iterate in sorted order so
/// that scheduled batches and persisted bytes are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserSourceMap {
    entries: BTreeMap<UserId, Vec<SourceId>>,
}

impl UserSourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `source` with `user`. A never-seen user gets a fresh empty
    /// list before the append. Linking an already-present source is a no-op.
    pub fn link(&mut self, user: UserId, source: SourceId) -> LinkOutcome {
        let sources = self.entries.entry(user).or_default();
        if sources.contains(&source) {
            return LinkOutcome::AlreadyLinked;
        }

        sources.push(source);
        LinkOutcome::Linked
    }

    pub fn sources_for(&self, user: &UserId) -> Option<&[SourceId]> {
        self.entries.get(user).map(Vec::as_slice)
    }

    pub fn users(&self) -> impl Iterator<Item = (&UserId, &[SourceId])> {
        self.entries.iter().map(|(user, sources)| (user, sources.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn user_count(&self) -> usize {
        self.entries.len()
    }
}
