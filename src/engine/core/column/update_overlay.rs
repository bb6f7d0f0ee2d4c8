use std::collections::BTreeMap;

use crate::engine::core::txn::Snapshot;
use crate::engine::types::ScalarValue;

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateVersion {
    /// Commit timestamp, or the writer's transaction id while uncommitted.
    pub version: u64,
    pub value: ScalarValue,
}

/// Copy-on-write updates layered over a segment's base values.
///
/// Each updated row offset has a chain of versions, oldest first. At most
/// the newest entry is uncommitted: writers to a row with a pending
/// version from another transaction fail with a write conflict upstream.
#[derive(Debug, Clone, Default)]
pub struct UpdateOverlay {
    chains: BTreeMap<usize, Vec<UpdateVersion>>,
}

impl UpdateOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Number of rows with at least one version.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn push(&mut self, offset: usize, version: u64, value: ScalarValue) {
        self.chains
            .entry(offset)
            .or_default()
            .push(UpdateVersion { version, value });
    }

    /// Newest version visible to `snapshot`, if any.
    pub fn resolve(&self, offset: usize, snapshot: &Snapshot) -> Option<&ScalarValue> {
        self.chains
            .get(&offset)?
            .iter()
            .rev()
            .find(|v| snapshot.sees(v.version))
            .map(|v| &v.value)
    }

    pub fn latest_version(&self, offset: usize) -> Option<u64> {
        self.chains.get(&offset)?.last().map(|v| v.version)
    }

    /// Restamps every version written by `txn_id` on `offset`.
    pub fn commit(&mut self, offset: usize, txn_id: u64, commit_ts: u64) {
        if let Some(chain) = self.chains.get_mut(&offset) {
            for v in chain.iter_mut().filter(|v| v.version == txn_id) {
                v.version = commit_ts;
            }
        }
    }

    /// Removes the newest version written by `txn_id` on `offset`.
    pub fn remove(&mut self, offset: usize, txn_id: u64) -> Option<ScalarValue> {
        let chain = self.chains.get_mut(&offset)?;
        let pos = chain.iter().rposition(|v| v.version == txn_id)?;
        let removed = chain.remove(pos);
        if chain.is_empty() {
            self.chains.remove(&offset);
        }
        Some(removed.value)
    }

    /// Updated offsets in `[start, end)` in ascending order.
    pub fn offsets_in(&self, start: usize, end: usize) -> impl Iterator<Item = usize> + '_ {
        self.chains.range(start..end).map(|(offset, _)| *offset)
    }

    /// All values ever written, for widening statistics.
    pub fn values(&self) -> impl Iterator<Item = &ScalarValue> {
        self.chains.values().flat_map(|c| c.iter().map(|v| &v.value))
    }
}
