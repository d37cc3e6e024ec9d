//! Association of candidates to their deposit records.
//!
//! Records are grouped per candidate collection; within a group the i-th
//! record belongs to the i-th candidate of that collection. Group order is
//! insertion order and is the iteration order used by the isolator. A
//! collection appears in at most one group; repeated groups in serialized
//! input are merged on load, the same way `insert` merges them.

use serde::{Deserialize, Deserializer, Serialize};

use crate::candidate::{CandidateRef, CollectionId};
use crate::deposit::IsoDeposit;

/// Deposit records of one candidate collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositGroup {
    pub collection: CollectionId,
    pub records: Vec<IsoDeposit>,
}

/// Candidate → deposit record map for one deposit source in one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DepositMap {
    groups: Vec<DepositGroup>,
}

impl<'de> Deserialize<'de> for DepositMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let groups = Vec::<DepositGroup>::deserialize(deserializer)?;
        let mut map = DepositMap::new();
        for group in groups {
            map.insert(group.collection, group.records);
        }
        Ok(map)
    }
}

impl DepositMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the records of one collection. A collection that is already
    /// present gets its records extended.
    pub fn insert(&mut self, collection: impl Into<CollectionId>, records: Vec<IsoDeposit>) {
        let collection = collection.into();
        match self.groups.iter_mut().find(|g| g.collection == collection) {
            Some(group) => group.records.extend(records),
            None => self.groups.push(DepositGroup {
                collection,
                records,
            }),
        }
    }

    pub fn get(&self, cand: &CandidateRef) -> Option<&IsoDeposit> {
        self.group(&cand.collection)
            .and_then(|g| g.records.get(cand.index))
    }

    pub fn contains(&self, cand: &CandidateRef) -> bool {
        self.get(cand).is_some()
    }

    pub fn group(&self, collection: &CollectionId) -> Option<&DepositGroup> {
        self.groups.iter().find(|g| &g.collection == collection)
    }

    pub fn groups(&self) -> &[DepositGroup] {
        &self.groups
    }

    /// Every candidate with a record, grouped by collection then position.
    pub fn keys(&self) -> impl Iterator<Item = CandidateRef> + '_ {
        self.groups.iter().flat_map(|g| {
            (0..g.records.len()).map(move |i| CandidateRef {
                collection: g.collection.clone(),
                index: i,
            })
        })
    }

    /// Total number of records across all collections.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
