//! One processing unit: candidate collections plus named deposit maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::candidate::{Candidate, CandidateRef, CollectionId};
use crate::deposit_map::DepositMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    #[serde(default)]
    pub candidates: BTreeMap<CollectionId, Vec<Candidate>>,
    #[serde(default)]
    pub deposits: BTreeMap<String, DepositMap>,
}

impl Event {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn add_candidates(&mut self, collection: impl Into<CollectionId>, cands: Vec<Candidate>) {
        self.candidates.entry(collection.into()).or_default().extend(cands);
    }

    pub fn put_deposits(&mut self, source: impl Into<String>, map: DepositMap) {
        self.deposits.insert(source.into(), map);
    }

    pub fn deposits(&self, source: &str) -> Option<&DepositMap> {
        self.deposits.get(source)
    }

    pub fn candidates(&self, collection: &CollectionId) -> Option<&[Candidate]> {
        self.candidates.get(collection).map(|v| v.as_slice())
    }

    pub fn candidate(&self, cand: &CandidateRef) -> Option<&Candidate> {
        self.candidates(&cand.collection)
            .and_then(|v| v.get(cand.index))
    }
}
