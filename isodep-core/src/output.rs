//! Output association: candidate → isolation value.
//!
//! Values are stored per candidate collection, in the same position order
//! as the collection itself. A map is filled once per event through a
//! [`ValueMapFiller`]; a filled map is immutable.
//!
//! Values may be non-finite (`sumRelative` with zero reference energy). They
//! serialize as the strings `"inf"`, `"-inf"` and `"NaN"` so that formats
//! without IEEE specials, such as JSON, keep them.

use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateRef, CollectionId};
use crate::isolator::IsolationError;

/// Values of one candidate collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueGroup {
    pub collection: CollectionId,
    #[serde(with = "ieee_values")]
    pub values: Vec<f64>,
}

mod ieee_values {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Special(String),
    }

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        values
            .iter()
            .map(|&v| match v {
                v if v.is_finite() => Repr::Number(v),
                v if v.is_nan() => Repr::Special("NaN".to_string()),
                v if v > 0.0 => Repr::Special("inf".to_string()),
                _ => Repr::Special("-inf".to_string()),
            })
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Repr>::deserialize(deserializer)?
            .into_iter()
            .map(|repr| match repr {
                Repr::Number(v) => Ok(v),
                Repr::Special(s) => match s.as_str() {
                    "NaN" => Ok(f64::NAN),
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    other => Err(D::Error::custom(format!("invalid value '{other}'"))),
                },
            })
            .collect()
    }
}

/// Per-event isolation values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandValueMap {
    groups: Vec<ValueGroup>,
}

impl CandValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cand: &CandidateRef) -> Option<f64> {
        self.groups
            .iter()
            .find(|g| g.collection == cand.collection)
            .and_then(|g| g.values.get(cand.index).copied())
    }

    pub fn groups(&self) -> &[ValueGroup] {
        &self.groups
    }

    /// `(candidate, value)` pairs in collection order.
    pub fn iter(&self) -> impl Iterator<Item = (CandidateRef, f64)> + '_ {
        self.groups.iter().flat_map(|g| {
            g.values.iter().enumerate().map(move |(i, &v)| {
                (
                    CandidateRef {
                        collection: g.collection.clone(),
                        index: i,
                    },
                    v,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collects per-collection value vectors, then produces the map.
#[derive(Debug, Default)]
pub struct ValueMapFiller {
    groups: Vec<ValueGroup>,
}

impl ValueMapFiller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the values of one collection. Each collection may be inserted once.
    pub fn insert(
        &mut self,
        collection: CollectionId,
        values: Vec<f64>,
    ) -> Result<(), IsolationError> {
        if self.groups.iter().any(|g| g.collection == collection) {
            return Err(IsolationError::DuplicateCollection(collection));
        }
        self.groups.push(ValueGroup { collection, values });
        Ok(())
    }

    pub fn fill(self) -> CandValueMap {
        CandValueMap {
            groups: self.groups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_and_lookup() {
        let mut filler = ValueMapFiller::new();
        filler.insert("muons".into(), vec![1.0, 2.0]).unwrap();
        filler.insert("electrons".into(), vec![3.0]).unwrap();
        let map = filler.fill();

        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&CandidateRef::new("muons", 1)), Some(2.0));
        assert_eq!(map.get(&CandidateRef::new("electrons", 0)), Some(3.0));
        assert_eq!(map.get(&CandidateRef::new("electrons", 1)), None);
    }

    #[test]
    fn iteration_keeps_collection_order() {
        let mut filler = ValueMapFiller::new();
        filler.insert("b".into(), vec![1.0]).unwrap();
        filler.insert("a".into(), vec![2.0, 3.0]).unwrap();
        let pairs: Vec<(String, f64)> = filler
            .fill()
            .iter()
            .map(|(r, v)| (r.to_string(), v))
            .collect();
        assert_eq!(
            pairs,
            vec![("b[0]".into(), 1.0), ("a[0]".into(), 2.0), ("a[1]".into(), 3.0)]
        );
    }

    #[test]
    fn duplicate_collection_rejected() {
        let mut filler = ValueMapFiller::new();
        filler.insert("muons".into(), vec![1.0]).unwrap();
        let err = filler.insert("muons".into(), vec![2.0]).unwrap_err();
        assert!(matches!(err, IsolationError::DuplicateCollection(_)));
    }

    #[test]
    fn non_finite_values_survive_json() {
        let mut filler = ValueMapFiller::new();
        filler
            .insert("muons".into(), vec![1.5, f64::INFINITY, f64::NEG_INFINITY, f64::NAN])
            .unwrap();
        let map = filler.fill();

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"[{"collection":"muons","values":[1.5,"inf","-inf","NaN"]}]"#
        );

        let back: CandValueMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&CandidateRef::new("muons", 0)), Some(1.5));
        assert_eq!(back.get(&CandidateRef::new("muons", 1)), Some(f64::INFINITY));
        assert_eq!(back.get(&CandidateRef::new("muons", 2)), Some(f64::NEG_INFINITY));
        assert!(back.get(&CandidateRef::new("muons", 3)).unwrap().is_nan());
    }

    #[test]
    fn unknown_value_string_rejected() {
        let err = serde_json::from_str::<CandValueMap>(
            r#"[{"collection":"muons","values":["infinity"]}]"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn empty_filler_gives_empty_map() {
        let map = ValueMapFiller::new().fill();
        assert!(map.is_empty());
        assert_eq!(map, CandValueMap::new());
    }
}
