//! Candidate objects and their stable identities.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Direction;

/// Name of a candidate collection within an event (e.g. "muons").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub String);

impl CollectionId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Reference to one candidate: its collection plus its position in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateRef {
    pub collection: CollectionId,
    pub index: usize,
}

impl CandidateRef {
    pub fn new(collection: impl Into<CollectionId>, index: usize) -> Self {
        Self {
            collection: collection.into(),
            index,
        }
    }
}

impl fmt::Display for CandidateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.collection, self.index)
    }
}

/// A reconstructed particle candidate.
///
/// Only the kinematics needed by weight expressions are stored; everything
/// else is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub energy: f64,
    #[serde(default)]
    pub mass: f64,
    #[serde(default)]
    pub charge: i32,
}

impl Candidate {
    /// Massless candidate with energy derived from pt and eta.
    pub fn from_pt_eta_phi(pt: f64, eta: f64, phi: f64) -> Self {
        Self {
            pt,
            eta,
            phi,
            energy: pt * eta.cosh(),
            mass: 0.0,
            charge: 0,
        }
    }

    pub fn with_charge(mut self, charge: i32) -> Self {
        self.charge = charge;
        self
    }

    pub fn direction(&self) -> Direction {
        Direction::new(self.eta, self.phi)
    }

    pub fn px(&self) -> f64 {
        self.pt * self.phi.cos()
    }

    pub fn py(&self) -> f64 {
        self.pt * self.phi.sin()
    }

    pub fn pz(&self) -> f64 {
        self.pt * self.eta.sinh()
    }

    pub fn p(&self) -> f64 {
        self.pt * self.eta.cosh()
    }

    /// Polar angle.
    pub fn theta(&self) -> f64 {
        2.0 * (-self.eta).exp().atan()
    }

    /// Transverse energy, E·sin(θ).
    pub fn et(&self) -> f64 {
        self.energy * self.theta().sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{assert_approx, DEFAULT_EPSILON};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn central_candidate_kinematics() {
        let c = Candidate::from_pt_eta_phi(20.0, 0.0, 0.0);
        assert_approx(c.theta(), FRAC_PI_2, DEFAULT_EPSILON);
        assert_approx(c.energy, 20.0, DEFAULT_EPSILON);
        assert_approx(c.et(), 20.0, DEFAULT_EPSILON);
        assert_approx(c.px(), 20.0, DEFAULT_EPSILON);
        assert_approx(c.pz(), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn massless_p_equals_energy() {
        let c = Candidate::from_pt_eta_phi(15.0, 1.3, -2.0);
        assert_approx(c.p(), c.energy, 1e-9);
        let p2 = c.px().powi(2) + c.py().powi(2) + c.pz().powi(2);
        assert_approx(p2.sqrt(), c.p(), 1e-9);
    }

    #[test]
    fn massless_et_equals_pt() {
        let c = Candidate::from_pt_eta_phi(15.0, -1.9, 0.4);
        assert_approx(c.et(), c.pt, 1e-9);
    }

    #[test]
    fn candidate_ref_display() {
        assert_eq!(CandidateRef::new("muons", 3).to_string(), "muons[3]");
    }

    #[test]
    fn candidate_json_defaults() {
        let c: Candidate =
            serde_json::from_str(r#"{"pt": 10.0, "eta": 0.5, "phi": 1.0, "energy": 11.3}"#)
                .unwrap();
        assert_eq!(c.mass, 0.0);
        assert_eq!(c.charge, 0);
    }
}
