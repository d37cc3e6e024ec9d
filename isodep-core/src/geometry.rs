//! Angular geometry on the (eta, phi) plane.
//!
//! `Direction` is the only coordinate type in the crate. Cone tests use
//! ΔR = sqrt(Δη² + Δφ²) with Δφ wrapped into (-π, π]; opening-angle tests
//! use the unit 3-vector (cos φ, sin φ, sinh η) normalised.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// A direction in pseudorapidity / azimuth coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Direction {
    pub eta: f64,
    pub phi: f64,
}

impl Direction {
    pub fn new(eta: f64, phi: f64) -> Self {
        Self { eta, phi }
    }

    /// Squared ΔR to `other`.
    pub fn delta_r2(&self, other: &Direction) -> f64 {
        let deta = self.eta - other.eta;
        let dphi = delta_phi(self.phi, other.phi);
        deta * deta + dphi * dphi
    }

    /// ΔR to `other`.
    pub fn delta_r(&self, other: &Direction) -> f64 {
        self.delta_r2(other).sqrt()
    }

    /// Unit 3-vector pointing along this direction.
    pub fn unit_vector(&self) -> [f64; 3] {
        let v = [self.phi.cos(), self.phi.sin(), self.eta.sinh()];
        let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        [v[0] / norm, v[1] / norm, v[2] / norm]
    }

    /// Cosine of the 3D opening angle between two directions.
    pub fn cos_angle(&self, other: &Direction) -> f64 {
        let a = self.unit_vector();
        let b = other.unit_vector();
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(eta={:.4}, phi={:.4})", self.eta, self.phi)
    }
}

/// Azimuthal difference `a - b` wrapped into (-π, π].
pub fn delta_phi(a: f64, b: f64) -> f64 {
    let mut d = (a - b) % (2.0 * PI);
    if d > PI {
        d -= 2.0 * PI;
    } else if d <= -PI {
        d += 2.0 * PI;
    }
    d
}

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub(crate) const DEFAULT_EPSILON: f64 = 1e-10;
