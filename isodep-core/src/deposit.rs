//! Deposit record: the energy found around one candidate.
//!
//! An `IsoDeposit` holds the candidate's reference direction, the
//! candidate's own energy (used to normalise relative isolation), a
//! default veto covering the candidate's own footprint, and the list of
//! individual deposit entries.

use serde::{Deserialize, Serialize};

use crate::geometry::Direction;
use crate::veto::Veto;

/// Exclusion region carried by the deposit record itself.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DefaultVeto {
    pub center: Direction,
    pub radius: f64,
}

impl DefaultVeto {
    pub fn contains(&self, dir: &Direction) -> bool {
        self.center.delta_r2(dir) < self.radius * self.radius
    }
}

/// One deposit at an absolute direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepositEntry {
    pub direction: Direction,
    pub value: f64,
}

/// Deposits collected around one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsoDeposit {
    direction: Direction,
    #[serde(default)]
    veto: DefaultVeto,
    #[serde(default)]
    cand_energy: f64,
    #[serde(default)]
    entries: Vec<DepositEntry>,
}

impl IsoDeposit {
    /// Empty deposit centered on `direction`, with a zero-size default veto
    /// at the same place.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            veto: DefaultVeto {
                center: direction,
                radius: 0.0,
            },
            cand_energy: 0.0,
            entries: Vec::new(),
        }
    }

    pub fn with_default_veto(mut self, radius: f64) -> Self {
        self.veto = DefaultVeto {
            center: self.direction,
            radius,
        };
        self
    }

    pub fn set_default_veto(&mut self, veto: DefaultVeto) {
        self.veto = veto;
    }

    pub fn add_cand_energy(&mut self, energy: f64) {
        self.cand_energy += energy;
    }

    pub fn add_deposit(&mut self, direction: Direction, value: f64) {
        self.entries.push(DepositEntry { direction, value });
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn eta(&self) -> f64 {
        self.direction.eta
    }

    pub fn phi(&self) -> f64 {
        self.direction.phi
    }

    pub fn default_veto(&self) -> DefaultVeto {
        self.veto
    }

    /// The candidate's own energy.
    pub fn cand_energy(&self) -> f64 {
        self.cand_energy
    }

    pub fn entries(&self) -> &[DepositEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of entry values within `radius`, after vetoes.
    pub fn deposit_within(&self, radius: f64, vetos: &[Veto], skip_default_veto: bool) -> f64 {
        self.deposit_and_count_within(radius, vetos, skip_default_veto)
            .0
    }

    /// Sum and count of entries within `radius`, after vetoes.
    ///
    /// An entry contributes when its ΔR to the reference direction is at
    /// most `radius`, it lies outside the default veto (unless skipped), and
    /// none of `vetos` excludes it.
    pub fn deposit_and_count_within(
        &self,
        radius: f64,
        vetos: &[Veto],
        skip_default_veto: bool,
    ) -> (f64, usize) {
        let radius2 = radius * radius;
        self.entries
            .iter()
            .filter(|e| self.direction.delta_r2(&e.direction) <= radius2)
            .filter(|e| skip_default_veto || !self.veto.contains(&e.direction))
            .filter(|e| !vetos.iter().any(|v| v.vetoes(&e.direction, e.value)))
            .fold((0.0, 0), |(sum, count), e| (sum + e.value, count + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{assert_approx, DEFAULT_EPSILON};

    fn sample() -> IsoDeposit {
        let mut dep = IsoDeposit::new(Direction::new(0.0, 0.0)).with_default_veto(0.01);
        dep.add_cand_energy(25.0);
        dep.add_deposit(Direction::new(0.005, 0.0), 10.0); // inside default veto
        dep.add_deposit(Direction::new(0.1, 0.0), 2.0);
        dep.add_deposit(Direction::new(0.0, 0.2), 0.5);
        dep.add_deposit(Direction::new(0.35, 0.0), 4.0);
        dep
    }

    #[test]
    fn cone_radius_selects_entries() {
        let dep = sample();
        assert_approx(dep.deposit_within(0.15, &[], false), 2.0, DEFAULT_EPSILON);
        assert_approx(dep.deposit_within(0.3, &[], false), 2.5, DEFAULT_EPSILON);
        assert_approx(dep.deposit_within(0.5, &[], false), 6.5, DEFAULT_EPSILON);
    }

    #[test]
    fn cone_boundary_is_inclusive() {
        let dep = sample();
        assert_eq!(dep.deposit_and_count_within(0.1, &[], false), (2.0, 1));
    }

    #[test]
    fn skip_default_veto_includes_self_footprint() {
        let dep = sample();
        assert_eq!(dep.deposit_and_count_within(0.15, &[], true), (12.0, 2));
    }

    #[test]
    fn vetoes_remove_entries() {
        let dep = sample();
        let vetos = [Veto::threshold(1.0)];
        assert_eq!(dep.deposit_and_count_within(0.5, &vetos, false), (6.0, 2));

        let cone = [Veto::cone(0.15).centered_on(dep.direction())];
        assert_eq!(dep.deposit_and_count_within(0.5, &cone, true), (4.5, 2));
    }

    #[test]
    fn zero_radius_with_no_entries_at_center() {
        let dep = sample();
        assert_eq!(dep.deposit_and_count_within(0.0, &[], true), (0.0, 0));
    }

    #[test]
    fn accessors() {
        let dep = sample();
        assert_eq!(dep.len(), 4);
        assert!(!dep.is_empty());
        assert_eq!(dep.cand_energy(), 25.0);
        assert_eq!(dep.default_veto().radius, 0.01);
        assert_eq!(dep.eta(), 0.0);
    }

    #[test]
    fn json_roundtrip_with_defaults() {
        let dep: IsoDeposit = serde_json::from_str(
            r#"{"direction": {"eta": 0.1, "phi": 0.2},
                "entries": [{"direction": {"eta": 0.15, "phi": 0.2}, "value": 1.5}]}"#,
        )
        .unwrap();
        assert_eq!(dep.cand_energy(), 0.0);
        assert_eq!(dep.default_veto().radius, 0.0);
        assert_approx(dep.deposit_within(0.1, &[], false), 1.5, DEFAULT_EPSILON);
    }
}
