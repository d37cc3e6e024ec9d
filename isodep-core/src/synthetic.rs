//! Seeded synthetic events for demos, benches and tests.
//!
//! Each event holds a `muons` collection and two deposit sources:
//! - `tracker`: the muon's own track sits inside a 0.01 default veto, plus
//!   a handful of soft tracks spread over ΔR < 0.5.
//! - `ecal`: centered on a slightly displaced impact point, with a 0.07
//!   default veto and soft energy towers.
//!
//! The same seed always produces the same event sequence.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::candidate::Candidate;
use crate::deposit::IsoDeposit;
use crate::deposit_map::DepositMap;
use crate::event::Event;
use crate::geometry::{delta_phi, Direction};

pub const MUONS: &str = "muons";
pub const TRACKER: &str = "tracker";
pub const ECAL: &str = "ecal";

/// Radius of the area populated with soft deposits.
const SPREAD: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct EventGenerator {
    rng: StdRng,
    max_muons: usize,
    max_tracks: usize,
    max_towers: usize,
    next_id: u64,
}

impl EventGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max_muons: 3,
            max_tracks: 8,
            max_towers: 12,
            next_id: 0,
        }
    }

    /// Upper bound on muons per event (inclusive). Zero yields empty events.
    pub fn with_max_muons(mut self, max_muons: usize) -> Self {
        self.max_muons = max_muons;
        self
    }

    pub fn next_event(&mut self) -> Event {
        let mut event = Event::new(self.next_id);
        self.next_id += 1;

        let n = self.rng.gen_range(0..=self.max_muons);
        let muons: Vec<Candidate> = (0..n).map(|_| self.muon()).collect();

        let tracker: Vec<IsoDeposit> = muons.iter().map(|m| self.tracker_deposit(m)).collect();
        let ecal: Vec<IsoDeposit> = muons.iter().map(|m| self.ecal_deposit(m)).collect();

        let mut tracker_map = DepositMap::new();
        tracker_map.insert(MUONS, tracker);
        let mut ecal_map = DepositMap::new();
        ecal_map.insert(MUONS, ecal);

        event.add_candidates(MUONS, muons);
        event.put_deposits(TRACKER, tracker_map);
        event.put_deposits(ECAL, ecal_map);
        event
    }

    pub fn events(&mut self, count: usize) -> Vec<Event> {
        (0..count).map(|_| self.next_event()).collect()
    }

    fn muon(&mut self) -> Candidate {
        let pt = self.rng.gen_range(5.0..100.0);
        let eta = self.rng.gen_range(-2.4..2.4);
        let phi = self.rng.gen_range(-PI..PI);
        let charge = if self.rng.gen_bool(0.5) { 1 } else { -1 };
        Candidate::from_pt_eta_phi(pt, eta, phi).with_charge(charge)
    }

    /// A direction within `radius` of `center`.
    fn near(&mut self, center: Direction, radius: f64) -> Direction {
        let r = radius * self.rng.gen::<f64>().sqrt();
        let angle = self.rng.gen_range(-PI..PI);
        let eta = center.eta + r * angle.cos();
        let phi = delta_phi(center.phi + r * angle.sin(), 0.0);
        Direction::new(eta, phi)
    }

    fn soft_value(&mut self, scale: f64) -> f64 {
        // exponential with mean `scale`
        -scale * (1.0 - self.rng.gen::<f64>()).ln()
    }

    fn tracker_deposit(&mut self, muon: &Candidate) -> IsoDeposit {
        let axis = muon.direction();
        let mut dep = IsoDeposit::new(axis).with_default_veto(0.01);
        dep.add_cand_energy(muon.pt);

        let own = self.near(axis, 0.002);
        dep.add_deposit(own, muon.pt);

        let tracks = self.rng.gen_range(0..=self.max_tracks);
        for _ in 0..tracks {
            let dir = self.near(axis, SPREAD);
            let pt = 0.5 + self.soft_value(1.5);
            dep.add_deposit(dir, pt);
        }
        dep
    }

    fn ecal_deposit(&mut self, muon: &Candidate) -> IsoDeposit {
        let impact = self.near(muon.direction(), 0.02);
        let mut dep = IsoDeposit::new(impact).with_default_veto(0.07);
        dep.add_cand_energy(muon.energy);

        // minimum-ionising footprint
        let mip = self.near(impact, 0.03);
        dep.add_deposit(mip, 0.3 + self.soft_value(0.2));

        let towers = self.rng.gen_range(0..=self.max_towers);
        for _ in 0..towers {
            let dir = self.near(impact, SPREAD);
            let et = self.soft_value(0.8);
            dep.add_deposit(dir, et);
        }
        dep
    }
}

impl Iterator for EventGenerator {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        Some(self.next_event())
    }
}
