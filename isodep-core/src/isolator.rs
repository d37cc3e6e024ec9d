//! Per-candidate isolation from one or more deposit sources.
//!
//! A `SourceEvaluator` owns the parsed configuration of one deposit source
//! (cone radius, vetoes, weight, mode). Each event it is opened against the
//! event's deposit map for that source, producing a `BoundSource` that
//! computes the source's scalar for a candidate.
//!
//! A `CandIsolator` holds the ordered evaluators. For every candidate in
//! its object universe (by default: the candidates indexed by the first
//! source) it sums the scalars of all sources and writes the total into a
//! `CandValueMap`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, trace};

use crate::candidate::{Candidate, CandidateRef, CollectionId};
use crate::config::{ConfigError, DepositConfig, IsolatorConfig, ObjectUniverse, ZeroEnergyPolicy};
use crate::deposit::IsoDeposit;
use crate::deposit_map::DepositMap;
use crate::event::Event;
use crate::expr::ExprError;
use crate::output::{CandValueMap, ValueMapFiller};
use crate::veto::{center_all, parse_vetos, Veto};
use crate::weight::Weight;

/// Errors raised while processing an event.
#[derive(Debug, Error)]
pub enum IsolationError {
    #[error("deposit source '{0}' not found in event")]
    MissingSource(String),

    #[error("no deposit for {cand} in source '{name}'")]
    MissingDeposit { name: String, cand: CandidateRef },

    #[error("candidate {0} not found in event")]
    MissingCandidate(CandidateRef),

    #[error("collection '{0}' filled twice")]
    DuplicateCollection(CollectionId),

    #[error("zero reference energy for {0} in sumRelative mode")]
    ZeroReferenceEnergy(CandidateRef),

    #[error("weight for {cand}: {error}")]
    Weight {
        cand: CandidateRef,
        #[source]
        error: ExprError,
    },
}

// ─── Mode ────────────────────────────────────────────────────────────

/// How the deposit within the cone becomes a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationMode {
    /// weight × deposit
    Sum,
    /// weight × deposit / candidate energy
    SumRelative,
    /// weight × number of contributing entries
    Count,
}

impl IsolationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationMode::Sum => "sum",
            IsolationMode::SumRelative => "sumRelative",
            IsolationMode::Count => "count",
        }
    }
}

impl FromStr for IsolationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(IsolationMode::Sum),
            "sumRelative" => Ok(IsolationMode::SumRelative),
            "count" => Ok(IsolationMode::Count),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Single source ───────────────────────────────────────────────────

/// Parsed, validated configuration of one deposit source.
#[derive(Debug, Clone)]
pub struct SourceEvaluator {
    source: String,
    delta_r: f64,
    vetos: Vec<Veto>,
    weight: Weight,
    mode: IsolationMode,
    skip_default_veto: bool,
    zero_energy: ZeroEnergyPolicy,
}

impl SourceEvaluator {
    pub fn from_config(
        config: &DepositConfig,
        zero_energy: ZeroEnergyPolicy,
    ) -> Result<Self, ConfigError> {
        let mode: IsolationMode = config.mode.parse()?;
        if config.source.is_empty() {
            return Err(ConfigError::EmptySource);
        }
        if !config.delta_r.is_finite() || config.delta_r < 0.0 {
            return Err(ConfigError::InvalidConeRadius {
                name: config.source.clone(),
                delta_r: config.delta_r,
            });
        }
        let vetos = parse_vetos(&config.vetos)?;
        let weight = Weight::resolve(&config.weight)?;

        debug!(
            source = %config.source,
            delta_r = config.delta_r,
            mode = %mode,
            weight = %weight,
            vetos = vetos.len(),
            "configured deposit source"
        );

        Ok(Self {
            source: config.source.clone(),
            delta_r: config.delta_r,
            vetos,
            weight,
            mode,
            skip_default_veto: config.skip_default_veto,
            zero_energy,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn delta_r(&self) -> f64 {
        self.delta_r
    }

    pub fn vetos(&self) -> &[Veto] {
        &self.vetos
    }

    pub fn weight(&self) -> &Weight {
        &self.weight
    }

    pub fn mode(&self) -> IsolationMode {
        self.mode
    }

    pub fn skip_default_veto(&self) -> bool {
        self.skip_default_veto
    }

    /// Bind to this event's deposit map for the configured source.
    pub fn open<'e>(&'e self, event: &'e Event) -> Result<BoundSource<'e>, IsolationError> {
        let map = event
            .deposits(&self.source)
            .ok_or_else(|| IsolationError::MissingSource(self.source.clone()))?;
        Ok(BoundSource {
            evaluator: self,
            map,
        })
    }

    /// Scalar for `cand` given its deposit record.
    pub fn compute_for(
        &self,
        dep: &IsoDeposit,
        cand_ref: &CandidateRef,
        cand: &Candidate,
    ) -> Result<f64, IsolationError> {
        // Deposit direction, not candidate direction: for calorimeter
        // deposits this is the impact point.
        let vetos = center_all(&self.vetos, dep.direction());

        let weight = self
            .weight
            .value_for(cand)
            .map_err(|error| IsolationError::Weight {
                cand: cand_ref.clone(),
                error,
            })?;

        let (deposit, count) =
            dep.deposit_and_count_within(self.delta_r, &vetos, self.skip_default_veto);

        match self.mode {
            IsolationMode::Sum => Ok(weight * deposit),
            IsolationMode::SumRelative => {
                if self.zero_energy == ZeroEnergyPolicy::Error && dep.cand_energy() == 0.0 {
                    return Err(IsolationError::ZeroReferenceEnergy(cand_ref.clone()));
                }
                Ok(weight * deposit / dep.cand_energy())
            }
            IsolationMode::Count => Ok(weight * count as f64),
        }
    }
}

/// A `SourceEvaluator` bound to one event's deposit map.
#[derive(Debug, Clone, Copy)]
pub struct BoundSource<'e> {
    evaluator: &'e SourceEvaluator,
    map: &'e DepositMap,
}

impl<'e> BoundSource<'e> {
    pub fn map(&self) -> &'e DepositMap {
        self.map
    }

    pub fn evaluator(&self) -> &'e SourceEvaluator {
        self.evaluator
    }

    /// Scalar for `cand`. The candidate must have a record in this source.
    pub fn compute(&self, cand_ref: &CandidateRef, cand: &Candidate) -> Result<f64, IsolationError> {
        let dep = self
            .map
            .get(cand_ref)
            .ok_or_else(|| IsolationError::MissingDeposit {
                name: self.evaluator.source.clone(),
                cand: cand_ref.clone(),
            })?;
        self.evaluator.compute_for(dep, cand_ref, cand)
    }

    /// Like `compute`, but a candidate without a record contributes zero.
    pub fn compute_or_zero(
        &self,
        cand_ref: &CandidateRef,
        cand: &Candidate,
    ) -> Result<f64, IsolationError> {
        match self.map.get(cand_ref) {
            Some(dep) => self.evaluator.compute_for(dep, cand_ref, cand),
            None => Ok(0.0),
        }
    }
}

// ─── Aggregator ──────────────────────────────────────────────────────

/// Sums the isolation of several deposit sources per candidate.
#[derive(Debug, Clone)]
pub struct CandIsolator {
    label: Option<String>,
    sources: Vec<SourceEvaluator>,
    universe: ObjectUniverse,
}

impl CandIsolator {
    pub fn from_config(config: &IsolatorConfig) -> Result<Self, ConfigError> {
        let sources = config
            .deposits
            .iter()
            .map(|d| SourceEvaluator::from_config(d, config.zero_energy))
            .collect::<Result<Vec<_>, _>>()?;
        if sources.is_empty() {
            return Err(ConfigError::NoDeposits);
        }
        debug!(
            sources = sources.len(),
            universe = ?config.object_universe,
            "isolator ready"
        );
        Ok(Self {
            label: config.label.clone(),
            sources,
            universe: config.object_universe,
        })
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn sources(&self) -> &[SourceEvaluator] {
        &self.sources
    }

    pub fn object_universe(&self) -> ObjectUniverse {
        self.universe
    }

    /// Compute the isolation of every candidate in the object universe.
    pub fn produce(&self, event: &Event) -> Result<CandValueMap, IsolationError> {
        let bound = self
            .sources
            .iter()
            .map(|s| s.open(event))
            .collect::<Result<Vec<_>, _>>()?;

        let universe = collection_sizes(&bound, self.universe);
        if universe.iter().all(|(_, n)| *n == 0) {
            debug!(event = event.id, "no candidates to isolate");
            return Ok(CandValueMap::new());
        }

        let mut filler = ValueMapFiller::new();
        for (collection, size) in universe {
            let mut values = vec![0.0; size];
            for (index, slot) in values.iter_mut().enumerate() {
                let cand_ref = CandidateRef {
                    collection: collection.clone(),
                    index,
                };
                let cand = event
                    .candidate(&cand_ref)
                    .ok_or_else(|| IsolationError::MissingCandidate(cand_ref.clone()))?;

                let mut sum = 0.0;
                for source in &bound {
                    sum += match self.universe {
                        ObjectUniverse::Primary => source.compute(&cand_ref, cand)?,
                        ObjectUniverse::Union => source.compute_or_zero(&cand_ref, cand)?,
                    };
                }
                *slot = sum;
            }
            filler.insert(collection, values)?;
        }

        let output = filler.fill();
        trace!(event = event.id, candidates = output.len(), "isolation computed");
        Ok(output)
    }
}

/// Collections to process and how many candidates each holds.
fn collection_sizes(bound: &[BoundSource<'_>], universe: ObjectUniverse) -> Vec<(CollectionId, usize)> {
    let maps: &[BoundSource<'_>] = match universe {
        ObjectUniverse::Primary => &bound[..bound.len().min(1)],
        ObjectUniverse::Union => bound,
    };

    let mut sizes: Vec<(CollectionId, usize)> = Vec::new();
    for group in maps.iter().flat_map(|b| b.map().groups()) {
        match sizes.iter_mut().find(|(c, _)| *c == group.collection) {
            Some((_, n)) => *n = (*n).max(group.records.len()),
            None => sizes.push((group.collection.clone(), group.records.len())),
        }
    }
    sizes
}
