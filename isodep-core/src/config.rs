//! Serializable isolator configuration.
//!
//! One `IsolatorConfig` describes one aggregator: an ordered list of
//! deposit sources plus the two policy switches that make otherwise
//! implicit behaviour explicit (object universe, zero-energy handling).
//!
//! The raw strings (mode, weight, veto tokens) are kept verbatim here and
//! only validated when the aggregator is built, so a config file always
//! round-trips and fingerprints exactly as written.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::ExprError;

/// Errors detected while loading or validating a configuration.
///
/// All of these are fatal and surface before the first event is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("please specify at least one deposit source")]
    NoDeposits,

    #[error(
        "mode '{0}' not implemented; supported modes are 'sum', 'sumRelative', 'count'"
    )]
    UnknownMode(String),

    #[error("veto '{0}' not implemented")]
    UnknownVeto(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("deposit source name must not be empty")]
    EmptySource,

    #[error("cone radius for '{name}' must be finite and >= 0, got {delta_r}")]
    InvalidConeRadius { name: String, delta_r: f64 },

    #[error("weight expression '{text}': {error}")]
    Expression {
        text: String,
        #[source]
        error: ExprError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Which objects receive an output value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectUniverse {
    /// Only objects indexed by the first deposit source.
    #[default]
    Primary,
    /// Every object indexed by any deposit source.
    Union,
}

/// What `sumRelative` does when the reference energy is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroEnergyPolicy {
    /// Return the IEEE result of the division (inf or NaN).
    #[default]
    Propagate,
    /// Fail the event with `IsolationError::ZeroReferenceEnergy`.
    Error,
}

/// Configuration of a single deposit source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepositConfig {
    /// Name of the deposit map in the event.
    pub source: String,

    /// Cone radius.
    #[serde(alias = "deltaR")]
    pub delta_r: f64,

    /// Constant number or candidate expression.
    #[serde(default = "default_weight")]
    pub weight: String,

    /// `sum`, `sumRelative` or `count`.
    pub mode: String,

    /// Ignore the exclusion region carried by each deposit record.
    #[serde(default, alias = "skipDefaultVeto")]
    pub skip_default_veto: bool,

    /// Veto tokens: plain numbers or `Threshold(x)`, `ConeVeto(x)`,
    /// `AngleCone(x)`, `AngleVeto(x)`.
    #[serde(default)]
    pub vetos: Vec<String>,
}

fn default_weight() -> String {
    "1".to_string()
}

impl DepositConfig {
    pub fn new(source: impl Into<String>, delta_r: f64, mode: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            delta_r,
            weight: default_weight(),
            mode: mode.into(),
            skip_default_veto: false,
            vetos: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: impl Into<String>) -> Self {
        self.weight = weight.into();
        self
    }

    pub fn with_vetos<I, S>(mut self, vetos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vetos = vetos.into_iter().map(Into::into).collect();
        self
    }

    pub fn skipping_default_veto(mut self) -> Self {
        self.skip_default_veto = true;
        self
    }
}

/// Complete aggregator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IsolatorConfig {
    /// Free-form name carried into output files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub object_universe: ObjectUniverse,

    #[serde(default)]
    pub zero_energy: ZeroEnergyPolicy,

    /// Deposit sources. The first one is the primary source.
    #[serde(default)]
    pub deposits: Vec<DepositConfig>,
}

impl IsolatorConfig {
    pub fn new(deposits: Vec<DepositConfig>) -> Self {
        Self {
            deposits,
            ..Self::default()
        }
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_object_universe(mut self, universe: ObjectUniverse) -> Self {
        self.object_universe = universe;
        self
    }

    pub fn with_zero_energy(mut self, policy: ZeroEnergyPolicy) -> Self {
        self.zero_energy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUON_ISO: &str = r#"
        label = "muon tracker + ecal"

        [[deposits]]
        source = "tracker"
        deltaR = 0.3
        weight = "1"
        mode = "sum"
        skipDefaultVeto = true
        vetos = ["0.01", "Threshold(1.0)"]

        [[deposits]]
        source = "ecal"
        delta_r = 0.4
        mode = "sumRelative"
    "#;

    #[test]
    fn parses_both_key_spellings() {
        let config = IsolatorConfig::from_toml_str(MUON_ISO).unwrap();
        assert_eq!(config.label.as_deref(), Some("muon tracker + ecal"));
        assert_eq!(config.deposits.len(), 2);

        let tracker = &config.deposits[0];
        assert_eq!(tracker.source, "tracker");
        assert_eq!(tracker.delta_r, 0.3);
        assert!(tracker.skip_default_veto);
        assert_eq!(tracker.vetos, vec!["0.01", "Threshold(1.0)"]);

        let ecal = &config.deposits[1];
        assert_eq!(ecal.delta_r, 0.4);
        assert_eq!(ecal.mode, "sumRelative");
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let config = IsolatorConfig::from_toml_str(MUON_ISO).unwrap();
        let ecal = &config.deposits[1];
        assert_eq!(ecal.weight, "1");
        assert!(!ecal.skip_default_veto);
        assert!(ecal.vetos.is_empty());
        assert_eq!(config.object_universe, ObjectUniverse::Primary);
        assert_eq!(config.zero_energy, ZeroEnergyPolicy::Propagate);
    }

    #[test]
    fn policies_parse_from_snake_case() {
        let config = IsolatorConfig::from_toml_str(
            r#"
            object_universe = "union"
            zero_energy = "error"
            "#,
        )
        .unwrap();
        assert_eq!(config.object_universe, ObjectUniverse::Union);
        assert_eq!(config.zero_energy, ZeroEnergyPolicy::Error);
        assert!(config.deposits.is_empty());
    }

    #[test]
    fn missing_mode_is_a_toml_error() {
        let err = IsolatorConfig::from_toml_str(
            r#"
            [[deposits]]
            source = "tracker"
            delta_r = 0.3
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iso.toml");
        std::fs::write(&path, MUON_ISO).unwrap();
        let config = IsolatorConfig::load(&path).unwrap();
        assert_eq!(config.deposits.len(), 2);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = IsolatorConfig::load("/definitely/not/here/iso.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn builder_matches_toml() {
        let built = DepositConfig::new("tracker", 0.3, "sum")
            .with_vetos(["0.01", "Threshold(1.0)"])
            .skipping_default_veto();
        let parsed = IsolatorConfig::from_toml_str(MUON_ISO).unwrap();
        assert_eq!(built, parsed.deposits[0]);
    }
}
