//! Veto predicates and the veto descriptor parser.
//!
//! A veto excludes deposit entries from the cone sum. Vetoes are configured
//! as string tokens:
//!
//! - a plain number `r`: shorthand for `ConeVeto(r)`
//! - `Threshold(x)`: drop entries whose value is `<= x`
//! - `ConeVeto(r)`: drop entries within ΔR < r of the center
//! - `AngleCone(a)`: keep only entries within opening angle `a` of the center
//! - `AngleVeto(a)`: drop entries within opening angle `a` of the center
//!
//! Parsed vetoes carry an unset center. They are values: the evaluator
//! anchors a fresh copy on each candidate with [`Veto::centered_on`], so a
//! center from one candidate can never leak into another.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ConfigError;
use crate::geometry::Direction;

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?|\d*\.\d*)$").expect("number pattern compiles"));

static FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Threshold|ConeVeto|AngleCone|AngleVeto)\((\d+\.\d+)\)$")
        .expect("veto pattern compiles")
});

/// True if `token` is a plain base-10 number with optional sign and
/// optional decimal point.
pub fn is_number(token: &str) -> bool {
    NUMBER.is_match(token)
}

/// Parse a token already known to match the number pattern.
pub(crate) fn to_number(token: &str) -> Result<f64, ConfigError> {
    token
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidNumber(token.to_string()))
}

/// A single exclusion rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Veto {
    /// Excludes entries whose value is at or below `min_value`.
    Threshold { min_value: f64 },
    /// Excludes entries with ΔR to `center` below `radius`.
    Cone { center: Direction, radius: f64 },
    /// Excludes entries outside the opening `angle` around `center`.
    AngleCone { center: Direction, angle: f64 },
    /// Excludes entries inside the opening `angle` around `center`.
    AngleVeto { center: Direction, angle: f64 },
}

impl Veto {
    pub fn threshold(min_value: f64) -> Self {
        Veto::Threshold { min_value }
    }

    pub fn cone(radius: f64) -> Self {
        Veto::Cone {
            center: Direction::default(),
            radius,
        }
    }

    pub fn angle_cone(angle: f64) -> Self {
        Veto::AngleCone {
            center: Direction::default(),
            angle,
        }
    }

    pub fn angle_veto(angle: f64) -> Self {
        Veto::AngleVeto {
            center: Direction::default(),
            angle,
        }
    }

    /// Copy of this veto re-anchored on `center`. Geometry-free vetoes are
    /// returned unchanged.
    pub fn centered_on(&self, center: Direction) -> Self {
        match *self {
            Veto::Threshold { .. } => *self,
            Veto::Cone { radius, .. } => Veto::Cone { center, radius },
            Veto::AngleCone { angle, .. } => Veto::AngleCone { center, angle },
            Veto::AngleVeto { angle, .. } => Veto::AngleVeto { center, angle },
        }
    }

    /// The anchor direction, if this veto has one.
    pub fn center(&self) -> Option<Direction> {
        match self {
            Veto::Threshold { .. } => None,
            Veto::Cone { center, .. }
            | Veto::AngleCone { center, .. }
            | Veto::AngleVeto { center, .. } => Some(*center),
        }
    }

    /// True if an entry at `dir` carrying `value` is excluded.
    pub fn vetoes(&self, dir: &Direction, value: f64) -> bool {
        match self {
            Veto::Threshold { min_value } => value <= *min_value,
            Veto::Cone { center, radius } => center.delta_r2(dir) < radius * radius,
            Veto::AngleCone { center, angle } => center.cos_angle(dir) < angle.cos(),
            Veto::AngleVeto { center, angle } => center.cos_angle(dir) > angle.cos(),
        }
    }
}

impl fmt::Display for Veto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Veto::Threshold { min_value } => write!(f, "Threshold({min_value})"),
            Veto::Cone { radius, .. } => write!(f, "ConeVeto({radius})"),
            Veto::AngleCone { angle, .. } => write!(f, "AngleCone({angle})"),
            Veto::AngleVeto { angle, .. } => write!(f, "AngleVeto({angle})"),
        }
    }
}

/// Parse one veto token.
pub fn parse_veto(token: &str) -> Result<Veto, ConfigError> {
    if is_number(token) {
        return Ok(Veto::cone(to_number(token)?));
    }

    let caps = FUNCTION
        .captures(token)
        .ok_or_else(|| ConfigError::UnknownVeto(token.to_string()))?;
    let value = to_number(&caps[2])?;
    match &caps[1] {
        "Threshold" => Ok(Veto::threshold(value)),
        "ConeVeto" => Ok(Veto::cone(value)),
        "AngleCone" => Ok(Veto::angle_cone(value)),
        "AngleVeto" => Ok(Veto::angle_veto(value)),
        _ => Err(ConfigError::UnknownVeto(token.to_string())),
    }
}

/// Parse a list of veto tokens, preserving order.
pub fn parse_vetos<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Veto>, ConfigError> {
    tokens.iter().map(|t| parse_veto(t.as_ref())).collect()
}

/// Anchor every veto in `vetos` on `center`.
pub fn center_all(vetos: &[Veto], center: Direction) -> Vec<Veto> {
    vetos.iter().map(|v| v.centered_on(center)).collect()
}
