//! Semver range expressions.
//!
//! Catalogs write ranges the way the operator tooling does: comparators
//! separated by whitespace must all hold, and sets joined by `||` are
//! alternatives. A bare version is an exact match. Unlike Cargo-style
//! requirements, prerelease versions take part in ordinary precedence
//! ordering, so `0.9.1-clusterwide` satisfies `<0.9.2`.

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Errors produced while parsing a [`VersionRange`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// The range string was empty or only whitespace.
    #[error("empty version range")]
    Empty,

    /// One side of an `||` had no comparators.
    #[error("empty comparator set in range {0:?}")]
    EmptySet(String),

    /// An operator was not followed by a version.
    #[error("operator {op:?} without a version in range {range:?}")]
    DanglingOperator {
        /// The operator text.
        op: String,
        /// The whole range being parsed.
        range: String,
    },

    /// A comparator's version did not parse as strict semver.
    #[error("invalid version {version:?} in range {range:?}: {reason}")]
    InvalidVersion {
        /// The offending version text.
        version: String,
        /// The whole range being parsed.
        range: String,
        /// Parser message.
        reason: String,
    },
}

/// Comparison operator of a single [`Comparator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `=`, `==`, or a bare version.
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
        }
    }

    /// Splits a leading operator off `token`, longest match first.
    fn split(token: &str) -> (Op, &str) {
        const TABLE: [(&str, Op); 7] = [
            (">=", Op::Ge),
            ("<=", Op::Le),
            ("!=", Op::Ne),
            ("==", Op::Eq),
            (">", Op::Gt),
            ("<", Op::Lt),
            ("=", Op::Eq),
        ];
        for (text, op) in TABLE {
            if let Some(rest) = token.strip_prefix(text) {
                return (op, rest);
            }
        }
        (Op::Eq, token)
    }
}

/// Compares two versions by semver precedence, ignoring build metadata.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// One `<op><version>` term of a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    /// The comparison to apply.
    pub op: Op,
    /// The version compared against.
    pub version: Version,
}

impl Comparator {
    /// Returns true if `version` satisfies this comparator.
    pub fn matches(&self, version: &Version) -> bool {
        let ord = compare(version, &self.version);
        match self.op {
            Op::Eq => ord == Ordering::Equal,
            Op::Ne => ord != Ordering::Equal,
            Op::Gt => ord == Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
            Op::Lt => ord == Ordering::Less,
            Op::Le => ord != Ordering::Greater,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// A parsed semver range: a disjunction of comparator conjunctions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    sets: Vec<Vec<Comparator>>,
    raw: String,
}

impl VersionRange {
    /// Parses a range expression such as `>=0.9.0 <0.9.2 || 1.0.0`.
    ///
    /// # Errors
    ///
    /// Returns a [`RangeError`] when the expression is empty, a side of
    /// `||` is empty, or a version is not strict semver.
    pub fn parse(input: &str) -> Result<Self, RangeError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(RangeError::Empty);
        }

        let mut sets = Vec::new();
        for alternative in raw.split("||") {
            let mut set = Vec::new();
            let mut tokens = alternative.split_whitespace();
            while let Some(token) = tokens.next() {
                let (op, rest) = Op::split(token);
                // Allow a space between operator and version (">= 1.0.0").
                let version_text = if rest.is_empty() {
                    tokens.next().ok_or_else(|| RangeError::DanglingOperator {
                        op: token.to_string(),
                        range: raw.to_string(),
                    })?
                } else {
                    rest
                };
                let version =
                    Version::parse(version_text).map_err(|e| RangeError::InvalidVersion {
                        version: version_text.to_string(),
                        range: raw.to_string(),
                        reason: e.to_string(),
                    })?;
                set.push(Comparator { op, version });
            }
            if set.is_empty() {
                return Err(RangeError::EmptySet(raw.to_string()));
            }
            sets.push(set);
        }

        Ok(Self {
            sets,
            raw: raw.to_string(),
        })
    }

    /// A range matching exactly `version`.
    pub fn exact(version: &Version) -> Self {
        Self {
            sets: vec![vec![Comparator {
                op: Op::Eq,
                version: version.clone(),
            }]],
            raw: version.to_string(),
        }
    }

    /// The inclusive range `>=min <=max`, with either side optional.
    ///
    /// Returns `None` when neither bound is given.
    pub fn between(min: Option<&Version>, max: Option<&Version>) -> Option<Self> {
        let mut set = Vec::new();
        if let Some(min) = min {
            set.push(Comparator {
                op: Op::Ge,
                version: min.clone(),
            });
        }
        if let Some(max) = max {
            set.push(Comparator {
                op: Op::Le,
                version: max.clone(),
            });
        }
        if set.is_empty() {
            return None;
        }
        let raw = set
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        Some(Self {
            sets: vec![set],
            raw,
        })
    }

    /// Returns true if `version` satisfies any of the comparator sets.
    pub fn matches(&self, version: &Version) -> bool {
        self.sets
            .iter()
            .any(|set| set.iter().all(|c| c.matches(version)))
    }

    /// If this range admits exactly one version, returns it.
    ///
    /// Only single-comparator `=` ranges qualify; `>=1.0.0 <=1.0.0` does not.
    pub fn exact_version(&self) -> Option<&Version> {
        match self.sets.as_slice() {
            [set] => match set.as_slice() {
                [Comparator {
                    op: Op::Eq,
                    version,
                }] => Some(version),
                _ => None,
            },
            _ => None,
        }
    }

    /// The range as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for VersionRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
