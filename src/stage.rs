//! Deployment stages and their fixed display order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::MapError;

/// Deployment maturity of a location. The derived `Ord` is the legend /
/// layer order: lowest maturity first, `Mixed` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Planned,
    Test,
    Production,
    Mixed,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Planned => "Planned",
            Stage::Test => "Test",
            Stage::Production => "Production",
            Stage::Mixed => "Mixed",
        }
    }

    /// Colour name shared by the static palette and the leaflet-color-markers
    /// icon set.
    pub fn color_name(self) -> &'static str {
        match self {
            Stage::Planned => "grey",
            Stage::Test => "orange",
            Stage::Production => "green",
            Stage::Mixed => "blue",
        }
    }

    pub fn fill(self) -> &'static str {
        match self {
            Stage::Planned => "#808080",
            Stage::Test => "#ffa500",
            Stage::Production => "#008000",
            Stage::Mixed => "#0000ff",
        }
    }

    /// Identifier used for the stage's layer variable in the web map.
    pub fn js_ident(self) -> &'static str {
        match self {
            Stage::Planned => "planned",
            Stage::Test => "test",
            Stage::Production => "production",
            Stage::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" | "interested" | "planned/interested" => Ok(Stage::Planned),
            "test" | "testing" => Ok(Stage::Test),
            "production" => Ok(Stage::Production),
            "mixed" => Ok(Stage::Mixed),
            _ => Err(MapError::Configuration(format!("unrecognised stage `{s}`"))),
        }
    }
}

impl<'de> Deserialize<'de> for Stage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_puts_mixed_last() {
        let mut stages = vec![Stage::Mixed, Stage::Production, Stage::Planned, Stage::Test];
        stages.sort();
        assert_eq!(stages, [Stage::Planned, Stage::Test, Stage::Production, Stage::Mixed]);
    }

    #[test]
    fn parses_historical_aliases() {
        assert_eq!("Interested".parse::<Stage>().unwrap(), Stage::Planned);
        assert_eq!("testing".parse::<Stage>().unwrap(), Stage::Test);
        assert_eq!("PRODUCTION".parse::<Stage>().unwrap(), Stage::Production);
    }

    #[test]
    fn rejects_unknown_stage() {
        let err = "retired".parse::<Stage>().unwrap_err();
        assert!(matches!(err, MapError::Configuration(_)));
    }
}
