//! Location registry: the hand-maintained list of places to plot.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{MapError, Result};
use crate::stage::Stage;

/// One configured location, as read from `plotted_locations.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub common_name: String,
    /// Region or place name looked up in the boundary datasets.
    #[serde(alias = "nuts_lvl3")]
    pub id_name: String,
    pub country_code: String,
    pub stage: Stage,
    pub num_users: u32,
}

/// Two locations joined by a line on both maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub from: String,
    pub to: String,
}

impl Connection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

pub fn load_locations(path: &Path) -> Result<Vec<Location>> {
    let content = fs::read_to_string(path).map_err(|e| MapError::io(path, e))?;
    let locations = parse_locations(&content)?;
    info!("Loaded {} locations from {:?}", locations.len(), path);
    Ok(locations)
}

pub fn parse_locations(json: &str) -> Result<Vec<Location>> {
    let locations: Vec<Location> = serde_json::from_str(json)
        .map_err(|e| MapError::Configuration(format!("location list: {e}")))?;

    let mut seen = HashSet::new();
    for loc in &locations {
        if !seen.insert(loc.common_name.as_str()) {
            return Err(MapError::Configuration(format!(
                "duplicate location `{}`",
                loc.common_name
            )));
        }
    }
    Ok(locations)
}

/// Checks every connection endpoint against the registry.
pub fn validate_connections(
    locations: &[Location],
    pairs: &[(String, String)],
) -> Result<Vec<Connection>> {
    let known: HashSet<&str> = locations.iter().map(|l| l.common_name.as_str()).collect();
    pairs
        .iter()
        .map(|(from, to)| {
            for end in [from, to] {
                if !known.contains(end.as_str()) {
                    return Err(MapError::Configuration(format!(
                        "connection references unknown location `{end}`"
                    )));
                }
            }
            Ok(Connection::new(from.as_str(), to.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"common_name": "Aachen", "nuts_lvl3": "Städteregion Aachen", "country_code": "DE", "stage": "Production", "num_users": 4},
        {"common_name": "Karlsruhe", "id_name": "Karlsruhe, Stadtkreis", "country_code": "DE", "stage": "Mixed", "num_users": 5}
    ]"#;

    #[test]
    fn accepts_both_id_field_names_in_order() {
        let locations = parse_locations(SAMPLE).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].id_name, "Städteregion Aachen");
        assert_eq!(locations[1].common_name, "Karlsruhe");
        assert_eq!(locations[1].stage, Stage::Mixed);
    }

    #[test]
    fn missing_field_is_configuration_error() {
        let err = parse_locations(
            r#"[{"common_name": "Aachen", "id_name": "x", "country_code": "DE", "stage": "Test"}]"#,
        )
        .unwrap_err();
        match err {
            MapError::Configuration(msg) => assert!(msg.contains("num_users"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_stage_and_negative_count_are_rejected() {
        let bad_stage = r#"[{"common_name": "A", "id_name": "x", "country_code": "DE", "stage": "beta", "num_users": 1}]"#;
        let negative = r#"[{"common_name": "A", "id_name": "x", "country_code": "DE", "stage": "Test", "num_users": -1}]"#;
        let null_name = r#"[{"common_name": null, "id_name": "x", "country_code": "DE", "stage": "Test", "num_users": 1}]"#;
        for json in [bad_stage, negative, null_name] {
            assert!(matches!(parse_locations(json), Err(MapError::Configuration(_))));
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let json = r#"[
            {"common_name": "A", "id_name": "x", "country_code": "DE", "stage": "Test", "num_users": 1},
            {"common_name": "A", "id_name": "y", "country_code": "DE", "stage": "Test", "num_users": 2}
        ]"#;
        assert!(matches!(parse_locations(json), Err(MapError::Configuration(_))));
    }

    #[test]
    fn connections_must_reference_known_locations() {
        let locations = parse_locations(SAMPLE).unwrap();
        let ok = validate_connections(&locations, &[("Karlsruhe".to_string(), "Aachen".to_string())]).unwrap();
        assert_eq!(ok, vec![Connection::new("Karlsruhe", "Aachen")]);

        let err = validate_connections(&locations, &[("Karlsruhe".to_string(), "Berlin".to_string())]);
        assert!(matches!(err, Err(MapError::Configuration(msg)) if msg.contains("Berlin")));
    }
}
