//! Boundary and populated-place datasets, and the filter that trims the
//! background map down to the countries actually in play.

use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use geo::{Coord, Geometry, MultiPolygon};
use geojson::{FeatureCollection, GeoJson, JsonObject};
use tracing::{debug, info, warn};

use crate::config::PropertyKeys;
use crate::error::{MapError, Result};

/// A country or sub-country administrative area, in lon/lat.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: String,
    pub country_code: String,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// A named populated place, in lon/lat.
#[derive(Debug, Clone)]
pub struct Place {
    pub name: String,
    pub coord: Coord<f64>,
}

/// Which part of the map a run renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    All,
    Only(String),
    Except(String),
}

impl Scope {
    pub fn is_full(&self) -> bool {
        matches!(self, Scope::All)
    }

    /// Countries whose boundaries are drawn, given those the registry references.
    pub fn countries(&self, referenced: &BTreeSet<String>) -> BTreeSet<String> {
        match self {
            Scope::All => referenced.clone(),
            Scope::Only(cc) => BTreeSet::from([cc.clone()]),
            Scope::Except(cc) => referenced.iter().filter(|c| *c != cc).cloned().collect(),
        }
    }

    pub fn svg_filename(&self) -> String {
        match self {
            Scope::All => "map.svg".to_string(),
            Scope::Only(cc) => format!("map_{}.svg", cc.to_lowercase()),
            Scope::Except(cc) => format!("map_without_{}.svg", cc.to_lowercase()),
        }
    }

    /// Single-country maps colour regions by name, everything else by country.
    pub fn color_by_region(&self) -> bool {
        matches!(self, Scope::Only(_))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Only(cc) => write!(f, "only:{cc}"),
            Scope::Except(cc) => write!(f, "except:{cc}"),
        }
    }
}

impl FromStr for Scope {
    type Err = MapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let country = |cc: &str| {
            let cc = cc.trim();
            if cc.is_empty() || !cc.chars().all(|c| c.is_ascii_alphabetic()) {
                Err(MapError::Configuration(format!("invalid country code in scope `{s}`")))
            } else {
                Ok(cc.to_ascii_uppercase())
            }
        };
        match s.split_once(':') {
            None if s.eq_ignore_ascii_case("all") => Ok(Scope::All),
            Some((mode, cc)) if mode.eq_ignore_ascii_case("only") => Ok(Scope::Only(country(cc)?)),
            Some((mode, cc)) if mode.eq_ignore_ascii_case("except") => Ok(Scope::Except(country(cc)?)),
            _ => Err(MapError::Configuration(format!(
                "unknown scope `{s}`, expected `all`, `only:<CC>` or `except:<CC>`"
            ))),
        }
    }
}

fn read_collection(path: &Path) -> Result<FeatureCollection> {
    let file = File::open(path).map_err(|e| MapError::io(path, e))?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .map_err(|e| MapError::dataset(path, e))?;
    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(MapError::dataset(path, "GeoJSON must be a FeatureCollection")),
    }
}

fn prop_string(props: Option<&JsonObject>, key: &str) -> Option<String> {
    match props?.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Loads polygon features. Features lacking a country code or polygon
/// geometry are skipped.
pub fn load_regions(path: &Path, keys: &PropertyKeys) -> Result<Vec<Region>> {
    let collection = read_collection(path)?;
    let mut regions = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let props = feature.properties.as_ref();
        let Some(country_code) = prop_string(props, &keys.country_code) else {
            debug!("Skipping feature without {} in {:?}", keys.country_code, path);
            continue;
        };
        let id = prop_string(props, &keys.region_id)
            .or_else(|| feature.id.as_ref().map(|id| match id {
                geojson::feature::Id::String(s) => s.clone(),
                geojson::feature::Id::Number(n) => n.to_string(),
            }))
            .unwrap_or_default();
        let name = prop_string(props, &keys.region_name).unwrap_or_default();

        let Some(geom) = feature.geometry else { continue };
        let geometry: Geometry<f64> = geom.value.try_into()
            .map_err(|e| MapError::dataset(path, format!("feature {id}: {e}")))?;
        let geometry = match geometry {
            Geometry::MultiPolygon(mp) => mp,
            Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            _ => continue,
        };

        regions.push(Region { id, country_code, name, geometry });
    }

    info!("Loaded {} regions from {:?}", regions.len(), path);
    Ok(regions)
}

/// Loads point features keyed by `keys.place_name`.
pub fn load_places(path: &Path, keys: &PropertyKeys) -> Result<Vec<Place>> {
    let collection = read_collection(path)?;
    let places: Vec<Place> = collection
        .features
        .into_iter()
        .filter_map(|feature| {
            let name = prop_string(feature.properties.as_ref(), &keys.place_name)?;
            match feature.geometry?.value {
                geojson::Value::Point(ref p) if p.len() >= 2 => {
                    Some(Place { name, coord: Coord { x: p[0], y: p[1] } })
                }
                _ => None,
            }
        })
        .collect();

    info!("Loaded {} populated places from {:?}", places.len(), path);
    Ok(places)
}

/// Keeps the regions of `countries`, minus the excluded identifiers
/// (overseas territories and the like). An empty result is logged, not fatal.
pub fn filter_boundaries(
    regions: Vec<Region>,
    countries: &BTreeSet<String>,
    exclusions: &[String],
    scope: &Scope,
) -> Vec<Region> {
    let kept: Vec<Region> = regions
        .into_iter()
        .filter(|r| countries.contains(&r.country_code))
        .filter(|r| !exclusions.contains(&r.id))
        .collect();

    if kept.is_empty() {
        warn!("{}", MapError::EmptySelection { scope: scope.to_string(), what: "countries" });
    } else {
        debug!("Kept {} boundary polygons for {} countries", kept.len(), countries.len());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn region(id: &str, cc: &str) -> Region {
        Region {
            id: id.into(),
            country_code: cc.into(),
            name: id.into(),
            geometry: MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)
            ]]),
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn filter_keeps_referenced_countries_and_drops_exclusions() {
        let regions = vec![region("DE1", "DE"), region("FR1", "FR"), region("FRY", "FR"), region("PL1", "PL")];
        let kept = filter_boundaries(regions, &set(&["DE", "FR"]), &["FRY".to_string()], &Scope::All);
        let ids: Vec<_> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["DE1", "FR1"]);
    }

    #[test]
    fn empty_selection_is_not_fatal() {
        let kept = filter_boundaries(vec![region("DE1", "DE")], &set(&["XX"]), &[], &Scope::Only("XX".into()));
        assert!(kept.is_empty());
    }

    #[test]
    fn scope_parsing_and_filenames() {
        assert_eq!("all".parse::<Scope>().unwrap(), Scope::All);
        assert_eq!("only:de".parse::<Scope>().unwrap(), Scope::Only("DE".into()));
        assert_eq!("except:DE".parse::<Scope>().unwrap().svg_filename(), "map_without_de.svg");
        assert!("germany".parse::<Scope>().is_err());
        assert!("only:".parse::<Scope>().is_err());
        assert!(Scope::default().is_full());
        assert_eq!(Scope::default().svg_filename(), "map.svg");
    }

    #[test]
    fn scope_selects_countries() {
        let referenced = set(&["DE", "FR", "US"]);
        assert_eq!(Scope::All.countries(&referenced), referenced);
        assert_eq!(Scope::Only("DE".into()).countries(&referenced), set(&["DE"]));
        assert_eq!(Scope::Except("DE".into()).countries(&referenced), set(&["FR", "US"]));
    }

    #[test]
    fn loads_polygons_and_points_from_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let regions_path = dir.path().join("regions.geojson");
        std::fs::write(&regions_path, r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"FID": "DE122", "CNTR_CODE": "DE", "NUTS_NAME": "Karlsruhe, Stadtkreis"},
             "geometry": {"type": "Polygon", "coordinates": [[[8.3, 48.9], [8.5, 48.9], [8.5, 49.1], [8.3, 49.1], [8.3, 48.9]]]}},
            {"type": "Feature", "properties": {"NUTS_NAME": "no country"},
             "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}}
        ]}"#).unwrap();
        let places_path = dir.path().join("places.geojson");
        std::fs::write(&places_path, r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "Boston"}, "geometry": {"type": "Point", "coordinates": [-71.06, 42.36]}}
        ]}"#).unwrap();

        let keys = PropertyKeys::default();
        let regions = load_regions(&regions_path, &keys).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, "DE122");
        assert_eq!(regions[0].name, "Karlsruhe, Stadtkreis");

        let places = load_places(&places_path, &keys).unwrap();
        assert_eq!(places[0].name, "Boston");
        assert_eq!(places[0].coord, Coord { x: -71.06, y: 42.36 });
    }
}
