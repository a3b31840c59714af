//! Resolves each configured location to a single point on the map.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use geo::{Centroid, Coord, MultiPolygon};
use tracing::{debug, info};

use crate::boundary::{Place, Region};
use crate::error::{MapError, Result};
use crate::projection::{equal_area_to_lonlat, lonlat_to_mercator, multipolygon_to_equal_area};
use crate::registry::Location;
use crate::stage::Stage;

/// A location with both of its map coordinates filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub location: Location,
    /// lon/lat degrees, for the web map.
    pub geo: Coord<f64>,
    /// web-mercator metres, for the static map.
    pub projected: Coord<f64>,
}

impl ResolvedLocation {
    pub fn new(location: Location, geo: Coord<f64>) -> Self {
        Self { location, geo, projected: lonlat_to_mercator(geo) }
    }

    pub fn name(&self) -> &str {
        &self.location.common_name
    }

    pub fn stage(&self) -> Stage {
        self.location.stage
    }
}

/// Centroid of a lon/lat multipolygon, taken in the equal-area projection
/// and returned in lon/lat. Parts are weighted by area as one shape.
pub fn equal_area_centroid(geometry: &MultiPolygon<f64>) -> Option<Coord<f64>> {
    let projected = multipolygon_to_equal_area(geometry);
    projected.centroid().map(|p| equal_area_to_lonlat(p.0))
}

/// Every distinct country code the registry references.
pub fn referenced_countries(locations: &[Location]) -> BTreeSet<String> {
    locations.iter().map(|l| l.country_code.clone()).collect()
}

/// Partitions locations by stage. Iteration follows the stage order and
/// only stages with at least one location appear.
pub fn group_by_stage(locations: &[ResolvedLocation]) -> BTreeMap<Stage, Vec<&ResolvedLocation>> {
    let mut groups: BTreeMap<Stage, Vec<&ResolvedLocation>> = BTreeMap::new();
    for loc in locations {
        groups.entry(loc.stage()).or_default().push(loc);
    }
    groups
}

/// Looks each location up by exact name, first among the regions, then among
/// the populated places. The first unresolvable location aborts the whole run.
///
/// Region names are matched regardless of country code, since registry and
/// dataset codes can disagree (ISO `GR` against NUTS `EL`). When a name
/// occurs in several countries the one matching the location's code wins.
pub fn resolve(
    locations: &[Location],
    regions: &[Region],
    places: &[Place],
) -> Result<Vec<ResolvedLocation>> {
    let mut region_index: HashMap<&str, Vec<&Region>> = HashMap::new();
    for region in regions {
        region_index.entry(region.name.as_str()).or_default().push(region);
    }
    let mut place_index: HashMap<&str, Coord<f64>> = HashMap::new();
    for place in places {
        place_index.entry(place.name.as_str()).or_insert(place.coord);
    }

    let resolved = locations
        .iter()
        .map(|loc| {
            let key = loc.id_name.as_str();
            let from_region = region_index
                .get(key)
                .and_then(|candidates| {
                    candidates
                        .iter()
                        .find(|r| r.country_code == loc.country_code)
                        .or_else(|| candidates.first())
                })
                .and_then(|r| equal_area_centroid(&r.geometry));
            let geo = match from_region {
                Some(c) => c,
                None => match place_index.get(key) {
                    Some(c) => {
                        debug!("{} resolved through populated places", loc.common_name);
                        *c
                    }
                    None => {
                        return Err(MapError::LocationNotFound {
                            common_name: loc.common_name.clone(),
                        })
                    }
                },
            };
            Ok(ResolvedLocation::new(loc.clone(), geo))
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Resolved {} locations", resolved.len());
    Ok(resolved)
}
