//! Downloads the public boundary and place datasets into the data directory.
//!
//! Datasets fetched:
//!   1. GISCO NUTS 2021 level 1 (states)          → countries
//!   2. GISCO NUTS 2021 level 3 (city regions)    → regions
//!   3. Natural Earth 10m populated places        → places
//!
//! Files already present are left alone. The label font and the location
//! list are not downloadable and have to be put in place by hand.

use std::fs;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::config::InputConfig;
use crate::error::{MapError, Result};
use crate::pipeline::write_atomically;

const GISCO_BASE: &str = "https://gisco-services.ec.europa.eu/distribution/v2/nuts/geojson";
const PLACES_URL: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_10m_populated_places_simple.geojson";

/// Source URL for a dataset, keyed by the file name it is stored under.
fn source_url(file: &Path) -> Option<String> {
    let name = file.file_name()?.to_str()?;
    if name.starts_with("NUTS_RG_") {
        Some(format!("{GISCO_BASE}/{name}"))
    } else if name == "ne_10m_populated_places_simple.geojson" {
        Some(PLACES_URL.to_string())
    } else {
        None
    }
}

pub fn fetch_datasets(input: &InputConfig) -> Result<()> {
    fs::create_dir_all(&input.data_dir).map_err(|e| MapError::io(&input.data_dir, e))?;

    for (file, dest) in [
        (&input.countries, input.countries_path()),
        (&input.regions, input.regions_path()),
        (&input.places, input.places_path()),
    ] {
        if dest.exists() {
            info!("{:?} already present, skipping.", dest);
            continue;
        }
        let Some(url) = source_url(file) else {
            info!("No known source for {:?}; place it there manually.", dest);
            continue;
        };
        info!("Downloading {url} ...");
        let body = fetch(&url)?;
        // A partial download never lands under the final name, so the
        // presence check above can trust whatever it finds.
        write_atomically(&dest, &body)?;
        info!("Saved {} bytes → {:?}", body.len(), dest);
    }
    Ok(())
}

fn fetch(url: &str) -> Result<Vec<u8>> {
    let failed = |reason: String| MapError::Download { url: url.to_string(), reason };
    let resp = ureq::get(url)
        .set("Accept-Encoding", "identity")
        .call()
        .map_err(|e| failed(e.to_string()))?;
    let mut buf = Vec::new();
    resp.into_reader()
        .read_to_end(&mut buf)
        .map_err(|e| failed(format!("failed to read response body: {e}")))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_datasets_map_to_their_sources() {
        let input = InputConfig::default();
        assert_eq!(
            source_url(&input.regions).unwrap(),
            "https://gisco-services.ec.europa.eu/distribution/v2/nuts/geojson/NUTS_RG_01M_2021_4326_LEVL_3.geojson"
        );
        assert_eq!(source_url(&input.places).unwrap(), PLACES_URL);
        assert!(source_url(Path::new("my_regions.geojson")).is_none());
    }

    #[test]
    fn present_datasets_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let input = InputConfig { data_dir: dir.path().to_path_buf(), ..InputConfig::default() };
        for dest in [input.countries_path(), input.regions_path(), input.places_path()] {
            fs::write(dest, "{}").unwrap();
        }

        fetch_datasets(&input).unwrap();
        assert_eq!(fs::read_to_string(input.regions_path()).unwrap(), "{}");
    }

    #[test]
    fn stored_dataset_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/NUTS_RG_01M_2021_4326_LEVL_3.geojson");

        write_atomically(&dest, b"{\"type\": \"FeatureCollection\"}").unwrap();
        assert!(dest.is_file());
        let names: Vec<_> = fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1, "{names:?}");
    }
}
