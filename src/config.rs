use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MapError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub style: StyleConfig,
    pub web: WebConfig,
    pub map: MapConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub data_dir: PathBuf,
    pub locations: PathBuf,
    /// NUTS level 1: states or groups of states, drawn as background.
    pub countries: PathBuf,
    /// NUTS level 3: (usually) city-level regions, used to resolve locations.
    pub regions: PathBuf,
    /// Populated places for locations outside the region coverage.
    pub places: PathBuf,
    pub font: PathBuf,
    pub template: PathBuf,
    pub keys: PropertyKeys,
}

/// Names of the GeoJSON feature properties the datasets are read through.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PropertyKeys {
    pub region_id: String,
    pub country_code: String,
    pub region_name: String,
    pub place_name: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub width: f64,
    pub height: f64,
    /// Marker radius in map metres.
    pub patch_size: f64,
    pub font_size: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebConfig {
    pub start_zoom: u8,
    pub max_zoom: u8,
    /// Degrees added around the location bounds; works in tandem with the start zoom.
    pub padding: f64,
    pub overlay_icon: String,
    pub marker_icon_base: String,
    pub legend_header: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// Pairs of `common_name`s joined by a line on both outputs.
    pub connections: Vec<(String, String)>,
    /// Region identifiers dropped from the background for conciseness.
    pub exclusions: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from(".") }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            locations: PathBuf::from("plotted_locations.json"),
            countries: PathBuf::from("NUTS_RG_01M_2021_4326_LEVL_1.geojson"),
            regions: PathBuf::from("NUTS_RG_01M_2021_4326_LEVL_3.geojson"),
            places: PathBuf::from("ne_10m_populated_places_simple.geojson"),
            font: PathBuf::from("OpenSans-Bold.ttf"),
            template: PathBuf::from("template.html"),
            keys: PropertyKeys::default(),
        }
    }
}

impl Default for PropertyKeys {
    fn default() -> Self {
        Self {
            region_id: "FID".into(),
            country_code: "CNTR_CODE".into(),
            region_name: "NUTS_NAME".into(),
            place_name: "name".into(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self { width: 1000.0, height: 1000.0, patch_size: 20_000.0, font_size: 12.0 }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            start_zoom: 6,
            max_zoom: 9,
            padding: 0.3,
            overlay_icon: "https://raw.githubusercontent.com/harivyasi/ELNmap/main/data/favicon.ico".into(),
            marker_icon_base: "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img".into(),
            legend_header: "<a href='https://chemotion.net/'>Chemotion</a>".into(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            connections: Vec::new(),
            exclusions: vec!["FRY".into(), "FRM".into(), "ES7".into()],
        }
    }
}

impl InputConfig {
    /// Resolves a dataset path against `data_dir` unless it is already absolute.
    pub fn path(&self, file: &Path) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn locations_path(&self) -> PathBuf { self.path(&self.locations) }
    pub fn countries_path(&self) -> PathBuf { self.path(&self.countries) }
    pub fn regions_path(&self)   -> PathBuf { self.path(&self.regions) }
    pub fn places_path(&self)    -> PathBuf { self.path(&self.places) }
    pub fn font_path(&self)      -> PathBuf { self.path(&self.font) }
    pub fn template_path(&self)  -> PathBuf { self.path(&self.template) }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| MapError::io(path, e))?;
        toml::from_str(&content).map_err(|e| {
            MapError::Configuration(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Uses the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }
}
