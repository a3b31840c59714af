//! One run: load → resolve → render static → render interactive → write.
//!
//! Both artifacts are rendered in memory first; nothing touches the output
//! directory until every fatal check has passed.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::boundary::{filter_boundaries, load_places, load_regions, Scope};
use crate::config::AppConfig;
use crate::error::{MapError, Result};
use crate::html::{load_template, WebMapBuilder};
use crate::palette::color_connections;
use crate::registry::{load_locations, validate_connections};
use crate::resolver::{referenced_countries, resolve, ResolvedLocation};
use crate::svg::{check_font, render_svg, StaticMap};

pub const HTML_FILENAME: &str = "map.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub svg: Artifact,
    /// Only produced for the full scope.
    pub html: Option<Artifact>,
}

impl Artifacts {
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        std::iter::once(&self.svg).chain(self.html.as_ref())
    }
}

/// Renders every artifact for `scope` without writing anything.
pub fn build(config: &AppConfig, scope: &Scope) -> Result<Artifacts> {
    let input = &config.input;

    let locations = load_locations(&input.locations_path())?;
    let connections = validate_connections(&locations, &config.map.connections)?;

    // Resources are checked before any dataset is parsed.
    let font = input.font_path();
    check_font(&font)?;
    let template = if scope.is_full() { Some(load_template(&input.template_path())?) } else { None };

    let resolved = {
        let regions = load_regions(&input.regions_path(), &input.keys)?;
        let places = load_places(&input.places_path(), &input.keys)?;
        resolve(&locations, &regions, &places)?
    };

    let wanted = scope.countries(&referenced_countries(&locations));
    let background = filter_boundaries(
        load_regions(&input.countries_path(), &input.keys)?,
        &wanted,
        &config.map.exclusions,
        scope,
    );

    // The static map only shows locations inside the drawn countries.
    let drawn: BTreeSet<&str> = background.iter().map(|r| r.country_code.as_str()).collect();
    let on_static: Vec<ResolvedLocation> = resolved
        .iter()
        .filter(|l| drawn.contains(l.location.country_code.as_str()))
        .cloned()
        .collect();
    info!("{} of {} locations fall inside the static map", on_static.len(), resolved.len());
    // An empty background has already been reported by the boundary filter.
    if on_static.is_empty() && !resolved.is_empty() && !background.is_empty() {
        warn!("{}", MapError::EmptySelection { scope: scope.to_string(), what: "locations" });
    }

    let colored = color_connections(&connections);
    let svg = render_svg(
        &StaticMap {
            regions: &background,
            locations: &on_static,
            connections: &colored,
            color_by_region: scope.color_by_region(),
        },
        &config.style,
        &font,
    )?;

    let html = template.map(|t| {
        WebMapBuilder::new(&config.web)
            .locations(&resolved)
            .connections(&colored)
            .build()
            .render(&t)
    });

    let out = &config.output.dir;
    Ok(Artifacts {
        svg: Artifact { path: out.join(scope.svg_filename()), contents: svg },
        html: html.map(|contents| Artifact { path: out.join(HTML_FILENAME), contents }),
    })
}

/// Writes `contents` to `<path>.tmp` and renames it into place, so `path`
/// is either absent or complete.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MapError::io(parent, e))?;
    }
    let mut tmp = path.to_path_buf().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents).map_err(|e| MapError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| MapError::io(path, e))
}

pub fn write(artifacts: &Artifacts) -> Result<()> {
    for artifact in artifacts.iter() {
        write_atomically(&artifact.path, artifact.contents.as_bytes())?;
        info!("Written {:?} ({} bytes)", artifact.path, artifact.contents.len());
    }
    Ok(())
}

pub fn run(config: &AppConfig, scope: &Scope) -> Result<Artifacts> {
    let artifacts = build(config, scope)?;
    write(&artifacts)?;
    Ok(artifacts)
}
