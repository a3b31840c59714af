//! Interactive map: a Leaflet page produced by filling the placeholders of
//! `template.html`.
//!
//! The page is assembled from named sections (bounds, markers, polylines,
//! legend, layer control) that are substituted into the template in a single
//! pass at the end.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::WebConfig;
use crate::error::{MapError, Result};
use crate::palette::ColoredConnection;
use crate::resolver::{group_by_stage, ResolvedLocation};

pub const START_ZOOM: &str = "$STARTZOOM$";
pub const MAX_ZOOM: &str = "$MAXZOOM$";
pub const LAT_MIN: &str = "$LATMIN$";
pub const LON_MIN: &str = "$LONMIN$";
pub const LAT_MAX: &str = "$LATMAX$";
pub const LON_MAX: &str = "$LONMAX$";
pub const MARKERS: &str = "// $MARKERS-GO-HERE$";
pub const POLYLINES: &str = "// $POLYLINES-GO-HERE$";
pub const LEGEND: &str = "$LEGEND_HTML$";
pub const LAYER_CONTROL: &str = "// $LAYERCONTROL-GO-HERE$";

pub fn load_template(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(MapError::MissingResource { kind: "template", path: path.to_path_buf() });
    }
    fs::read_to_string(path).map_err(|e| MapError::io(path, e))
}

/// Viewport limits in degrees, padding included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Bounds {
    pub fn around(locations: &[ResolvedLocation], padding: f64) -> Self {
        let mut b: Option<Bounds> = None;
        for loc in locations {
            let (lon, lat) = (loc.geo.x, loc.geo.y);
            b = Some(match b {
                None => Bounds { lat_min: lat, lat_max: lat, lon_min: lon, lon_max: lon },
                Some(b) => Bounds {
                    lat_min: b.lat_min.min(lat),
                    lat_max: b.lat_max.max(lat),
                    lon_min: b.lon_min.min(lon),
                    lon_max: b.lon_max.max(lon),
                },
            });
        }
        let b = b.unwrap_or(Bounds { lat_min: 0.0, lat_max: 0.0, lon_min: 0.0, lon_max: 0.0 });
        Bounds {
            lat_min: b.lat_min - padding,
            lat_max: b.lat_max + padding,
            lon_min: b.lon_min - padding,
            lon_max: b.lon_max + padding,
        }
    }
}

/// Filled-in sections, ready for substitution.
#[derive(Debug, Clone)]
pub struct WebMap {
    pub start_zoom: u8,
    pub max_zoom: u8,
    pub bounds: Bounds,
    pub markers: String,
    pub polylines: String,
    pub legend: String,
    pub layer_control: String,
}

pub struct WebMapBuilder<'a> {
    config: &'a WebConfig,
    locations: &'a [ResolvedLocation],
    connections: &'a [ColoredConnection],
}

fn tooltip_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

impl<'a> WebMapBuilder<'a> {
    pub fn new(config: &'a WebConfig) -> Self {
        Self { config, locations: &[], connections: &[] }
    }

    pub fn locations(mut self, locations: &'a [ResolvedLocation]) -> Self {
        self.locations = locations;
        self
    }

    pub fn connections(mut self, connections: &'a [ColoredConnection]) -> Self {
        self.connections = connections;
        self
    }

    fn icon_url(&self, color: &str) -> String {
        format!("{}/marker-icon-{color}.png", self.config.marker_icon_base)
    }

    pub fn build(self) -> WebMap {
        let groups = group_by_stage(self.locations);
        let index: HashMap<&str, usize> = self
            .locations
            .iter()
            .enumerate()
            .map(|(i, l)| (l.name(), i))
            .collect();

        // icons, then one marker per location, then one layer per present stage
        let mut markers = String::new();
        for stage in groups.keys() {
            let _ = write!(
                markers,
                "\n    var icon_{} = L.icon(\n        {{iconUrl: '{}',\n            iconSize: [25, 25],\n            iconAnchor: [13, 41],\n            shadowUrl: '{}',\n            shadowSize: [25, 41],\n            shadowAnchor: [13, 40]}}\n    );",
                stage.js_ident(),
                self.config.overlay_icon,
                self.icon_url(stage.color_name()),
            );
        }
        for (idx, loc) in self.locations.iter().enumerate() {
            let users = loc.location.num_users;
            let plural = if users == 1 { "" } else { "s" };
            let _ = write!(
                markers,
                "\n    var location{idx} = L.marker([{}, {}], {{icon: icon_{}}} )",
                loc.geo.y,
                loc.geo.x,
                loc.stage().js_ident(),
            );
            let _ = write!(
                markers,
                "\n    location{idx}.bindTooltip(`<div>{}: {users} installation{plural} in {} usage.</div>`, {{\"sticky\": true}});",
                tooltip_escape(loc.name()),
                loc.stage(),
            );
        }
        for (stage, members) in &groups {
            let vars: Vec<String> = members
                .iter()
                .filter_map(|l| index.get(l.name()))
                .map(|i| format!("location{i}"))
                .collect();
            let _ = write!(
                markers,
                "\n    var {} = L.layerGroup([{}]).addTo(map)",
                stage.js_ident(),
                vars.join(",")
            );
        }

        // connections share one layer
        let mut polylines = String::new();
        let mut drawn = Vec::new();
        for cc in self.connections {
            let (Some(&a), Some(&b)) = (
                index.get(cc.connection.from.as_str()),
                index.get(cc.connection.to.as_str()),
            ) else {
                debug!("Skipping connection {} - {}", cc.connection.from, cc.connection.to);
                continue;
            };
            let (a, b) = (&self.locations[a], &self.locations[b]);
            let idx = drawn.len();
            let _ = write!(
                polylines,
                "\n    var polyline{idx} = L.polyline(\n        [[{}, {}],[{}, {}]],\n        {{\"color\": \"{}\", \"lineCap\": \"round\", \"lineJoin\": \"round\", \"opacity\": 0.8, \"smoothFactor\": 1.0, \"stroke\": true, \"weight\": 5}}\n        )",
                a.geo.y, a.geo.x, b.geo.y, b.geo.x, cc.color,
            );
            drawn.push(cc.color);
        }
        if !drawn.is_empty() {
            let vars: Vec<String> = (0..drawn.len()).map(|i| format!("polyline{i}")).collect();
            let _ = write!(
                polylines,
                "\n    var connections = L.layerGroup([{}]).addTo(map)",
                vars.join(",")
            );
        }

        // overlay control
        let mut overlays: Vec<String> = groups
            .keys()
            .map(|stage| format!("\n        \"{stage} usage\": {}", stage.js_ident()))
            .collect();
        if !drawn.is_empty() {
            overlays.push("\n        \"Connections\": connections".to_string());
        }
        let layer_control = format!("\n    var overlays = {{{}\n    }};", overlays.join(","));

        // legend
        let mut legend = format!("<b>{}</b><br>", self.config.legend_header);
        for stage in groups.keys() {
            let _ = write!(
                legend,
                "\n        <img src='{}' width=12>  {stage} usage<br>",
                self.icon_url(stage.color_name()),
            );
        }
        if !drawn.is_empty() {
            let color = if drawn.len() == 1 { drawn[0] } else { "#000000" };
            let _ = write!(
                legend,
                "\n        <svg width=12 height=8><line x1=0 y1=4 x2=12 y2=4 stroke='{color}' stroke-width=3 stroke-dasharray='2,2'/></svg>  Connections<br>",
            );
        }

        WebMap {
            start_zoom: self.config.start_zoom,
            max_zoom: self.config.max_zoom,
            bounds: Bounds::around(self.locations, self.config.padding),
            markers,
            polylines,
            legend,
            layer_control,
        }
    }
}

impl WebMap {
    pub fn render(&self, template: &str) -> String {
        let values: [(&str, String); 10] = [
            (START_ZOOM, self.start_zoom.to_string()),
            (MAX_ZOOM, self.max_zoom.to_string()),
            (LAT_MIN, self.bounds.lat_min.to_string()),
            (LON_MIN, self.bounds.lon_min.to_string()),
            (LAT_MAX, self.bounds.lat_max.to_string()),
            (LON_MAX, self.bounds.lon_max.to_string()),
            (MARKERS, self.markers.clone()),
            (POLYLINES, self.polylines.clone()),
            (LEGEND, self.legend.clone()),
            (LAYER_CONTROL, self.layer_control.clone()),
        ];
        for (token, _) in &values {
            if !template.contains(token) {
                warn!("Template has no {token} placeholder");
            }
        }
        substitute(template, &values)
    }
}

/// Replaces every token occurrence in one left-to-right scan, so inserted
/// text is never scanned again.
fn substitute(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    loop {
        let next = values
            .iter()
            .filter_map(|(token, value)| rest.find(token).map(|pos| (pos, *token, value)))
            .min_by_key(|(pos, token, _)| (*pos, std::cmp::Reverse(token.len())));
        match next {
            Some((pos, token, value)) => {
                out.push_str(&rest[..pos]);
                out.push_str(value);
                rest = &rest[pos + token.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}
