//! Static map: a self-contained SVG of the boundary polygons, one disc per
//! location coloured by stage, the connections and a legend.
//!
//! Everything is drawn in web-mercator and fitted to the configured canvas.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use geo::{BoundingRect, Coord, LineString, Rect};
use tracing::debug;

use crate::boundary::Region;
use crate::config::StyleConfig;
use crate::error::{MapError, Result};
use crate::palette::{region_fill, ColoredConnection};
use crate::projection::multipolygon_to_mercator;
use crate::resolver::{group_by_stage, ResolvedLocation};

const MARGIN: f64 = 20.0;
const LABEL_FONT: &str = "StageMapLabel";

/// The label font inlined, so the SVG carries its glyphs wherever it is moved.
fn font_data_uri(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| MapError::io(path, e))?;
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("otf") => "font/otf",
        Some(ext) if ext.eq_ignore_ascii_case("woff") => "font/woff",
        Some(ext) if ext.eq_ignore_ascii_case("woff2") => "font/woff2",
        _ => "font/ttf",
    };
    Ok(format!("data:{mime};base64,{}", BASE64_STANDARD.encode(bytes)))
}

/// What one static render draws.
pub struct StaticMap<'a> {
    pub regions: &'a [Region],
    pub locations: &'a [ResolvedLocation],
    pub connections: &'a [ColoredConnection],
    /// Fill regions by name instead of by country code.
    pub color_by_region: bool,
}

/// Fails fast when the label font is absent.
pub fn check_font(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(MapError::MissingResource { kind: "font", path: path.to_path_buf() })
    }
}

// ---------------------------------------------------------------------------
// Fitting mercator metres onto the canvas
// ---------------------------------------------------------------------------

struct Frame {
    min_x: f64,
    max_y: f64,
    scale: f64,
    off_x: f64,
    off_y: f64,
}

impl Frame {
    fn fit(bounds: Option<Rect<f64>>, style: &StyleConfig) -> Self {
        let Some(b) = bounds else {
            return Frame { min_x: 0.0, max_y: 0.0, scale: 1.0, off_x: MARGIN, off_y: MARGIN };
        };
        let avail_w = (style.width - 2.0 * MARGIN).max(1.0);
        let avail_h = (style.height - 2.0 * MARGIN).max(1.0);
        let dx = b.width().max(f64::EPSILON);
        let dy = b.height().max(f64::EPSILON);
        let scale = (avail_w / dx).min(avail_h / dy);
        Frame {
            min_x: b.min().x,
            max_y: b.max().y,
            scale,
            off_x: MARGIN + (avail_w - dx * scale) / 2.0,
            off_y: MARGIN + (avail_h - dy * scale) / 2.0,
        }
    }

    #[inline]
    fn px(&self, c: Coord<f64>) -> (f64, f64) {
        (
            self.off_x + (c.x - self.min_x) * self.scale,
            self.off_y + (self.max_y - c.y) * self.scale,
        )
    }
}

fn merge(acc: Option<Rect<f64>>, r: Rect<f64>) -> Option<Rect<f64>> {
    Some(match acc {
        None => r,
        Some(a) => Rect::new(
            Coord { x: a.min().x.min(r.min().x), y: a.min().y.min(r.min().y) },
            Coord { x: a.max().x.max(r.max().x), y: a.max().y.max(r.max().y) },
        ),
    })
}

// ---------------------------------------------------------------------------
// SVG pieces
// ---------------------------------------------------------------------------

fn ring_to_path(ring: &LineString<f64>, frame: &Frame, d: &mut String) {
    for (i, c) in ring.coords().enumerate() {
        let (x, y) = frame.px(*c);
        if i == 0 { let _ = write!(d, "M{x:.2},{y:.2}"); }
        else      { let _ = write!(d, "L{x:.2},{y:.2}"); }
    }
    d.push('Z');
}

fn legend_connection_text(count: usize) -> &'static str {
    if count == 1 { "Connected Repository" } else { "Connected Repositories" }
}

pub fn render_svg(map: &StaticMap<'_>, style: &StyleConfig, font: &Path) -> Result<String> {
    check_font(font)?;

    let (w, h) = (style.width, style.height);
    let regions: Vec<(&Region, geo::MultiPolygon<f64>)> = map
        .regions
        .iter()
        .map(|r| (r, multipolygon_to_mercator(&r.geometry)))
        .collect();

    let mut bounds = None;
    for (_, mp) in &regions {
        if let Some(r) = mp.bounding_rect() {
            bounds = merge(bounds, r);
        }
    }
    for loc in map.locations {
        let p = loc.projected;
        let pad = Coord { x: style.patch_size, y: style.patch_size };
        bounds = merge(bounds, Rect::new(p - pad, p + pad));
    }
    let frame = Frame::fit(bounds, style);

    let mut s = String::with_capacity(1 << 16);

    // header
    let _ = write!(
        s,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
  <title>Deployment Map</title>
  <defs>
    <style>@font-face {{ font-family: '{LABEL_FONT}'; src: url('{}'); }}</style>
  </defs>
"#,
        font_data_uri(font)?
    );

    // region polygons, one fill per grouping key
    let key = |r: &Region| -> String {
        if map.color_by_region { r.name.clone() } else { r.country_code.clone() }
    };
    let groups: BTreeSet<String> = regions.iter().map(|(r, _)| key(*r)).collect();
    let fills: HashMap<&str, &str> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g.as_str(), region_fill(i, groups.len())))
        .collect();

    s.push_str("  <g stroke='#ffffff' stroke-width='0.8' fill-rule='evenodd'>\n");
    for (region, mp) in &regions {
        let mut d = String::new();
        for poly in mp {
            ring_to_path(poly.exterior(), &frame, &mut d);
            for hole in poly.interiors() {
                ring_to_path(hole, &frame, &mut d);
            }
        }
        let fill = fills.get(key(*region).as_str()).copied().unwrap_or("#cccccc");
        let _ = writeln!(s, "    <path fill='{fill}' d='{d}'/>");
    }
    s.push_str("  </g>\n");

    // connections, dotted, under the markers
    let by_name: HashMap<&str, &ResolvedLocation> =
        map.locations.iter().map(|l| (l.name(), l)).collect();
    let mut drawn = Vec::new();
    s.push_str("  <g fill='none' stroke-width='2' stroke-dasharray='2,4' stroke-linecap='round'>\n");
    for cc in map.connections {
        let (Some(a), Some(b)) = (
            by_name.get(cc.connection.from.as_str()),
            by_name.get(cc.connection.to.as_str()),
        ) else {
            debug!("Connection {} - {} is outside this map", cc.connection.from, cc.connection.to);
            continue;
        };
        let (x1, y1) = frame.px(a.projected);
        let (x2, y2) = frame.px(b.projected);
        let _ = writeln!(
            s,
            "    <line class='connection' x1='{x1:.2}' y1='{y1:.2}' x2='{x2:.2}' y2='{y2:.2}' stroke='{}'/>",
            cc.color
        );
        drawn.push(cc.color);
    }
    s.push_str("  </g>\n");

    // markers with the user count on top
    let r = style.patch_size * frame.scale;
    let _ = writeln!(
        s,
        "  <g text-anchor='middle' dominant-baseline='central' font-family='{LABEL_FONT}' font-size='{}' font-weight='bold'>",
        style.font_size
    );
    for loc in map.locations {
        let (x, y) = frame.px(loc.projected);
        let _ = writeln!(
            s,
            "    <circle class='marker' cx='{x:.2}' cy='{y:.2}' r='{r:.2}' fill='{}'/>",
            loc.stage().fill()
        );
        let _ = writeln!(
            s,
            "    <text x='{x:.2}' y='{y:.2}' fill='#ffffff'>{}</text>",
            loc.location.num_users
        );
    }
    s.push_str("  </g>\n");

    // legend: connections collapse into one entry, then stages in order
    let mut entries: Vec<(LegendSwatch, &str)> = Vec::new();
    match drawn.as_slice() {
        [] => {}
        [only] => entries.push((LegendSwatch::Line(*only), legend_connection_text(1))),
        many => entries.push((LegendSwatch::Line("#000000"), legend_connection_text(many.len()))),
    }
    let stages: BTreeMap<_, _> = group_by_stage(map.locations);
    for stage in stages.keys() {
        entries.push((LegendSwatch::Disc(stage.fill()), stage.label()));
    }

    let lx = 16.0_f64;
    let mut ly = h - 16.0 - 20.0 * entries.len() as f64;
    s.push_str("  <g class='legend' font-family='sans-serif' font-size='12' fill='#000000'>\n");
    for (swatch, label) in &entries {
        match swatch {
            LegendSwatch::Line(color) => {
                let _ = writeln!(
                    s,
                    "    <line x1='{lx:.1}' y1='{ly:.1}' x2='{:.1}' y2='{ly:.1}' stroke='{color}' stroke-width='2' stroke-dasharray='2,4'/>",
                    lx + 12.0
                );
            }
            LegendSwatch::Disc(color) => {
                let _ = writeln!(s, "    <circle cx='{:.1}' cy='{ly:.1}' r='6' fill='{color}'/>", lx + 6.0);
            }
        }
        let _ = writeln!(s, "    <text class='legend-label' x='{:.1}' y='{:.1}'>{label}</text>", lx + 18.0, ly + 4.5);
        ly += 20.0;
    }
    s.push_str("  </g>\n");

    s.push_str("</svg>\n");
    Ok(s)
}

enum LegendSwatch<'a> {
    Line(&'a str),
    Disc(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::color_connections;
    use crate::registry::{Connection, Location};
    use crate::stage::Stage;
    use geo::{polygon, MultiPolygon};

    fn loc(name: &str, stage: Stage, users: u32, lon: f64, lat: f64) -> ResolvedLocation {
        ResolvedLocation::new(
            Location {
                common_name: name.into(),
                id_name: name.into(),
                country_code: "DE".into(),
                stage,
                num_users: users,
            },
            Coord { x: lon, y: lat },
        )
    }

    fn germany() -> Region {
        Region {
            id: "DE1".into(),
            country_code: "DE".into(),
            name: "Baden-Württemberg".into(),
            geometry: MultiPolygon::new(vec![polygon![
                (x: 6.0, y: 47.0), (x: 15.0, y: 47.0), (x: 15.0, y: 55.0), (x: 6.0, y: 55.0), (x: 6.0, y: 47.0)
            ]]),
        }
    }

    fn font() -> tempfile::NamedTempFile {
        tempfile::Builder::new().suffix(".ttf").tempfile().unwrap()
    }

    fn legend_labels(svg: &str) -> Vec<String> {
        svg.lines()
            .filter(|l| l.contains("class='legend-label'"))
            .filter_map(|l| l.split('>').nth(1).and_then(|t| t.split('<').next()))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn missing_font_fails_before_rendering() {
        let map = StaticMap { regions: &[], locations: &[], connections: &[], color_by_region: false };
        let err = render_svg(&map, &StyleConfig::default(), Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, MapError::MissingResource { kind: "font", .. }));
    }

    #[test]
    fn single_connection_is_labelled_singular() {
        let font = font();
        let regions = [germany()];
        let locations = [
            loc("Aachen", Stage::Production, 4, 6.08, 50.77),
            loc("Karlsruhe", Stage::Mixed, 5, 8.40, 49.01),
        ];
        let connections = color_connections(&[Connection::new("Karlsruhe", "Aachen")]);
        let map = StaticMap { regions: &regions, locations: &locations, connections: &connections, color_by_region: false };
        let svg = render_svg(&map, &StyleConfig::default(), font.path()).unwrap();

        assert_eq!(svg.matches("class='marker'").count(), 2);
        assert_eq!(svg.matches("class='connection'").count(), 1);
        assert_eq!(legend_labels(&svg), ["Connected Repository", "Production", "Mixed"]);
        assert!(svg.contains(">4</text>") && svg.contains(">5</text>"));
    }

    #[test]
    fn several_connections_collapse_into_one_black_entry() {
        let font = font();
        let locations = [
            loc("A", Stage::Test, 1, 7.0, 48.0),
            loc("B", Stage::Test, 2, 8.0, 49.0),
            loc("C", Stage::Planned, 3, 9.0, 50.0),
        ];
        let connections = color_connections(&[
            Connection::new("A", "B"),
            Connection::new("B", "C"),
            Connection::new("C", "A"),
        ]);
        let map = StaticMap { regions: &[], locations: &locations, connections: &connections, color_by_region: false };
        let svg = render_svg(&map, &StyleConfig::default(), font.path()).unwrap();

        assert_eq!(svg.matches("class='connection'").count(), 3);
        assert_eq!(legend_labels(&svg), ["Connected Repositories", "Planned", "Test"]);
        assert!(svg.contains("stroke='#000000' stroke-width='2'"));
    }

    #[test]
    fn no_connections_means_no_connection_legend() {
        let font = font();
        let locations = [loc("A", Stage::Test, 1, 7.0, 48.0)];
        let map = StaticMap { regions: &[], locations: &locations, connections: &[], color_by_region: false };
        let svg = render_svg(&map, &StyleConfig::default(), font.path()).unwrap();

        assert_eq!(legend_labels(&svg), ["Test"]);
        assert!(!svg.contains("class='connection'"));
    }

    #[test]
    fn markers_stay_inside_the_canvas() {
        let font = font();
        let regions = [germany()];
        let locations = [loc("Corner", Stage::Test, 1, 6.0, 55.0)];
        let map = StaticMap { regions: &regions, locations: &locations, connections: &[], color_by_region: true };
        let style = StyleConfig::default();
        let svg = render_svg(&map, &style, font.path()).unwrap();

        let line = svg.lines().find(|l| l.contains("class='marker'")).unwrap();
        let attr = |name: &str| -> f64 {
            let start = line.find(&format!("{name}='")).unwrap() + name.len() + 2;
            line[start..].split('\'').next().unwrap().parse().unwrap()
        };
        assert!(attr("cx") >= 0.0 && attr("cx") <= style.width);
        assert!(attr("cy") >= 0.0 && attr("cy") <= style.height);
    }

    #[test]
    fn label_font_is_embedded_not_linked() {
        let mut font = font();
        std::io::Write::write_all(&mut font, b"ttf!").unwrap();
        let map = StaticMap { regions: &[], locations: &[], connections: &[], color_by_region: false };
        let svg = render_svg(&map, &StyleConfig::default(), font.path()).unwrap();

        assert!(svg.contains("src: url('data:font/ttf;base64,dHRmIQ==')"));
        assert!(!svg.contains(&*font.path().to_string_lossy()));
    }
}
