//! Colours shared between the static and the interactive map.

use crate::registry::Connection;

const TAB10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

const TAB20: [&str; 20] = [
    "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c",
    "#98df8a", "#d62728", "#ff9896", "#9467bd", "#c5b0d5",
    "#8c564b", "#c49c94", "#e377c2", "#f7b6d2", "#7f7f7f",
    "#c7c7c7", "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
];

/// Colour for the connection at `index` in its declared list.
pub fn connection_color(index: usize) -> &'static str {
    TAB10[index % TAB10.len()]
}

/// A connection paired with the colour both renderers draw it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColoredConnection {
    pub connection: Connection,
    pub color: &'static str,
}

pub fn color_connections(connections: &[Connection]) -> Vec<ColoredConnection> {
    connections
        .iter()
        .enumerate()
        .map(|(i, c)| ColoredConnection { connection: c.clone(), color: connection_color(i) })
        .collect()
}

/// Fill for the `index`-th of `count` region groups, spread over the whole
/// 20-colour table when there are fewer groups than colours.
pub fn region_fill(index: usize, count: usize) -> &'static str {
    if count <= 1 {
        return TAB20[0];
    }
    if count >= TAB20.len() {
        return TAB20[index % TAB20.len()];
    }
    let pos = index * (TAB20.len() - 1) / (count - 1);
    TAB20[pos]
}
