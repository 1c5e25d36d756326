pub mod cells;
pub mod flatten;
pub mod nets;

use std::path::Path;

use colored::Color;
use livegate::config::{load_user_config, LiveGateConfig};

/// `--config` if given, else the per-user file, else defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<LiveGateConfig> {
    if let Some(path) = path {
        return Ok(LiveGateConfig::load(path)?);
    }
    Ok(load_user_config()?.unwrap_or_default())
}

/// Distinct colors for neighbouring nets.
const NET_COLORS: &[(u8, u8, u8)] = &[
    (230, 25, 75),
    (60, 180, 75),
    (255, 225, 25),
    (0, 130, 200),
    (245, 130, 48),
    (145, 30, 180),
    (70, 240, 240),
    (240, 50, 230),
    (210, 245, 60),
    (250, 190, 212),
    (0, 128, 128),
    (170, 110, 40),
];

pub fn net_rgb(index: usize) -> (u8, u8, u8) {
    NET_COLORS[index % NET_COLORS.len()]
}

pub fn net_color(index: usize) -> Color {
    let (r, g, b) = net_rgb(index);
    Color::TrueColor { r, g, b }
}
