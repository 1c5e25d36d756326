use std::path::Path;

use colored::Colorize;
use livegate::{LiveGateConfig, Schematic};

use super::net_color;

pub fn run(config: &LiveGateConfig, svg: &Path) -> anyhow::Result<()> {
    let schematic = Schematic::open(svg, config)?;
    let cells = schematic.cells();

    println!("{} {} cells", "▶".blue(), cells.len());
    for cell in cells {
        println!("  {} [{}]", cell.name.bold(), cell.behavior.cyan());
        if cell.ports.is_empty() {
            println!("    {}", "(no pins)".dimmed());
        }
        for (label, net) in &cell.ports {
            let net_tag = net.to_string().color(net_color(net.index()));
            println!("    {label:<8} → {net_tag}");
        }
    }
    Ok(())
}
