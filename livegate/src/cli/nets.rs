use std::path::Path;

use colored::Colorize;
use livegate::{LiveGateConfig, Schematic};

use super::net_color;

pub fn run(config: &LiveGateConfig, svg: &Path, json: bool) -> anyhow::Result<()> {
    let schematic = Schematic::open(svg, config)?;
    let report = schematic.net_report(&[]);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {} nets from {} wires",
        "▶".blue(),
        report.nets.len(),
        schematic.extraction().decoded
    );
    for entry in &report.nets {
        let tag = format!("n{:<4}", entry.net).color(net_color(entry.net)).bold();
        println!("  {tag} {}", entry.segments.join(", "));
    }

    if !report.rejected.is_empty() {
        println!(
            "\n{} {} paths skipped",
            "⚠".yellow(),
            report.rejected.len()
        );
        for r in &report.rejected {
            println!("  {} {}", r.path.dimmed(), r.reason);
        }
    }
    Ok(())
}
