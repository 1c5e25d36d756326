use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use livegate::{LiveGateConfig, Schematic};

use super::net_rgb;

pub fn run(
    config: &LiveGateConfig,
    svg: &Path,
    output: Option<&Path>,
    color_nets: bool,
) -> anyhow::Result<()> {
    let schematic = Schematic::open(svg, config)?;
    let mut document = schematic.document().clone();

    if color_nets {
        let netlist = schematic.netlist();
        for segment in netlist.segments() {
            let Some(node) = segment.node else { continue };
            let net = netlist
                .net_of_node(node)
                .with_context(|| format!("{} has no net", segment.label))?;
            let (r, g, b) = net_rgb(net.index());
            let style = match document.attr(node, "style") {
                Some(existing) => format!("{};stroke:rgb({r},{g},{b})", existing.trim_end_matches(';')),
                None => format!("stroke:rgb({r},{g},{b})"),
            };
            document.set_attr(node, "style", &style);
        }
    }

    let xml = document.to_xml();
    match output {
        Some(path) => {
            std::fs::write(path, xml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            let report = schematic.flatten_report();
            eprintln!(
                "{} {} references expanded ({} definitions) → {}",
                "✓".green(),
                report.references,
                report.definitions,
                path.display()
            );
        }
        None => print!("{xml}"),
    }
    Ok(())
}
