use criterion::{black_box, criterion_group, criterion_main, Criterion};
use livegate::flatten::flatten;
use livegate::geometry::Point;
use livegate::nets::{Netlist, WireSegment};
use livegate::{BehaviorRegistry, Document, LiveGateConfig, Schematic};

/// A grid of `n × n` cells, each wire sharing endpoints with its neighbours.
fn grid(n: usize) -> Vec<WireSegment> {
    let mut segs = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let p = Point::new(x as f64 * 10.0, y as f64 * 10.0);
            segs.push(WireSegment {
                node: None,
                label: format!("h{x}_{y}"),
                points: vec![p, p.offset(10.0, 0.0)],
            });
            segs.push(WireSegment {
                node: None,
                label: format!("v{x}_{y}"),
                points: vec![p, p.offset(0.0, 10.0)],
            });
        }
    }
    segs
}

fn bench_partition(c: &mut Criterion) {
    let segs = grid(16);
    c.bench_function("partition_16x16_grid", |b| {
        b.iter(|| black_box(Netlist::from_segments(black_box(segs.clone()), 0.001)))
    });
}

fn bench_flatten(c: &mut Criterion) {
    let mut src = String::from(
        r##"<svg><defs><g id="cell"><path d="m 0,0 l 10,0"/><path d="m 0,10 l 10,0"/></g></defs>"##,
    );
    for i in 0..200 {
        src.push_str(&format!(r##"<use href="#cell" transform="translate({},0)"/>"##, i * 20));
    }
    src.push_str("</svg>");
    let doc = Document::parse(&src).unwrap();

    c.bench_function("flatten_200_instances", |b| {
        b.iter(|| {
            let mut d = doc.clone();
            black_box(flatten(&mut d).unwrap())
        })
    });
}

/// `n` inverters in a row, each output pin ending where the next input starts.
/// A cell's own pins do not touch.
fn inverter_chain(n: usize) -> String {
    let mut src = String::from("<svg>");
    for i in 0..n {
        let x = i * 20;
        src.push_str(&format!(
            r#"<g data-role="cell" data-behavior="not"><path data-pin="a" d="m {x},0 l 5,0"/><path data-pin="y" d="m {},0 l 12,0"/></g>"#,
            x + 8
        ));
    }
    src.push_str("</svg>");
    src
}

fn bench_scheduler(c: &mut Criterion) {
    let config = LiveGateConfig::default();
    let schematic = Schematic::parse(&inverter_chain(64), &config).unwrap();
    let first = schematic.cells()[0].ports["a"];
    let mut host = BehaviorRegistry::new().with("not", |ports| {
        let (a, y) = (ports.port("a")?, ports.port("y")?);
        ports.on_change("a", move |sim| {
            let v = a.get(sim).unwrap_or(false);
            y.set(sim, !v);
            Ok(())
        })
    });

    c.bench_function("inverter_chain_64_step", |b| {
        b.iter(|| {
            let mut circuit = schematic.clone().start(&mut host, &config).unwrap();
            circuit.drive(first, true);
            black_box(circuit.advance_timestep().unwrap())
        })
    });
}

criterion_group!(benches, bench_partition, bench_flatten, bench_scheduler);
criterion_main!(benches);
