//! Graphviz output. Stations become pinned nodes, every visible line a
//! chain of coloured edge runs.

use crate::pipeline::LineGraph;
use anyhow::Result;
use log::error;
use railnet::line_matching::edge_dedup::closed_walk;
use railnet::line_matching::{ColorCycle, EdgeRun, Line, LineColor, plan_line_edges};
use railnet::railnet_formats::{RailnetFile, StationId, Stop, cargo_label_name};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;

/// Offset of the helper node drawn for stations that are only passed.
const PASSED_OFFSET: f32 = 0.2;

#[derive(Debug, Default, Clone, Copy)]
struct StationUse {
    halted: bool,
    passed: bool,
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_name(stop: &Stop) -> String {
    if stop.halts {
        stop.station.to_string()
    } else {
        format!("p{}", stop.station)
    }
}

fn station_name(file: &RailnetFile, station: StationId) -> &str {
    file.stations
        .get(&station)
        .map(|info| info.name.as_str())
        .unwrap_or("?")
}

fn station_usage<'a>(lines: impl Iterator<Item = &'a Line>) -> BTreeMap<StationId, StationUse> {
    let mut usage: BTreeMap<StationId, StationUse> = BTreeMap::new();
    for line in lines {
        for stop in &line.stops {
            let entry = usage.entry(stop.station).or_default();
            if stop.halts {
                entry.halted = true;
            } else {
                entry.passed = true;
            }
        }
    }
    usage
}

fn write_run(
    out: &mut String,
    run: &EdgeRun,
    color: LineColor,
    cargo_label: Option<&str>,
) -> std::fmt::Result {
    let chain: Vec<String> = run.stops.iter().map(node_name).collect();
    write!(
        out,
        "\t{} [color=\"{:.3}, 1.0, {:.3}\"",
        chain.join(" -> "),
        color.hue,
        color.brightness()
    )?;
    if run.undirected {
        out.push_str(", dir=none");
    }
    if let Some(label) = cargo_label {
        write!(out, ", label=\"{}\"", label)?;
    }
    out.push_str("];\n");
    Ok(())
}

/// Renders one line into a buffer, so a line with a bad station leaves no
/// partial output behind.
fn render_line(
    file: &RailnetFile,
    line: &Line,
    color: LineColor,
    label_cargo: bool,
) -> Result<String> {
    let runs = plan_line_edges(line, |station| file.stations.contains_key(&station))?;

    let walk = closed_walk(&line.stops);
    let mid = walk.len() >> 1;
    let mut out = String::new();
    writeln!(
        out,
        "\t// order {} ({} - {})",
        line.primary_id,
        escape(station_name(file, walk[0].station)),
        escape(station_name(file, walk[mid].station))
    )?;

    let stops: Vec<String> = walk
        .iter()
        .map(|stop| {
            let suffix = if stop.halts { "" } else { "(p)" };
            format!("{}{}", station_name(file, stop.station), suffix)
        })
        .collect();
    writeln!(out, "\t// {}", stops.join(" - "))?;

    let cargo_label = label_cargo.then(|| {
        line.cargo
            .keys()
            .map(|label| cargo_label_name(*label))
            .collect::<Vec<_>>()
            .join(", ")
    });
    for run in &runs {
        write_run(&mut out, run, color, cargo_label.as_deref())?;
    }
    Ok(out)
}

pub fn write_dot<W: Write>(out: &mut W, file: &RailnetFile, graph: &LineGraph, stretch: f32) -> Result<()> {
    writeln!(out, "digraph graphname")?;
    writeln!(out, "{{")?;
    writeln!(out, "\tgraph[splines=line];")?;
    writeln!(out, "\tnode[label=\"\", size=0.2, width=0.2, height=0.2];")?;
    writeln!(out, "\tedge[penwidth=2];")?;

    let usage = station_usage(graph.visible_lines());
    for (id, info) in &file.stations {
        let Some(used) = usage.get(id) else {
            continue;
        };
        if used.halted {
            writeln!(
                out,
                "\t{} [xlabel=\"{}\", pos=\"{}, {}!\"];",
                id,
                escape(&info.name),
                info.x * stretch,
                info.y * stretch
            )?;
        }
        if used.passed {
            writeln!(
                out,
                "\tp{} [pos=\"{}, {}!\" size=0.0, width=0.0, height=0.0];",
                id,
                (info.x - PASSED_OFFSET) * stretch,
                (info.y - PASSED_OFFSET) * stretch
            )?;
        }
    }

    let mut colors = ColorCycle::new(graph.visible.len());
    for line in graph.visible_lines() {
        let color = colors.advance();
        match render_line(file, line, color, graph.label_cargo) {
            Ok(text) => out.write_all(text.as_bytes())?,
            Err(e) => error!("Skipping train {}: {}", line.primary_id, e),
        }
    }

    writeln!(out, "}}")?;
    Ok(())
}
