use crate::config::{CargoFilter, GraphConfig};
use anyhow::{Context, Result, bail};
use log::{debug, info};
use railnet::line_matching::{LineFilter, LineId, LineRegistry, MergeOutcome};
use railnet::railnet_formats::{CargoLabel, RailnetFile, cargo_label_name};
use std::collections::BTreeSet;

/// Lines ready for rendering.
pub struct LineGraph {
    pub registry: LineRegistry,
    /// Lines that survived the short/express filter, in registry order.
    pub visible: Vec<LineId>,
    /// Edges get a cargo label only when more than one cargo is in play.
    pub label_cargo: bool,
}

impl LineGraph {
    pub fn visible_lines(&self) -> impl Iterator<Item = &railnet::line_matching::Line> + '_ {
        self.visible.iter().filter_map(|id| self.registry.line(*id))
    }
}

pub fn cargo_names(file: &RailnetFile) -> Vec<String> {
    file.cargo_labels.iter().map(|l| cargo_label_name(*l)).collect()
}

/// Strips every cargo label outside `filter` and drops order lists left
/// without cargo.
pub fn apply_cargo_filter(file: &mut RailnetFile, filter: &CargoFilter) -> Result<()> {
    let known: BTreeSet<CargoLabel> = file.cargo_labels.iter().copied().collect();
    let unknown: Vec<String> = filter
        .0
        .iter()
        .filter(|label| !known.contains(label))
        .map(|label| cargo_label_name(*label))
        .collect();
    if !unknown.is_empty() {
        bail!("not all of your cargos are known: {}", unknown.join(", "));
    }

    let wanted: BTreeSet<CargoLabel> = filter.0.iter().copied().collect();
    let before = file.order_lists.len();
    file.order_lists.retain_mut(|order_list| {
        order_list.forward_cargo.retain(|label| wanted.contains(label));
        order_list.backward_cargo.retain(|label| wanted.contains(label));
        order_list.has_cargo()
    });
    debug!(
        "Cargo filter {} kept {} of {} order lists",
        filter,
        file.order_lists.len(),
        before
    );
    Ok(())
}

pub fn build_graph(mut file: RailnetFile, config: &GraphConfig) -> Result<(RailnetFile, LineGraph)> {
    let cargo_count = match &config.cargo {
        Some(filter) => {
            apply_cargo_filter(&mut file, filter)?;
            filter.0.len()
        }
        None => file.cargo_labels.len(),
    };

    let mut registry = LineRegistry::new();
    let mut merged = 0;
    for order_list in &file.order_lists {
        let outcome = registry
            .submit(order_list)
            .with_context(|| format!("Failed to merge order list of train {}", order_list.primary_id))?;
        if matches!(
            outcome,
            MergeOutcome::MergedForward { .. } | MergeOutcome::MergedReverse { .. }
        ) {
            merged += 1;
        }
    }
    info!(
        "{} order lists form {} lines ({} merged)",
        file.order_lists.len(),
        registry.len(),
        merged
    );

    let visible = registry.visible_lines(LineFilter {
        hide_short: config.hide_short_trains,
        hide_express: config.hide_express_trains,
    })?;

    let graph = LineGraph {
        registry,
        visible,
        label_cargo: cargo_count > 1,
    };
    Ok((file, graph))
}
