//! Layer sweep driver: alternating forward and backward barycenter sweeps over randomized
//! starting layers, keeping the ordering with the fewest crossings.

use super::barycenter::BarycenterHeuristic;
use super::cross_count::CrossingsCounter;
use super::port_ranks::{PortRanks, PortType};
use crate::error::Result;
use crate::options::CrossMinOptions;
use crate::random::XorShift64Star;
use narwhal_graphlib::{LayeredGraph, NodeId, NodeKind};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossMinResult {
    /// Node order per layer.
    pub layers: Vec<Vec<NodeId>>,
    pub crossings: usize,
    pub runs: usize,
    pub sweeps: usize,
}

impl CrossMinResult {
    /// Writes the layer orders back into `graph`.
    pub fn apply_to(&self, graph: &mut LayeredGraph) -> Result<()> {
        for (layer, order) in self.layers.iter().enumerate() {
            graph.set_layer_order(layer, order)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct LayerSweepCrossingMinimizer<'g> {
    graph: &'g LayeredGraph,
    options: CrossMinOptions,
    heuristic: BarycenterHeuristic<'g>,
    counter: CrossingsCounter<'g>,
    ranks: PortRanks,
    rng: XorShift64Star,
    sweeps: usize,
}

impl<'g> LayerSweepCrossingMinimizer<'g> {
    pub fn new(graph: &'g LayeredGraph, options: &CrossMinOptions) -> Self {
        Self {
            graph,
            options: options.clone(),
            heuristic: BarycenterHeuristic::new(graph),
            counter: CrossingsCounter::new(graph),
            ranks: PortRanks::new(graph.port_count()),
            rng: XorShift64Star::new(options.random_seed),
            sweeps: 0,
        }
    }

    pub fn minimize(&mut self) -> CrossMinResult {
        let initial: Vec<Vec<NodeId>> = self.graph.layers().to_vec();
        let single_node = initial.len() == 1 && initial[0].len() == 1;
        if self.graph.node_count() == 0 || single_node {
            return CrossMinResult {
                layers: initial,
                crossings: 0,
                runs: 0,
                sweeps: 0,
            };
        }

        let _span = tracing::debug_span!(
            "minimize_crossings",
            layers = initial.len(),
            nodes = self.graph.node_count()
        )
        .entered();

        self.sweeps = 0;
        let mut best_crossings = usize::MAX;
        let mut best_layers = initial.clone();
        let mut runs = 0;
        for run in 0..self.options.runs() {
            if best_crossings == 0 {
                break;
            }
            runs += 1;
            let forward = self.rng.next_bool();
            let mut order = initial.clone();
            let (crossings, run_best) = self.minimize_run(&mut order, forward);
            tracing::debug!(run, forward, crossings, "crossing minimization run finished");
            if crossings < best_crossings {
                best_crossings = crossings;
                best_layers = run_best;
            }
        }

        tracing::debug!(
            crossings = best_crossings,
            runs,
            sweeps = self.sweeps,
            "crossing minimization finished"
        );
        CrossMinResult {
            layers: best_layers,
            crossings: best_crossings,
            runs,
            sweeps: self.sweeps,
        }
    }

    /// One run: randomize the first layer, then alternate sweep directions while the crossing
    /// count strictly drops. Returns the run's best count and the ordering that achieved it.
    fn minimize_run(
        &mut self,
        order: &mut [Vec<NodeId>],
        mut forward: bool,
    ) -> (usize, Vec<Vec<NodeId>>) {
        self.set_first_layer_order(order, forward);
        self.sweep(order, forward, true);
        let mut run_sweeps = 1;
        let mut new_crossings = self.count(order);
        tracing::trace!(forward, crossings = new_crossings, "sweep");

        loop {
            let run_best = order.to_vec();
            if new_crossings == 0 || run_sweeps >= self.options.max_sweeps_per_run {
                return (new_crossings, run_best);
            }

            forward = !forward;
            let old_crossings = new_crossings;
            self.sweep(order, forward, false);
            run_sweeps += 1;
            new_crossings = self.count(order);
            tracing::trace!(forward, crossings = new_crossings, "sweep");

            if new_crossings >= old_crossings {
                return (old_crossings, run_best);
            }
        }
    }

    fn set_first_layer_order(&mut self, order: &mut [Vec<NodeId>], forward: bool) {
        if order.is_empty() {
            return;
        }
        let start = if forward { 0 } else { order.len() - 1 };
        self.heuristic.minimize_crossings(
            &mut order[start],
            &self.ranks,
            false,
            true,
            forward,
            &mut self.rng,
        );
    }

    fn sweep(&mut self, order: &mut [Vec<NodeId>], forward: bool, first_sweep: bool) {
        self.sweeps += 1;
        let len = order.len();
        let mut merges = 0;
        if forward {
            for i in 1..len {
                self.ranks
                    .calculate_layer(self.graph, &order[i - 1], PortType::Output);
                let pre_ordered = !first_sweep || self.starts_with_external_port(&order[i]);
                merges += self.heuristic.minimize_crossings(
                    &mut order[i],
                    &self.ranks,
                    pre_ordered,
                    false,
                    true,
                    &mut self.rng,
                );
            }
        } else {
            for i in (0..len.saturating_sub(1)).rev() {
                self.ranks
                    .calculate_layer(self.graph, &order[i + 1], PortType::Input);
                let pre_ordered = !first_sweep || self.starts_with_external_port(&order[i]);
                merges += self.heuristic.minimize_crossings(
                    &mut order[i],
                    &self.ranks,
                    pre_ordered,
                    false,
                    false,
                    &mut self.rng,
                );
            }
        }
        tracing::trace!(forward, merges, "constraint merges during sweep");
    }

    fn starts_with_external_port(&self, layer: &[NodeId]) -> bool {
        layer
            .first()
            .is_some_and(|&v| self.graph.node(v).kind == NodeKind::ExternalPort)
    }

    fn count(&self, order: &[Vec<NodeId>]) -> usize {
        self.counter
            .count_all_crossings(order, self.options.count_in_layer_crossings)
    }
}
