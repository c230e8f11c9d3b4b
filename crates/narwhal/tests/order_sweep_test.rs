use narwhal::graphlib::{LayeredGraph, NodeId, NodeKind, PortConstraints, PortSide};
use narwhal::order::CrossingsCounter;
use narwhal::random::XorShift64Star;
use narwhal::{CrossMinOptions, Error, LayerSweepCrossingMinimizer, minimize_crossings};

fn random_graph(seed: u64) -> LayeredGraph {
    let mut rng = XorShift64Star::new(seed);
    let mut g = LayeredGraph::new();
    let layer_count = 2 + rng.next_usize(4);
    let mut layers: Vec<Vec<NodeId>> = Vec::new();
    for l in 0..layer_count {
        g.add_layer();
        let size = 1 + rng.next_usize(6);
        let layer: Vec<NodeId> = (0..size)
            .map(|i| g.add_node(l, format!("n{l}_{i}"), NodeKind::Normal).unwrap())
            .collect();
        for &v in &layer {
            if rng.next_usize(4) == 0 {
                g.set_port_constraints(v, PortConstraints::FixedOrder);
            }
        }
        layers.push(layer);
    }
    for l in 1..layer_count {
        for _ in 0..rng.next_usize(3 * layers[l].len() + 1) {
            let s = layers[l - 1][rng.next_usize(layers[l - 1].len())];
            let t = layers[l][rng.next_usize(layers[l].len())];
            g.connect(s, t);
        }
    }
    g
}

#[test]
fn empty_graph_is_returned_unchanged() {
    let mut g = LayeredGraph::new();
    g.add_layer();
    let result = minimize_crossings(&mut g, &CrossMinOptions::default()).unwrap();
    assert_eq!(result.crossings, 0);
    assert_eq!(result.runs, 0);
    assert_eq!(result.sweeps, 0);
    assert_eq!(result.layers, vec![Vec::<NodeId>::new()]);
}

#[test]
fn single_node_graph_is_returned_unchanged() {
    let mut g = LayeredGraph::new();
    g.add_layer();
    let v = g.add_node(0, "v", NodeKind::Normal).unwrap();
    let result = minimize_crossings(&mut g, &CrossMinOptions::default()).unwrap();
    assert_eq!(result.layers, vec![vec![v]]);
    assert_eq!(result.runs, 0);
}

#[test]
fn simple_x_is_untangled_and_written_back() {
    let mut g = LayeredGraph::new();
    g.add_layer();
    g.add_layer();
    let a1 = g.add_node(0, "a1", NodeKind::Normal).unwrap();
    let a2 = g.add_node(0, "a2", NodeKind::Normal).unwrap();
    let b1 = g.add_node(1, "b1", NodeKind::Normal).unwrap();
    let b2 = g.add_node(1, "b2", NodeKind::Normal).unwrap();
    g.connect(a1, b2);
    g.connect(a2, b1);
    assert_eq!(CrossingsCounter::new(&g).count_all_crossings(g.layers(), true), 1);

    let result = minimize_crossings(&mut g, &CrossMinOptions::default()).unwrap();
    assert_eq!(result.crossings, 0);
    assert_eq!(result.runs, 1);
    assert_eq!(g.layers(), result.layers.as_slice());
    assert_eq!(CrossingsCounter::new(&g).count_all_crossings(g.layers(), true), 0);
}

#[test]
fn reported_crossings_match_a_recount_of_the_result() {
    for seed in 1..40 {
        let g = random_graph(seed);
        let options = CrossMinOptions {
            random_seed: seed,
            ..CrossMinOptions::default()
        };
        let result = LayerSweepCrossingMinimizer::new(&g, &options).minimize();
        let recount = CrossingsCounter::new(&g).count_all_crossings(&result.layers, true);
        assert_eq!(result.crossings, recount, "seed {seed}");
        assert!(result.runs >= 1 && result.runs <= options.thoroughness);
        assert!(result.sweeps >= result.runs);
    }
}

#[test]
fn results_are_layer_permutations() {
    for seed in 1..20 {
        let g = random_graph(seed);
        let result = LayerSweepCrossingMinimizer::new(&g, &CrossMinOptions::default()).minimize();
        assert_eq!(result.layers.len(), g.layer_count());
        for (layer, order) in result.layers.iter().enumerate() {
            let mut sorted = order.clone();
            sorted.sort();
            let mut expected = g.layer(layer).to_vec();
            expected.sort();
            assert_eq!(sorted, expected);
        }
    }
}

#[test]
fn same_seed_gives_the_same_result() {
    let g = random_graph(12345);
    let options = CrossMinOptions {
        random_seed: 42,
        ..CrossMinOptions::default()
    };
    let first = LayerSweepCrossingMinimizer::new(&g, &options).minimize();
    let second = LayerSweepCrossingMinimizer::new(&g, &options).minimize();
    assert_eq!(first, second);
}

#[test]
fn more_runs_never_do_worse() {
    for seed in 1..20 {
        let g = random_graph(seed * 7);
        let one = CrossMinOptions {
            thoroughness: 1,
            random_seed: seed,
            ..CrossMinOptions::default()
        };
        let many = CrossMinOptions {
            thoroughness: 10,
            ..one.clone()
        };
        let a = LayerSweepCrossingMinimizer::new(&g, &one).minimize();
        let b = LayerSweepCrossingMinimizer::new(&g, &many).minimize();
        assert!(b.crossings <= a.crossings, "seed {seed}");
    }
}

#[test]
fn zero_thoroughness_still_runs_once() {
    let g = random_graph(3);
    let options = CrossMinOptions {
        thoroughness: 0,
        ..CrossMinOptions::default()
    };
    let result = LayerSweepCrossingMinimizer::new(&g, &options).minimize();
    assert_eq!(result.runs, 1);
}

#[test]
fn sweeps_per_run_are_bounded() {
    let g = random_graph(8);
    let options = CrossMinOptions {
        thoroughness: 3,
        max_sweeps_per_run: 1,
        ..CrossMinOptions::default()
    };
    let result = LayerSweepCrossingMinimizer::new(&g, &options).minimize();
    assert_eq!(result.sweeps, result.runs);
}

#[test]
fn successor_constraints_hold_in_the_final_order() {
    let mut g = LayeredGraph::new();
    g.add_layer();
    g.add_layer();
    let a1 = g.add_node(0, "a1", NodeKind::Normal).unwrap();
    let a2 = g.add_node(0, "a2", NodeKind::Normal).unwrap();
    let b1 = g.add_node(1, "b1", NodeKind::Normal).unwrap();
    let b2 = g.add_node(1, "b2", NodeKind::Normal).unwrap();
    // The edges pull b2 above b1, the constraint keeps b1 first.
    g.connect(a1, b2);
    g.connect(a2, b1);
    g.add_successor_constraint(b1, b2).unwrap();
    g.add_successor_constraint(a1, a2).unwrap();

    let result = minimize_crossings(&mut g, &CrossMinOptions::default()).unwrap();
    assert_eq!(g.layer(0), &[a1, a2]);
    assert_eq!(g.layer(1), &[b1, b2]);
    assert_eq!(result.crossings, 1);
}

#[test]
fn in_layer_estimate_can_be_left_out_of_the_count() {
    let mut g = LayeredGraph::new();
    g.add_layer();
    g.add_layer();
    let a = g.add_node(0, "a", NodeKind::Normal).unwrap();
    let b = g.add_node(0, "b", NodeKind::Normal).unwrap();
    let c = g.add_node(0, "c", NodeKind::Normal).unwrap();
    let t = g.add_node(1, "t", NodeKind::Normal).unwrap();
    for &v in &[a, b, c] {
        g.set_port_constraints(v, PortConstraints::FixedOrder);
    }
    let pa = g.add_port(a, PortSide::East);
    let pc = g.add_port(c, PortSide::East);
    g.add_edge(pa, pc);
    g.connect(b, t);

    let options = CrossMinOptions {
        count_in_layer_crossings: false,
        ..CrossMinOptions::default()
    };
    let result = minimize_crossings(&mut g, &options).unwrap();
    assert_eq!(result.crossings, 0);
}

#[test]
fn invalid_graphs_are_rejected_before_minimizing() {
    let mut g = LayeredGraph::new();
    g.add_layer();
    g.add_layer();
    g.add_layer();
    let a = g.add_node(0, "a", NodeKind::Normal).unwrap();
    let c = g.add_node(2, "c", NodeKind::Normal).unwrap();
    g.connect(a, c);
    assert!(matches!(
        minimize_crossings(&mut g, &CrossMinOptions::default()),
        Err(Error::Graph(_))
    ));
}

#[test]
fn invalid_options_are_rejected() {
    let mut g = random_graph(1);
    let options = CrossMinOptions {
        max_sweeps_per_run: 0,
        ..CrossMinOptions::default()
    };
    assert!(matches!(
        minimize_crossings(&mut g, &options),
        Err(Error::InvalidOptions { .. })
    ));
}
