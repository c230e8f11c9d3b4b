use narwhal::Error;
use narwhal::graphlib::{LayeredGraph, NodeId, NodeKind, PortConstraints, PortId, PortSide};
use narwhal::order::{PortRanks, PortType};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

struct Fixture {
    g: LayeredGraph,
    source: NodeId,
    sink: NodeId,
}

fn fixture() -> Fixture {
    let mut g = LayeredGraph::new();
    g.add_layer();
    g.add_layer();
    g.add_layer();
    let source = g.add_node(0, "source", NodeKind::Normal).unwrap();
    g.add_node(1, "v", NodeKind::Normal).unwrap();
    let sink = g.add_node(2, "sink", NodeKind::Normal).unwrap();
    Fixture { g, source, sink }
}

impl Fixture {
    fn v(&self) -> NodeId {
        self.g.node_by_id("v").unwrap()
    }

    fn input(&mut self, side: PortSide) -> PortId {
        let v = self.v();
        let port = self.g.add_port(v, side);
        let out = self.g.add_port(self.source, PortSide::East);
        self.g.add_edge(out, port);
        port
    }

    fn output(&mut self, side: PortSide) -> PortId {
        let v = self.v();
        let port = self.g.add_port(v, side);
        let inp = self.g.add_port(self.sink, PortSide::West);
        self.g.add_edge(port, inp);
        port
    }
}

#[test]
fn port_type_parses_case_insensitively() {
    assert_eq!("input".parse::<PortType>().unwrap(), PortType::Input);
    assert_eq!(" OUTPUT ".parse::<PortType>().unwrap(), PortType::Output);
    match "sideways".parse::<PortType>() {
        Err(Error::InvalidPortType { value }) => assert_eq!(value, "sideways"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn node_without_relevant_ports_does_not_advance_the_rank_sum() {
    let mut f = fixture();
    f.output(PortSide::East);
    let v = f.v();
    let mut ranks = PortRanks::new(f.g.port_count());
    assert_eq!(ranks.calculate_node(&f.g, v, 3.0, PortType::Input), 0.0);
    assert_eq!(ranks.calculate_node(&f.g, v, 3.0, PortType::Output), 1.0);
}

#[test]
fn free_ports_share_a_side_specific_rank() {
    let mut f = fixture();
    let w1 = f.input(PortSide::West);
    let w2 = f.input(PortSide::West);
    let n = f.input(PortSide::North);
    let e = f.input(PortSide::East);
    let v = f.v();

    let mut ranks = PortRanks::new(f.g.port_count());
    assert_eq!(ranks.calculate_node(&f.g, v, 2.0, PortType::Input), 1.0);
    assert_close(ranks.get(w1), ranks.get(w2));
    assert!(ranks.get(n) < ranks.get(w1));
    assert!(ranks.get(w1) < ranks.get(e));
    for p in [w1, w2, n, e] {
        assert!((2.0..3.0).contains(&ranks.get(p)));
    }
}

#[test]
fn free_output_ports_rank_east_before_west() {
    let mut f = fixture();
    let w = f.output(PortSide::West);
    let e = f.output(PortSide::East);
    let s = f.output(PortSide::South);
    let v = f.v();

    let mut ranks = PortRanks::new(f.g.port_count());
    ranks.calculate_node(&f.g, v, 0.0, PortType::Output);
    assert!(ranks.get(e) < ranks.get(s));
    assert!(ranks.get(s) < ranks.get(w));
}

#[test]
fn fixed_output_ranks_increase_in_clockwise_order() {
    let mut f = fixture();
    let v = f.v();
    f.g.set_port_constraints(v, PortConstraints::FixedOrder);
    let n = f.output(PortSide::North);
    let e1 = f.output(PortSide::East);
    let e2 = f.output(PortSide::East);
    let s = f.output(PortSide::South);
    let w = f.output(PortSide::West);

    let mut ranks = PortRanks::new(f.g.port_count());
    assert_eq!(ranks.calculate_node(&f.g, v, 1.0, PortType::Output), 1.0);
    let values: Vec<f64> = f.g.node(v).ports.iter().map(|&p| ranks.get(p)).collect();
    assert_eq!(f.g.node(v).ports, vec![n, e1, e2, s, w]);
    for (i, expected) in [1.0 / 6.0, 2.0 / 6.0, 3.0 / 6.0, 4.0 / 6.0, 5.0 / 6.0]
        .into_iter()
        .enumerate()
    {
        assert_close(values[i], 1.0 + expected);
    }
}

#[test]
fn fixed_input_ranks_scan_north_west_south_east() {
    let mut f = fixture();
    let v = f.v();
    f.g.set_port_constraints(v, PortConstraints::FixedOrder);
    let n = f.input(PortSide::North);
    let e = f.input(PortSide::East);
    let s = f.input(PortSide::South);
    let w = f.input(PortSide::West);

    let mut ranks = PortRanks::new(f.g.port_count());
    ranks.calculate_node(&f.g, v, 0.0, PortType::Input);
    assert_close(ranks.get(n), 0.2);
    assert_close(ranks.get(w), 0.4);
    assert_close(ranks.get(s), 0.6);
    assert_close(ranks.get(e), 0.8);
}

#[test]
fn fixed_input_ranks_decrease_in_clockwise_order_within_a_side_group() {
    let mut f = fixture();
    let v = f.v();
    f.g.set_port_constraints(v, PortConstraints::FixedOrder);
    let n1 = f.input(PortSide::North);
    let n2 = f.input(PortSide::North);
    let w1 = f.input(PortSide::West);
    let w2 = f.input(PortSide::West);
    let w3 = f.input(PortSide::West);

    let mut ranks = PortRanks::new(f.g.port_count());
    ranks.calculate_node(&f.g, v, 0.0, PortType::Input);
    assert!(ranks.get(n1) > ranks.get(n2));
    assert!(ranks.get(w1) > ranks.get(w2));
    assert!(ranks.get(w2) > ranks.get(w3));
    assert!(ranks.get(n1) < ranks.get(w3));
    for p in [n1, n2, w1, w2, w3] {
        assert!(ranks.get(p) > 0.0 && ranks.get(p) < 1.0);
    }
}

#[test]
fn unconnected_ports_of_a_fixed_node_are_skipped() {
    let mut f = fixture();
    let v = f.v();
    f.g.set_port_constraints(v, PortConstraints::FixedOrder);
    let a = f.output(PortSide::East);
    f.g.add_port(v, PortSide::East);
    let b = f.output(PortSide::East);

    let mut ranks = PortRanks::new(f.g.port_count());
    ranks.calculate_node(&f.g, v, 0.0, PortType::Output);
    assert_close(ranks.get(a), 1.0 / 3.0);
    assert_close(ranks.get(b), 2.0 / 3.0);
}

#[test]
fn calculate_layer_gives_each_connected_node_its_own_interval() {
    let mut g = LayeredGraph::new();
    g.add_layer();
    g.add_layer();
    let a = g.add_node(0, "a", NodeKind::Normal).unwrap();
    let lonely = g.add_node(0, "lonely", NodeKind::Normal).unwrap();
    let b = g.add_node(0, "b", NodeKind::Normal).unwrap();
    let t = g.add_node(1, "t", NodeKind::Normal).unwrap();
    let ea = g.connect(a, t);
    let eb = g.connect(b, t);

    let mut ranks = PortRanks::default();
    ranks.calculate_layer(&g, &[a, lonely, b], PortType::Output);
    let pa = ranks.get(g.edge(ea).source);
    let pb = ranks.get(g.edge(eb).source);
    assert!((0.0..1.0).contains(&pa));
    assert!((1.0..2.0).contains(&pb));
}
