//! Structural checks on the assignment topology, plus start/stop and
//! shaping checks over real namespaces when the host allows it.
//!
//! Run the privileged part with:
//! ```bash
//! sudo cargo test -p netlab-sim --test assignment_topology -- --nocapture
//! ```

use std::time::Duration;

use netlab_sim::assignment::assignment_networks;
use netlab_sim::net::Network;
use netlab_sim::test_util::{can_emulate, unique_ns_prefix, RecordingRunner};
use netlab_sim::{EmulationError, LinkParams, NodeKind, SessionOptions, Topo};

fn names(topo: &Topo, kind: NodeKind) -> Vec<String> {
    topo.nodes()
        .iter()
        .filter(|n| n.kind == kind)
        .map(|n| n.name.clone())
        .collect()
}

#[test]
fn declares_five_hosts_and_five_switches() {
    let topo = assignment_networks();
    assert_eq!(topo.nodes().len(), 10);
    assert_eq!(names(&topo, NodeKind::Host), ["h1", "h2", "h3", "h4", "h5"]);
    assert_eq!(names(&topo, NodeKind::Switch), ["s1", "s2", "s3", "s4", "s5"]);
}

#[test]
fn host_links_are_declared_twice() {
    let topo = assignment_networks();
    for (h, s) in [("h1", "s1"), ("h2", "s1"), ("h5", "s1"), ("h3", "s2"), ("h4", "s3")] {
        let links: Vec<_> = topo.links_between(h, s).collect();
        assert_eq!(links.len(), 2, "{h}-{s}");
        assert!(!links[0].params.is_shaped(), "{h}-{s} first declaration");
        assert_eq!(links[1].params.bw, Some(100.0));
        assert_eq!(
            links[1].params.delay.map(|d| d.as_duration()),
            Some(Duration::from_millis(1))
        );
    }
    assert_eq!(topo.duplicate_pairs().len(), 5);
}

#[test]
fn switch_links_carry_their_shaping() {
    let topo = assignment_networks();
    let expected = [
        ("s1", "s2", 20.0, 40),
        ("s2", "s3", 40.0, 10),
        ("s2", "s4", 30.0, 30),
        ("s3", "s5", 25.0, 5),
    ];
    for (a, b, bw, delay_ms) in expected {
        let links: Vec<_> = topo.links_between(a, b).collect();
        assert_eq!(links.len(), 1, "{a}-{b}");
        assert_eq!(links[0].params.bw, Some(bw));
        assert_eq!(
            links[0].params.delay.map(|d| d.as_duration()),
            Some(Duration::from_millis(delay_ms))
        );
    }
    let switch_links = topo
        .links()
        .iter()
        .filter(|l| l.a.node.starts_with('s') && l.b.node.starts_with('s'))
        .count();
    assert_eq!(switch_links, 4);
    assert_eq!(topo.links().len(), 14);
}

#[test]
fn interface_names_follow_declaration_order() {
    let topo = assignment_networks();
    let pairs: Vec<(String, String)> = topo
        .links()
        .iter()
        .map(|l| (l.a.intf_name(), l.b.intf_name()))
        .collect();
    assert_eq!(pairs[0], ("h1-eth0".into(), "s1-eth1".into()));
    assert_eq!(pairs[5], ("s1-eth4".into(), "s2-eth2".into()));
    assert_eq!(pairs[8], ("s3-eth3".into(), "s5-eth1".into()));
    assert_eq!(pairs[9], ("h1-eth1".into(), "s1-eth5".into()));
    assert_eq!(pairs[13], ("h4-eth1".into(), "s3-eth4".into()));
}

#[test]
fn collapsing_keeps_the_shaped_host_links() {
    let collapsed = assignment_networks().collapse_duplicates().unwrap();
    assert_eq!(collapsed.links().len(), 9);
    assert!(collapsed.links().iter().all(|l| l.params.is_shaped()));
}

#[test]
fn start_plan_covers_every_node_and_link() {
    let runner = RecordingRunner::new();
    let mut net = Network::new(assignment_networks(), SessionOptions::default(), &runner);
    net.start().expect("recorded start");

    assert_eq!(runner.count_matching("ip netns add"), 10);
    assert_eq!(runner.count_matching("type bridge"), 5);
    assert_eq!(runner.count_matching("type veth"), 14);
    // 10 host links with one switch port each, 4 switch links with two.
    assert_eq!(runner.count_matching("master br0"), 18);
    assert_eq!(runner.count_matching("ip addr add 10.0.0."), 5);
    // Each host learns the other four.
    assert_eq!(runner.count_matching("neigh replace"), 20);
    // 9 shaped links, both ends, htb qdisc + class + netem each.
    assert_eq!(runner.count_matching(" tc qdisc add"), 36);
    assert_eq!(runner.count_matching(" tc class add"), 18);

    net.stop();
    assert!(!net.is_running());
}

fn real_session_options() -> SessionOptions {
    SessionOptions {
        ns_prefix: unique_ns_prefix(),
        ..SessionOptions::default()
    }
}

/// Missing sch_htb/sch_netem modules are an environment gap, not a failure.
fn lacks_qdiscs(e: &EmulationError) -> bool {
    let msg = e.to_string();
    msg.contains("qdisc kind is unknown") || msg.contains("Operation not supported")
}

/// Average RTT in milliseconds from ping's `rtt min/avg/max/mdev` line.
fn ping_avg_ms(output: &str) -> Option<f64> {
    let line = output.lines().find(|l| l.contains("min/avg/max"))?;
    let values = line.split('=').nth(1)?.trim();
    values.split('/').nth(1)?.trim().parse().ok()
}

#[test]
fn start_and_stop_on_real_namespaces() {
    if !can_emulate() {
        eprintln!("Skipping start_and_stop_on_real_namespaces, insufficient privileges");
        return;
    }

    let mut net = Network::with_sudo(assignment_networks(), real_session_options());
    if let Err(e) = net.start() {
        if lacks_qdiscs(&e) {
            eprintln!("Skipping, kernel lacks required qdiscs: {e}");
            return;
        }
        panic!("start failed: {e}");
    }
    assert!(net.is_running());

    let report = net.pingall().expect("pingall");
    println!("{report}");
    assert_eq!(report.sent(), 20);
    net.stop();
    assert!(!net.is_running());
}

#[test]
fn shaped_link_delays_pings_between_hosts() {
    if !can_emulate() {
        eprintln!("Skipping shaped_link_delays_pings_between_hosts, insufficient privileges");
        return;
    }

    let mut topo = Topo::new();
    topo.add_host("h1").unwrap();
    topo.add_host("h2").unwrap();
    topo.add_switch("s1").unwrap();
    let delayed = LinkParams {
        bw: None,
        delay: Some("50ms".parse().unwrap()),
    };
    topo.add_link("h1", "s1", delayed).unwrap();
    topo.add_link("h2", "s1", LinkParams::plain()).unwrap();

    let mut net = Network::with_sudo(topo, real_session_options());
    if let Err(e) = net.start() {
        if lacks_qdiscs(&e) {
            eprintln!("Skipping, kernel lacks required qdiscs: {e}");
            return;
        }
        panic!("start failed: {e}");
    }

    let line = net.substitute_host_ips("ping -c 3 -i 0.2 h2");
    assert_eq!(line, "ping -c 3 -i 0.2 10.0.0.2");
    let out = net.exec("h1", &line).expect("ping");
    let text = String::from_utf8_lossy(&out.stdout);
    net.stop();
    assert!(out.status.success(), "ping failed:\n{text}");

    // Both ends of the h1 link are shaped: 50ms out and 50ms back.
    let avg = ping_avg_ms(&text).expect("rtt summary line");
    assert!(avg >= 95.0, "expected at least 95ms RTT, got {avg}ms");
    assert!(avg < 400.0, "RTT {avg}ms is far above the configured delay");
}

#[test]
fn ping_summary_is_parsed() {
    let text = "3 packets transmitted, 3 received, 0% packet loss, time 401ms\n\
                rtt min/avg/max/mdev = 100.211/100.402/100.713/0.210 ms\n";
    assert_eq!(ping_avg_ms(text), Some(100.402));
    assert_eq!(ping_avg_ms("no summary"), None);
}
