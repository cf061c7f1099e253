//! Topology graph: named hosts and switches joined by (possibly parallel)
//! links.
//!
//! The graph is a multigraph. Declaring the same node pair twice yields two
//! independent links, each with its own interface on both nodes.

use std::collections::HashMap;
use std::fmt;

use crate::error::TopologyError;
use crate::link::LinkParams;

/// Longest accepted node name. Interface names are checked separately as
/// ports are allocated, since `<name>-eth<port>` grows with the port number.
pub const MAX_NODE_NAME: usize = 10;

/// Linux interface name limit (`IFNAMSIZ` minus the terminating NUL).
pub const IFNAME_MAX: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Host,
    Switch,
}

impl NodeKind {
    /// First port number handed out on a node of this kind.
    fn first_port(self) -> u32 {
        match self {
            NodeKind::Host => 0,
            NodeKind::Switch => 1,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Host => f.write_str("Host"),
            NodeKind::Switch => f.write_str("Switch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
}

/// One side of a link: a node and the port number allocated on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub node: String,
    pub port: u32,
}

impl Endpoint {
    pub fn intf_name(&self) -> String {
        format!("{}-eth{}", self.node, self.port)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub a: Endpoint,
    pub b: Endpoint,
    pub params: LinkParams,
}

impl Link {
    /// Whether this link joins `x` and `y`, in either direction.
    pub fn connects(&self, x: &str, y: &str) -> bool {
        (self.a.node == x && self.b.node == y) || (self.a.node == y && self.b.node == x)
    }

    /// The endpoint on `node`, if the link touches it.
    pub fn endpoint_on(&self, node: &str) -> Option<&Endpoint> {
        if self.a.node == node {
            Some(&self.a)
        } else if self.b.node == node {
            Some(&self.b)
        } else {
            None
        }
    }

    /// The endpoint opposite `node`.
    pub fn peer_of(&self, node: &str) -> Option<&Endpoint> {
        if self.a.node == node {
            Some(&self.b)
        } else if self.b.node == node {
            Some(&self.a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Topo {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    next_port: Vec<u32>,
    links: Vec<Link>,
}

impl Topo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_host(&mut self, name: &str) -> Result<(), TopologyError> {
        self.add_node(name, NodeKind::Host)
    }

    pub fn add_switch(&mut self, name: &str) -> Result<(), TopologyError> {
        self.add_node(name, NodeKind::Switch)
    }

    fn add_node(&mut self, name: &str, kind: NodeKind) -> Result<(), TopologyError> {
        if name.is_empty()
            || name.len() > MAX_NODE_NAME
            || !name.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(TopologyError::InvalidName(name.to_string()));
        }
        if self.index.contains_key(name) {
            return Err(TopologyError::DuplicateNode(name.to_string()));
        }
        self.index.insert(name.to_string(), self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
        });
        self.next_port.push(kind.first_port());
        Ok(())
    }

    /// Declares a link and returns its index. Ports are allocated on both
    /// nodes in declaration order.
    pub fn add_link(&mut self, a: &str, b: &str, params: LinkParams) -> Result<usize, TopologyError> {
        let ia = self.lookup(a)?;
        let ib = self.lookup(b)?;
        if ia == ib {
            return Err(TopologyError::SelfLoop(a.to_string()));
        }
        params.validate()?;
        for (idx, name) in [(ia, a), (ib, b)] {
            let intf = Endpoint {
                node: name.to_string(),
                port: self.next_port[idx],
            }
            .intf_name();
            if intf.len() > IFNAME_MAX {
                return Err(TopologyError::InterfaceName(intf));
            }
        }

        let link = Link {
            a: Endpoint {
                node: a.to_string(),
                port: self.take_port(ia),
            },
            b: Endpoint {
                node: b.to_string(),
                port: self.take_port(ib),
            },
            params,
        };
        self.links.push(link);
        Ok(self.links.len() - 1)
    }

    fn lookup(&self, name: &str) -> Result<usize, TopologyError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| TopologyError::UnknownNode(name.to_string()))
    }

    fn take_port(&mut self, idx: usize) -> u32 {
        let port = self.next_port[idx];
        self.next_port[idx] += 1;
        port
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Host)
    }

    pub fn switches(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Switch)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn links_between<'a>(&'a self, x: &'a str, y: &'a str) -> impl Iterator<Item = &'a Link> {
        self.links.iter().filter(move |l| l.connects(x, y))
    }

    /// Links touching `node`, in declaration order (which is also port order).
    pub fn links_of<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Link> {
        self.links
            .iter()
            .filter(move |l| l.endpoint_on(node).is_some())
    }

    /// Node pairs declared more than once, in order of first declaration.
    pub fn duplicate_pairs(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        for (i, link) in self.links.iter().enumerate() {
            let (x, y) = (&link.a.node, &link.b.node);
            let seen_before = self.links[..i].iter().any(|l| l.connects(x, y));
            let repeated = self.links[i + 1..].iter().any(|l| l.connects(x, y));
            if !seen_before && repeated {
                out.push((x.clone(), y.clone()));
            }
        }
        out
    }

    /// Returns a copy where each node pair keeps only its last declared link.
    /// Ports are re-allocated from scratch.
    pub fn collapse_duplicates(&self) -> Result<Topo, TopologyError> {
        let mut out = Topo::new();
        for node in &self.nodes {
            out.add_node(&node.name, node.kind)?;
        }
        for (i, link) in self.links.iter().enumerate() {
            let superseded = self.links[i + 1..]
                .iter()
                .any(|l| l.connects(&link.a.node, &link.b.node));
            if !superseded {
                out.add_link(&link.a.node, &link.b.node, link.params)?;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Topo {
        let mut t = Topo::new();
        t.add_host("h1").unwrap();
        t.add_host("h2").unwrap();
        t.add_switch("s1").unwrap();
        t.add_link("h1", "s1", LinkParams::plain()).unwrap();
        t.add_link("h2", "s1", LinkParams::plain()).unwrap();
        t
    }

    #[test]
    fn ports_follow_declaration_order() {
        let t = small();
        let l = &t.links()[1];
        assert_eq!(l.a.intf_name(), "h2-eth0");
        assert_eq!(l.b.intf_name(), "s1-eth2");
        assert_eq!(t.links()[0].b.intf_name(), "s1-eth1");
    }

    #[test]
    fn rejects_bad_declarations() {
        let mut t = small();
        assert_eq!(
            t.add_host("s1"),
            Err(TopologyError::DuplicateNode("s1".into()))
        );
        assert_eq!(
            t.add_switch("sw-1"),
            Err(TopologyError::InvalidName("sw-1".into()))
        );
        assert_eq!(
            t.add_host("averyverylongname"),
            Err(TopologyError::InvalidName("averyverylongname".into()))
        );
        assert_eq!(
            t.add_link("h1", "s9", LinkParams::plain()),
            Err(TopologyError::UnknownNode("s9".into()))
        );
        assert_eq!(
            t.add_link("s1", "s1", LinkParams::plain()),
            Err(TopologyError::SelfLoop("s1".into()))
        );
        let bad = LinkParams {
            bw: Some(-1.0),
            delay: None,
        };
        assert_eq!(
            t.add_link("h1", "s1", bad),
            Err(TopologyError::InvalidBandwidth(-1.0))
        );
        // Failed declarations allocate no ports.
        let idx = t.add_link("h1", "s1", LinkParams::plain()).unwrap();
        assert_eq!(t.links()[idx].a.port, 1);
        assert_eq!(t.links()[idx].b.port, 3);
    }

    #[test]
    fn parallel_links_are_kept_and_reported() {
        let mut t = small();
        let shaped = LinkParams::shaped(100.0, "1ms").unwrap();
        t.add_link("s1", "h1", shaped).unwrap();

        assert_eq!(t.links_between("h1", "s1").count(), 2);
        assert_eq!(t.duplicate_pairs(), vec![("h1".into(), "s1".into())]);
        assert_eq!(t.links_of("h1").count(), 2);

        let collapsed = t.collapse_duplicates().unwrap();
        assert_eq!(collapsed.links().len(), 2);
        assert!(collapsed.duplicate_pairs().is_empty());
        let kept = collapsed.links_between("h1", "s1").next().unwrap();
        assert_eq!(kept.params, shaped);
        assert_eq!(kept.a.intf_name(), "s1-eth2");
        assert_eq!(kept.b.intf_name(), "h1-eth0");
    }

    #[test]
    fn interface_names_stay_within_kernel_limit() {
        let mut t = Topo::new();
        t.add_host("abcdefghij").unwrap();
        for i in 0..10 {
            let s = format!("s{}", i);
            t.add_switch(&s).unwrap();
            t.add_link("abcdefghij", &s, LinkParams::plain()).unwrap();
        }
        assert_eq!(t.links()[9].a.intf_name(), "abcdefghij-eth9");

        t.add_switch("s10").unwrap();
        assert_eq!(
            t.add_link("s10", "abcdefghij", LinkParams::plain()),
            Err(TopologyError::InterfaceName("abcdefghij-eth10".into()))
        );
        // The rejected link took no port on either side.
        t.add_host("h2").unwrap();
        let idx = t.add_link("s10", "h2", LinkParams::plain()).unwrap();
        assert_eq!(t.links()[idx].a.port, 1);
    }

    #[test]
    fn collapse_keeps_every_node() {
        let t = small();
        let collapsed = t.collapse_duplicates().unwrap();
        assert_eq!(collapsed.nodes(), t.nodes());
        assert_eq!(collapsed.links(), t.links());
    }

    #[test]
    fn peer_lookup() {
        let t = small();
        let l = &t.links()[0];
        assert_eq!(l.peer_of("h1").unwrap().node, "s1");
        assert_eq!(l.peer_of("s1").unwrap().node, "h1");
        assert!(l.peer_of("h2").is_none());
    }
}
