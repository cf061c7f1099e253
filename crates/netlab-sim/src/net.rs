//! A running emulation of a [`Topo`].
//!
//! Every node gets its own network namespace. Switches run a Linux bridge
//! that enslaves all of their ports, hosts get a single address on their
//! first interface, and each link is a veth pair created directly inside the
//! two namespaces it joins.

use std::fmt;
use std::net::Ipv4Addr;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};

use crate::config::SessionOptions;
use crate::error::EmulationError;
use crate::link::LinkKind;
use crate::netns::{add_veth_link, Namespace};
use crate::runner::{CommandRunner, SudoRunner};
use crate::shaping::apply_shaping;
use crate::topo::{NodeKind, Topo};

/// Base of the host address range (10.0.0.0/8).
const IP_BASE: u32 = 0x0a00_0000;
const IP_PREFIX_LEN: u8 = 8;

pub struct Network<R: CommandRunner = SudoRunner> {
    topo: Topo,
    options: SessionOptions,
    runner: R,
    namespaces: Vec<Namespace>,
    running: bool,
}

impl Network<SudoRunner> {
    pub fn with_sudo(topo: Topo, options: SessionOptions) -> Self {
        Self::new(topo, options, SudoRunner)
    }
}

impl<R: CommandRunner> Network<R> {
    pub fn new(topo: Topo, options: SessionOptions, runner: R) -> Self {
        Self {
            topo,
            options,
            runner,
            namespaces: Vec::new(),
            running: false,
        }
    }

    pub fn topo(&self) -> &Topo {
        &self.topo
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn ns_name(&self, node: &str) -> String {
        format!("{}{}", self.options.ns_prefix, node)
    }

    fn host_number(&self, host: &str) -> Option<u32> {
        self.topo
            .hosts()
            .position(|h| h.name == host)
            .map(|i| i as u32 + 1)
    }

    /// Address of a host: `10.0.0.N` for the N-th declared host.
    pub fn host_ip(&self, host: &str) -> Option<Ipv4Addr> {
        self.host_number(host).map(|n| Ipv4Addr::from(IP_BASE + n))
    }

    /// MAC assigned to a host's first interface when `auto_set_macs` is on.
    pub fn host_mac(&self, host: &str) -> Option<String> {
        if !self.options.auto_set_macs {
            return None;
        }
        self.host_number(host).map(|n| format_mac(n as u64))
    }

    /// The interface that carries a host's address: its lowest port.
    pub fn default_intf(&self, host: &str) -> Option<String> {
        self.topo
            .links_of(host)
            .next()
            .and_then(|l| l.endpoint_on(host))
            .map(|e| e.intf_name())
    }

    fn namespace(&self, node: &str) -> Result<&Namespace, EmulationError> {
        let name = self.ns_name(node);
        self.namespaces
            .iter()
            .find(|ns| ns.name == name)
            .ok_or_else(|| EmulationError::UnknownNode(node.to_string()))
    }

    /// Brings the emulated network up. On failure everything created so far
    /// is torn down before the error is returned.
    pub fn start(&mut self) -> Result<(), EmulationError> {
        if self.running {
            return Ok(());
        }
        tracing::info!(
            hosts = self.topo.hosts().count(),
            switches = self.topo.switches().count(),
            links = self.topo.links().len(),
            link = ?self.options.link,
            "starting network"
        );

        if let Err(e) = self.build() {
            tracing::error!(error = %e, "network start failed, cleaning up");
            self.teardown();
            return Err(e);
        }
        self.running = true;
        tracing::info!("network started");
        Ok(())
    }

    fn build(&mut self) -> Result<(), EmulationError> {
        // ── Nodes ───────────────────────────────────────────────────
        for node in self.topo.nodes() {
            let ns = Namespace::create(&self.runner, &self.ns_name(&node.name))?;
            // Track before configuring so a failed bridge is still cleaned up.
            self.namespaces.push(ns.clone());
            if node.kind == NodeKind::Switch {
                ns.add_bridge(&self.runner)?;
            }
        }

        // ── Links ───────────────────────────────────────────────────
        for link in self.topo.links() {
            let ns_a = self.namespace(&link.a.node)?;
            let ns_b = self.namespace(&link.b.node)?;
            let (if_a, if_b) = (link.a.intf_name(), link.b.intf_name());
            add_veth_link(&self.runner, (ns_a, &if_a), (ns_b, &if_b))?;

            for (end, ns, intf) in [(&link.a, ns_a, &if_a), (&link.b, ns_b, &if_b)] {
                if self.topo.node(&end.node).map(|n| n.kind) == Some(NodeKind::Switch) {
                    ns.attach_to_bridge(&self.runner, intf)?;
                }
            }
        }

        // ── Addressing ──────────────────────────────────────────────
        for host in self.topo.hosts() {
            let Some(intf) = self.default_intf(&host.name) else {
                tracing::warn!(host = %host.name, "host has no links, leaving unaddressed");
                continue;
            };
            let ns = self.namespace(&host.name)?;
            if let Some(mac) = self.host_mac(&host.name) {
                ns.set_mac(&self.runner, &intf, &mac)?;
            }
            if let Some(ip) = self.host_ip(&host.name) {
                ns.add_addr(&self.runner, &intf, &format!("{}/{}", ip, IP_PREFIX_LEN))?;
            }
        }

        // ── Shaping ─────────────────────────────────────────────────
        if self.options.link == LinkKind::Shaped {
            for link in self.topo.links().iter().filter(|l| l.params.is_shaped()) {
                for end in [&link.a, &link.b] {
                    let ns = self.namespace(&end.node)?;
                    apply_shaping(&self.runner, ns, &end.intf_name(), &link.params)?;
                }
            }
        }

        if self.options.auto_static_arp {
            self.install_static_arp()?;
        }
        Ok(())
    }

    fn install_static_arp(&self) -> Result<(), EmulationError> {
        let mut entries = Vec::new();
        for host in self.topo.hosts() {
            let (Some(intf), Some(ip)) = (self.default_intf(&host.name), self.host_ip(&host.name))
            else {
                continue;
            };
            let mac = match self.host_mac(&host.name) {
                Some(mac) => mac,
                None => self.read_mac(&host.name, &intf)?,
            };
            entries.push((host.name.clone(), intf, ip, mac));
        }

        for (host, intf, _, _) in &entries {
            let ns = self.namespace(host)?;
            for (other, _, ip, mac) in &entries {
                if other != host {
                    ns.add_static_arp(&self.runner, intf, &ip.to_string(), mac)?;
                }
            }
        }
        Ok(())
    }

    fn read_mac(&self, node: &str, intf: &str) -> Result<String, EmulationError> {
        let path = format!("/sys/class/net/{}/address", intf);
        let output = self.namespace(node)?.exec(&self.runner, "cat", &[path.as_str()])?;
        let mac = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if mac.is_empty() {
            return Err(EmulationError::CommandFailed {
                command: format!("cat {}", path),
                stderr: "empty MAC address".into(),
            });
        }
        Ok(mac)
    }

    /// Tears the network down. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.namespaces.is_empty() && !self.running {
            return;
        }
        tracing::info!("stopping network");
        self.teardown();
        self.running = false;
    }

    fn teardown(&mut self) {
        for ns in self.namespaces.drain(..).rev() {
            if let Err(e) = ns.delete(&self.runner) {
                tracing::warn!(ns = %ns.name, error = %e, "failed to delete namespace");
            }
        }
    }

    /// Runs a shell command line inside a node.
    ///
    /// A line ending in a single `&` is started in the background and the
    /// call returns at once with an empty, successful output.
    pub fn exec(&self, node: &str, command_line: &str) -> Result<Output, EmulationError> {
        if !self.running {
            return Err(EmulationError::NotRunning);
        }
        let ns = self.namespace(node)?;
        match background_job(command_line) {
            Some(job) => {
                ns.spawn_shell(&self.runner, job)?;
                tracing::debug!(node, job, "started in background");
                Ok(Output {
                    status: ExitStatus::from_raw(0),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                })
            }
            None => ns.shell(&self.runner, command_line),
        }
    }

    /// Replaces every word that names a host with that host's address, so
    /// `ping h2` or `iperfer -c -h h1 ...` work inside the emulated hosts.
    pub fn substitute_host_ips(&self, command_line: &str) -> String {
        command_line
            .split(' ')
            .map(|word| match self.topo.node(word) {
                Some(n) if n.kind == NodeKind::Host => self
                    .host_ip(word)
                    .map(|ip| ip.to_string())
                    .unwrap_or_else(|| word.to_string()),
                _ => word.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Sends a single ping from `src` to `dst`; returns whether it was answered.
    pub fn ping(&self, src: &str, dst: &str) -> Result<bool, EmulationError> {
        for host in [src, dst] {
            match self.topo.node(host) {
                None => return Err(EmulationError::UnknownNode(host.to_string())),
                Some(n) if n.kind != NodeKind::Host => {
                    return Err(EmulationError::NotAHost(host.to_string()))
                }
                Some(_) => {}
            }
        }
        let ip = self
            .host_ip(dst)
            .ok_or_else(|| EmulationError::NotAHost(dst.to_string()))?;
        let out = self.exec(src, &format!("ping -c1 -W1 {}", ip))?;
        Ok(out.status.success())
    }

    /// Pings between every ordered pair of hosts.
    pub fn pingall(&self) -> Result<PingReport, EmulationError> {
        let hosts: Vec<String> = self.topo.hosts().map(|h| h.name.clone()).collect();
        let mut rows = Vec::with_capacity(hosts.len());
        for src in &hosts {
            let mut row = Vec::with_capacity(hosts.len().saturating_sub(1));
            for dst in hosts.iter().filter(|d| *d != src) {
                row.push((dst.clone(), self.ping(src, dst)?));
            }
            rows.push((src.clone(), row));
        }
        let report = PingReport { rows };
        tracing::info!(dropped = report.dropped_percent(), "pingall finished");
        Ok(report)
    }

    pub fn describe_nodes(&self) -> String {
        let names: Vec<&str> = self.topo.nodes().iter().map(|n| n.name.as_str()).collect();
        format!("available nodes are: \n{}\n", names.join(" "))
    }

    /// One line per node listing `intf:peer-intf` for every port.
    pub fn describe_net(&self) -> String {
        let mut out = String::new();
        for node in self.topo.nodes() {
            out.push_str(&node.name);
            for link in self.topo.links_of(&node.name) {
                if let (Some(own), Some(peer)) = (link.endpoint_on(&node.name), link.peer_of(&node.name)) {
                    out.push_str(&format!(" {}:{}", own.intf_name(), peer.intf_name()));
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn describe_links(&self) -> String {
        let mut out = String::new();
        for link in self.topo.links() {
            out.push_str(&format!("{}<->{}", link.a.intf_name(), link.b.intf_name()));
            if link.params.is_shaped() {
                let applied = if self.options.link == LinkKind::Shaped {
                    ""
                } else {
                    ", not applied"
                };
                out.push_str(&format!(" ({}{})", link.params, applied));
            }
            out.push('\n');
        }
        out
    }

    pub fn describe_dump(&self) -> String {
        let mut out = String::new();
        for node in self.topo.nodes() {
            let default = self.default_intf(&node.name);
            let ip = self.host_ip(&node.name);
            let intfs: Vec<String> = self
                .topo
                .links_of(&node.name)
                .filter_map(|l| l.endpoint_on(&node.name))
                .map(|e| {
                    let name = e.intf_name();
                    match ip {
                        Some(ip) if default.as_deref() == Some(name.as_str()) => {
                            format!("{}:{}", name, ip)
                        }
                        _ => format!("{}:None", name),
                    }
                })
                .collect();
            out.push_str(&format!(
                "<{} {}: {} ns={}>\n",
                node.kind,
                node.name,
                intfs.join(","),
                self.ns_name(&node.name)
            ));
        }
        out
    }
}

impl<R: CommandRunner> Drop for Network<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Outcome of [`Network::pingall`]: per source host, each destination and
/// whether it answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingReport {
    pub rows: Vec<(String, Vec<(String, bool)>)>,
}

impl PingReport {
    pub fn sent(&self) -> usize {
        self.rows.iter().map(|(_, r)| r.len()).sum()
    }

    pub fn received(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|(_, r)| r.iter())
            .filter(|(_, ok)| *ok)
            .count()
    }

    pub fn dropped_percent(&self) -> u32 {
        let sent = self.sent();
        if sent == 0 {
            return 0;
        }
        (100 * (sent - self.received()) / sent) as u32
    }
}

impl fmt::Display for PingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*** Ping: testing ping reachability")?;
        for (src, row) in &self.rows {
            write!(f, "{} ->", src)?;
            for (dst, ok) in row {
                write!(f, " {}", if *ok { dst.as_str() } else { "X" })?;
            }
            writeln!(f)?;
        }
        writeln!(
            f,
            "*** Results: {}% dropped ({}/{} received)",
            self.dropped_percent(),
            self.received(),
            self.sent()
        )
    }
}

/// The command to detach if `line` ends in a lone `&` (not `&&`).
fn background_job(line: &str) -> Option<&str> {
    let line = line.trim_end();
    let job = line.strip_suffix('&')?;
    if job.ends_with('&') {
        return None;
    }
    let job = job.trim_end();
    (!job.is_empty()).then_some(job)
}

fn format_mac(n: u64) -> String {
    (0..6)
        .rev()
        .map(|i| format!("{:02x}", (n >> (i * 8)) & 0xff))
        .collect::<Vec<_>>()
        .join(":")
}
