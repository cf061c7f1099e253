use std::process::Output;

use crate::error::EmulationError;
use crate::runner::{run_best_effort, run_checked, CommandRunner};

/// Name of the bridge that forwards between a switch's ports.
pub const BRIDGE: &str = "br0";

/// A Linux network namespace managed via `ip netns`.
///
/// The handle is plain data; the owning network decides when the namespace
/// is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
}

impl Namespace {
    /// Creates the namespace and brings up loopback. A stale namespace with
    /// the same name is removed first.
    pub fn create<R: CommandRunner + ?Sized>(runner: &R, name: &str) -> Result<Self, EmulationError> {
        run_best_effort(runner, "ip", &["netns", "del", name]);
        run_checked(runner, "ip", &["netns", "add", name])?;
        let ns = Self {
            name: name.to_string(),
        };
        ns.exec(runner, "ip", &["link", "set", "lo", "up"])?;
        Ok(ns)
    }

    pub fn exec<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        cmd: &str,
        args: &[&str],
    ) -> Result<Output, EmulationError> {
        let mut full = vec!["netns", "exec", self.name.as_str(), cmd];
        full.extend_from_slice(args);
        run_checked(runner, "ip", &full)
    }

    /// Runs a shell command line inside the namespace. Unlike [`exec`], a
    /// non-zero exit is returned to the caller rather than turned into an
    /// error.
    ///
    /// [`exec`]: Namespace::exec
    pub fn shell<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        command_line: &str,
    ) -> Result<Output, EmulationError> {
        let args = ["netns", "exec", self.name.as_str(), "sh", "-c", command_line];
        runner
            .run("ip", &args)
            .map_err(|source| EmulationError::Spawn {
                command: command_line.to_string(),
                source,
            })
    }

    /// Starts a shell command line inside the namespace and returns without
    /// waiting for it. Its output is discarded.
    pub fn spawn_shell<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        command_line: &str,
    ) -> Result<(), EmulationError> {
        let args = ["netns", "exec", self.name.as_str(), "sh", "-c", command_line];
        runner
            .spawn_detached("ip", &args)
            .map_err(|source| EmulationError::Spawn {
                command: command_line.to_string(),
                source,
            })
    }

    /// Creates a Linux bridge and brings it up, turning the namespace into a
    /// learning switch.
    pub fn add_bridge<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<(), EmulationError> {
        self.exec(runner, "ip", &["link", "add", BRIDGE, "type", "bridge"])?;
        self.exec(runner, "ip", &["link", "set", BRIDGE, "up"])?;
        Ok(())
    }

    pub fn attach_to_bridge<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        interface: &str,
    ) -> Result<(), EmulationError> {
        self.exec(runner, "ip", &["link", "set", interface, "master", BRIDGE])?;
        Ok(())
    }

    pub fn set_up<R: CommandRunner + ?Sized>(&self, runner: &R, interface: &str) -> Result<(), EmulationError> {
        self.exec(runner, "ip", &["link", "set", interface, "up"])?;
        Ok(())
    }

    pub fn set_mac<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        interface: &str,
        mac: &str,
    ) -> Result<(), EmulationError> {
        self.exec(runner, "ip", &["link", "set", "dev", interface, "address", mac])?;
        Ok(())
    }

    pub fn add_addr<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        interface: &str,
        cidr: &str,
    ) -> Result<(), EmulationError> {
        self.exec(runner, "ip", &["addr", "add", cidr, "dev", interface])?;
        Ok(())
    }

    /// Installs a permanent neighbour entry.
    pub fn add_static_arp<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        interface: &str,
        ip: &str,
        mac: &str,
    ) -> Result<(), EmulationError> {
        self.exec(
            runner,
            "ip",
            &["neigh", "replace", ip, "lladdr", mac, "dev", interface, "nud", "permanent"],
        )?;
        Ok(())
    }

    /// Deletes the namespace along with every interface inside it.
    pub fn delete<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<(), EmulationError> {
        run_checked(runner, "ip", &["netns", "del", &self.name])?;
        Ok(())
    }
}

/// Creates a veth pair with each end placed directly in its namespace, so
/// the interface names never exist in the root namespace.
pub fn add_veth_link<R: CommandRunner + ?Sized>(
    runner: &R,
    local: (&Namespace, &str),
    peer: (&Namespace, &str),
) -> Result<(), EmulationError> {
    let (local_ns, local_if) = local;
    let (peer_ns, peer_if) = peer;
    run_checked(
        runner,
        "ip",
        &[
            "link",
            "add",
            local_if,
            "netns",
            &local_ns.name,
            "type",
            "veth",
            "peer",
            "name",
            peer_if,
            "netns",
            &peer_ns.name,
        ],
    )?;
    local_ns.set_up(runner, local_if)?;
    peer_ns.set_up(runner, peer_if)?;
    Ok(())
}
