//! The measurement topology used by the networking assignment.
//!
//! ```text
//!   h1 h2 h5          h3          h4
//!    \ | /            |           |
//!     s1 --20M/40ms-- s2 --40M/10ms-- s3 --25M/5ms-- s5
//!                     |
//!                  30M/30ms
//!                     |
//!                     s4
//! ```
//!
//! Every host link is declared twice: once bare and once at 100 Mbit/s with
//! 1 ms of delay.

use crate::error::TopologyError;
use crate::link::LinkParams;
use crate::topo::Topo;

pub const HOSTS: [&str; 5] = ["h1", "h2", "h3", "h4", "h5"];
pub const SWITCHES: [&str; 5] = ["s1", "s2", "s3", "s4", "s5"];

/// Host attachments, in declaration order.
pub const HOST_LINKS: [(&str, &str); 5] = [
    ("h1", "s1"),
    ("h2", "s1"),
    ("h5", "s1"),
    ("h3", "s2"),
    ("h4", "s3"),
];

/// Inter-switch links as (a, b, Mbit/s, delay).
pub const SWITCH_LINKS: [(&str, &str, f64, &str); 4] = [
    ("s1", "s2", 20.0, "40ms"),
    ("s2", "s3", 40.0, "10ms"),
    ("s2", "s4", 30.0, "30ms"),
    ("s3", "s5", 25.0, "5ms"),
];

pub const HOST_LINK_BW: f64 = 100.0;
pub const HOST_LINK_DELAY: &str = "1ms";

/// Builds the assignment topology.
pub fn assignment_networks() -> Topo {
    // The declaration is literal; a failure here is a programming error.
    build().expect("assignment topology is well-formed")
}

fn build() -> Result<Topo, TopologyError> {
    let mut topo = Topo::new();
    for h in HOSTS {
        topo.add_host(h)?;
    }
    for s in SWITCHES {
        topo.add_switch(s)?;
    }

    for (h, s) in HOST_LINKS {
        topo.add_link(h, s, LinkParams::plain())?;
    }
    for (a, b, bw, delay) in SWITCH_LINKS {
        topo.add_link(a, b, LinkParams::shaped(bw, delay)?)?;
    }
    let host_params = LinkParams::shaped(HOST_LINK_BW, HOST_LINK_DELAY)?;
    for (h, s) in HOST_LINKS {
        topo.add_link(h, s, host_params)?;
    }
    Ok(topo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_error() {
        let topo = build().unwrap();
        assert_eq!(topo.links().len(), 14);
    }
}
