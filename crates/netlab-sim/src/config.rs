use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::link::{Delay, LinkKind, LinkParams};
use crate::topo::Topo;

pub const DEFAULT_NS_PREFIX: &str = "nl-";

/// Knobs for how a topology is instantiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub link: LinkKind,
    /// Give each host's first interface a MAC derived from its host number.
    pub auto_set_macs: bool,
    /// Pre-populate every host's neighbour table with every other host.
    pub auto_static_arp: bool,
    /// Prepended to node names to form namespace names.
    pub ns_prefix: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            link: LinkKind::Shaped,
            auto_set_macs: true,
            auto_static_arp: true,
            ns_prefix: DEFAULT_NS_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TopologyConfigInput {
    pub hosts: Vec<String>,
    pub switches: Vec<String>,
    pub links: Vec<LinkConfigInput>,
    pub session: SessionConfigInput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfigInput {
    pub a: String,
    pub b: String,
    pub bw: Option<f64>,
    pub delay: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfigInput {
    pub link: Option<LinkKind>,
    pub auto_set_macs: Option<bool>,
    pub auto_static_arp: Option<bool>,
    pub ns_prefix: Option<String>,
}

/// A topology loaded from a file together with its session settings.
#[derive(Debug, Clone)]
pub struct TopologyFile {
    pub topo: Topo,
    pub session: SessionOptions,
}

impl TopologyConfigInput {
    pub fn resolve(self) -> Result<TopologyFile, ConfigError> {
        let mut topo = Topo::new();
        for host in &self.hosts {
            topo.add_host(host.trim())?;
        }
        for switch in &self.switches {
            topo.add_switch(switch.trim())?;
        }
        for link in &self.links {
            let delay = link
                .delay
                .as_deref()
                .map(str::parse::<Delay>)
                .transpose()?;
            let params = LinkParams { bw: link.bw, delay };
            topo.add_link(link.a.trim(), link.b.trim(), params)?;
        }

        let defaults = SessionOptions::default();
        let ns_prefix = self
            .session
            .ns_prefix
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.ns_prefix);
        let session = SessionOptions {
            link: self.session.link.unwrap_or(defaults.link),
            auto_set_macs: self.session.auto_set_macs.unwrap_or(defaults.auto_set_macs),
            auto_static_arp: self
                .session
                .auto_static_arp
                .unwrap_or(defaults.auto_static_arp),
            ns_prefix,
        };

        Ok(TopologyFile { topo, session })
    }
}

impl TopologyFile {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let parsed: TopologyConfigInput = toml::from_str(input)?;
        parsed.resolve()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopologyError;
    use std::time::Duration;

    #[test]
    fn parse_toml_topology_basic() {
        let toml = r#"
            hosts = ["h1", "h2"]
            switches = ["s1"]

            [[links]]
            a = "h1"
            b = "s1"

            [[links]]
            a = "h2"
            b = "s1"
            bw = 10.0
            delay = "2ms"

            [session]
            link = "plain"
            auto_static_arp = false
        "#;

        let file = TopologyFile::from_toml_str(toml).unwrap();
        assert_eq!(file.topo.nodes().len(), 3);
        assert_eq!(file.topo.links().len(), 2);
        assert!(!file.topo.links()[0].params.is_shaped());
        let shaped = file.topo.links()[1].params;
        assert_eq!(shaped.bw, Some(10.0));
        assert_eq!(
            shaped.delay.map(|d| d.as_duration()),
            Some(Duration::from_millis(2))
        );
        assert_eq!(file.session.link, LinkKind::Plain);
        assert!(file.session.auto_set_macs);
        assert!(!file.session.auto_static_arp);
        assert_eq!(file.session.ns_prefix, DEFAULT_NS_PREFIX);
    }

    #[test]
    fn empty_file_is_an_empty_topology() {
        let file = TopologyFile::from_toml_str("").unwrap();
        assert!(file.topo.nodes().is_empty());
        assert_eq!(file.session, SessionOptions::default());
    }

    #[test]
    fn validation_errors_surface() {
        let toml = r#"
            hosts = ["h1"]
            [[links]]
            a = "h1"
            b = "s1"
        "#;
        match TopologyFile::from_toml_str(toml) {
            Err(ConfigError::Topology(TopologyError::UnknownNode(n))) => assert_eq!(n, "s1"),
            other => panic!("unexpected {other:?}"),
        }

        let toml = r#"
            hosts = ["h1"]
            switches = ["s1"]
            [[links]]
            a = "h1"
            b = "s1"
            delay = "soon"
        "#;
        assert!(matches!(
            TopologyFile::from_toml_str(toml),
            Err(ConfigError::Topology(TopologyError::InvalidDelay(_)))
        ));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(matches!(
            TopologyFile::from_toml_str("hosts = [h1"),
            Err(ConfigError::Toml(_))
        ));
    }
}
