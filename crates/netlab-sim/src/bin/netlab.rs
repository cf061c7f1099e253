//! netlab
//!
//! Instantiates a topology (the assignment topology unless `--topo` names a
//! TOML file), starts it, and hands the terminal to the interactive shell.
//! Leaving the shell stops the network.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use netlab_sim::assignment::assignment_networks;
use netlab_sim::cli::run_shell;
use netlab_sim::config::TopologyFile;
use netlab_sim::{LinkKind, Network, SessionOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "netlab", about = "Emulate a host/switch topology and open a shell on it")]
struct Cli {
    /// Topology file (TOML). Defaults to the built-in assignment topology.
    #[arg(long)]
    topo: Option<PathBuf>,

    /// Link implementation.
    #[arg(long, value_enum)]
    link: Option<LinkKind>,

    /// Keep kernel-assigned MAC addresses.
    #[arg(long, default_value_t = false)]
    no_auto_macs: bool,

    /// Do not pre-populate host neighbour tables.
    #[arg(long, default_value_t = false)]
    no_static_arp: bool,

    /// Keep only the last declared link between any pair of nodes.
    #[arg(long, default_value_t = false)]
    collapse_duplicates: bool,

    /// Print the topology and exit without starting anything.
    #[arg(long, default_value_t = false)]
    describe: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let (mut topo, mut options) = match &cli.topo {
        Some(path) => {
            let file = TopologyFile::load(path)
                .with_context(|| format!("loading topology from {}", path.display()))?;
            (file.topo, file.session)
        }
        None => (assignment_networks(), SessionOptions::default()),
    };

    if let Some(link) = cli.link {
        options.link = link;
    }
    if cli.no_auto_macs {
        options.auto_set_macs = false;
    }
    if cli.no_static_arp {
        options.auto_static_arp = false;
    }

    let duplicates = topo.duplicate_pairs();
    if !duplicates.is_empty() {
        tracing::warn!(
            pairs = ?duplicates,
            collapse = cli.collapse_duplicates,
            "topology declares parallel links between the same nodes"
        );
    }
    if cli.collapse_duplicates {
        topo = topo.collapse_duplicates()?;
    }

    let mut net = Network::with_sudo(topo, options);

    if cli.describe {
        print!("{}", net.describe_dump());
        print!("{}", net.describe_links());
        return Ok(());
    }

    // Ctrl-C reaches the foreground node command through the terminal; the
    // handler keeps netlab itself alive so the network is always stopped.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nInterrupt");
            interrupted.store(true, Ordering::Relaxed);
        })
        .context("installing SIGINT handler")?;
    }

    net.start().context("starting emulated network")?;
    let shell = run_shell(&net, io::stdin().lock(), io::stdout().lock(), &interrupted);
    net.stop();
    shell.context("interactive shell")?;
    Ok(())
}
