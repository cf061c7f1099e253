//! Line-oriented interactive shell over a running [`Network`].

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::net::Network;
use crate::runner::CommandRunner;
use crate::topo::Topo;

pub const PROMPT: &str = "netlab> ";

const HELP: &str = "\
Documented commands:
  help              show this message
  nodes             list nodes
  net               list each node's interfaces and their peers
  links             list links with their shaping parameters
  dump              list nodes with interfaces and addresses
  pingall           ping between every pair of hosts
  ping <a> <b>      ping once from host a to host b
  <node> <cmd...>   run a shell command inside a node; host names in
                    <cmd> become their addresses, a trailing & runs it
                    in the background
  exit | quit       leave the shell and stop the network
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    Help,
    Nodes,
    Net,
    Links,
    Dump,
    PingAll,
    Ping { src: String, dst: String },
    Node { node: String, command: String },
    Exit,
    Invalid(String),
}

impl ShellCommand {
    /// Parses one input line. A leading token naming a node of `topo` turns
    /// the rest of the line into a command for that node.
    pub fn parse(line: &str, topo: &Topo) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        if topo.node(head).is_some() {
            if rest.is_empty() {
                return Self::Invalid(format!("*** Enter a command for node: {} <cmd>", head));
            }
            return Self::Node {
                node: head.to_string(),
                command: rest.to_string(),
            };
        }

        match head {
            "" => Self::Empty,
            "help" | "?" => Self::Help,
            "nodes" => Self::Nodes,
            "net" => Self::Net,
            "links" => Self::Links,
            "dump" => Self::Dump,
            "pingall" => Self::PingAll,
            "exit" | "quit" => Self::Exit,
            "ping" => {
                let args: Vec<&str> = rest.split_whitespace().collect();
                match args.as_slice() {
                    [src, dst] => Self::Ping {
                        src: src.to_string(),
                        dst: dst.to_string(),
                    },
                    _ => Self::Invalid("usage: ping <src> <dst>".into()),
                }
            }
            other => Self::Invalid(format!("*** Unknown command: {}", other)),
        }
    }
}

/// Runs the shell until `exit`, `quit` or end of input.
///
/// Command failures are reported on `output` and never end the session;
/// only I/O errors on the shell's own streams are returned. `interrupted` is
/// raised by the process's SIGINT handler; the terminal delivers the same
/// signal to the foreground node command, which ends it and returns control
/// to the prompt.
pub fn run_shell<R, I, O>(
    net: &Network<R>,
    input: I,
    mut output: O,
    interrupted: &AtomicBool,
) -> io::Result<()>
where
    R: CommandRunner,
    I: BufRead,
    O: Write,
{
    let mut lines = input.lines();
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        let Some(line) = lines.next() else {
            writeln!(output)?;
            break;
        };
        let line = line?;

        match ShellCommand::parse(&line, net.topo()) {
            ShellCommand::Empty => {}
            ShellCommand::Exit => break,
            ShellCommand::Help => write!(output, "{}", HELP)?,
            ShellCommand::Nodes => write!(output, "{}", net.describe_nodes())?,
            ShellCommand::Net => write!(output, "{}", net.describe_net())?,
            ShellCommand::Links => write!(output, "{}", net.describe_links())?,
            ShellCommand::Dump => write!(output, "{}", net.describe_dump())?,
            ShellCommand::PingAll => match net.pingall() {
                Ok(report) => write!(output, "{}", report)?,
                Err(e) => writeln!(output, "*** Error: {}", e)?,
            },
            ShellCommand::Ping { src, dst } => match net.ping(&src, &dst) {
                Ok(true) => writeln!(output, "{} -> {}", src, dst)?,
                Ok(false) => writeln!(output, "{} -> X", src)?,
                Err(e) => writeln!(output, "*** Error: {}", e)?,
            },
            ShellCommand::Node { node, command } => {
                interrupted.store(false, Ordering::Relaxed);
                let command = net.substitute_host_ips(&command);
                match net.exec(&node, &command) {
                    Ok(out) => {
                        output.write_all(&out.stdout)?;
                        output.write_all(&out.stderr)?;
                    }
                    Err(e) => writeln!(output, "*** Error: {}", e)?,
                }
                if interrupted.swap(false, Ordering::Relaxed) {
                    writeln!(output, "*** Interrupted: {} {}", node, command)?;
                }
            }
            ShellCommand::Invalid(msg) => writeln!(output, "{}", msg)?,
        }
    }
    tracing::debug!("shell exited");
    Ok(())
}
