use crate::error::EmulationError;
use crate::link::LinkParams;
use crate::netns::Namespace;
use crate::runner::CommandRunner;

/// htb burst size; large enough for line-rate bursts at 1 Gbit/s.
pub const HTB_BURST: &str = "15k";

/// Builds the `tc` argument lists that realize `params` on `interface`.
///
/// Bandwidth becomes an htb class under the root qdisc; delay becomes a
/// netem qdisc, chained under the htb class when both are present. Returns
/// an empty plan for unshaped links.
pub fn tc_plan(interface: &str, params: &LinkParams) -> Vec<Vec<String>> {
    let add = |object: &str, rest: &[&str]| -> Vec<String> {
        let mut args = vec![object.to_string(), "add".into(), "dev".into(), interface.to_string()];
        args.extend(rest.iter().map(|s| s.to_string()));
        args
    };

    let mut plan = Vec::new();
    if let Some(bw) = params.bw {
        let rate = format!("{}Mbit", bw);
        plan.push(add("qdisc", &["root", "handle", "5:0", "htb", "default", "1"]));
        plan.push(add(
            "class",
            &["parent", "5:0", "classid", "5:1", "htb", "rate", rate.as_str(), "burst", HTB_BURST],
        ));
    }
    if let Some(delay) = params.delay {
        let delay = delay.to_string();
        let mut rest: Vec<&str> = if params.bw.is_some() {
            vec!["parent", "5:1"]
        } else {
            vec!["root"]
        };
        rest.extend(["handle", "10:", "netem", "delay", delay.as_str()]);
        plan.push(add("qdisc", &rest));
    }
    plan
}

/// Applies shaping to an interface inside a namespace.
///
/// Removes any existing root qdisc first (best effort), then installs the
/// plan from [`tc_plan`].
pub fn apply_shaping<R: CommandRunner + ?Sized>(
    runner: &R,
    ns: &Namespace,
    interface: &str,
    params: &LinkParams,
) -> Result<(), EmulationError> {
    let plan = tc_plan(interface, params);
    if plan.is_empty() {
        return Ok(());
    }

    let _ = ns.exec(runner, "tc", &["qdisc", "del", "dev", interface, "root"]);

    for args in &plan {
        let args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        ns.exec(runner, "tc", &args)?;
    }
    tracing::debug!(ns = %ns.name, interface, %params, "shaping applied");
    Ok(())
}
