//! Hook discovery, topological ordering, and wrapper materialization (spec
//! §4.9).

use std::collections::{BTreeMap, BTreeSet};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use ifstated_model::hook::{HookAction, HookModel};

pub const HOOK_DIR: &str = "/etc/ifstate/hook.d";
pub const WRAPPER_ROOT: &str = "/run/libifstate/hooks";

fn resolve_script_path(script: &str) -> PathBuf {
    if Path::new(script).is_absolute() {
        PathBuf::from(script)
    } else {
        Path::new(HOOK_DIR).join(script)
    }
}

/// Order hooks so each runs after everything named in its `after` list and
/// after whatever `provides` it implicitly depends on (spec §4.9: "performs
/// a topological ordering using those").
pub fn order_hooks(hooks: &[HookModel]) -> Vec<&HookModel> {
    let provides_index: BTreeMap<&str, usize> = hooks
        .iter()
        .enumerate()
        .flat_map(|(i, h)| h.provides.iter().map(move |p| (p.as_str(), i)))
        .collect();

    let mut visited = vec![false; hooks.len()];
    let mut visiting = vec![false; hooks.len()];
    let mut order = Vec::with_capacity(hooks.len());

    fn visit<'a>(
        i: usize,
        hooks: &'a [HookModel],
        provides_index: &BTreeMap<&str, usize>,
        visited: &mut Vec<bool>,
        visiting: &mut Vec<bool>,
        order: &mut Vec<&'a HookModel>,
    ) {
        if visited[i] {
            return;
        }
        if visiting[i] {
            // Cycle: stop unwinding here rather than looping forever;
            // order is best-effort for hook scheduling.
            return;
        }
        visiting[i] = true;
        let deps: BTreeSet<usize> = hooks[i].after.iter().filter_map(|name| provides_index.get(name.as_str()).copied()).collect();
        for dep in deps {
            if dep != i {
                visit(dep, hooks, provides_index, visited, visiting, order);
            }
        }
        visiting[i] = false;
        visited[i] = true;
        order.push(&hooks[i]);
    }

    for i in 0..hooks.len() {
        visit(i, hooks, &provides_index, &mut visited, &mut visiting, &mut order);
    }
    order
}

/// Values substituted into the wrapper template (spec §4.9).
pub struct WrapperContext {
    pub ifname: String,
    pub index: u32,
    pub netns: String,
    pub vrf: Option<String>,
    pub action: HookAction,
}

fn action_str(action: HookAction) -> &'static str {
    match action {
        HookAction::Check => "check",
        HookAction::Start => "start",
    }
}

/// Materialize `<wrapper_root>/<ifindex>/<hook>/wrapper.sh` (spec §4.9,
/// `wrapper_root` defaults to `WRAPPER_ROOT`), mode `0700`.
pub fn materialize_wrapper_at(wrapper_root: &Path, hook: &HookModel, ctx: &WrapperContext, hook_name: &str) -> std::io::Result<PathBuf> {
    let dir = wrapper_root.join(ctx.index.to_string()).join(hook_name);
    std::fs::create_dir_all(&dir)?;
    let wrapper_path = dir.join("wrapper.sh");

    let script_path = resolve_script_path(&hook.script);
    let mut body = String::new();
    body.push_str("#!/bin/sh\n");
    body.push_str(&format!("export IFS_IFNAME={}\n", shell_quote(&ctx.ifname)));
    body.push_str(&format!("export IFS_INDEX={}\n", ctx.index));
    body.push_str(&format!("export IFS_NETNS={}\n", shell_quote(&ctx.netns)));
    if let Some(vrf) = &ctx.vrf {
        body.push_str(&format!("export IFS_VRF={}\n", shell_quote(vrf)));
    }
    for (key, value) in &hook.args {
        let env_key = format!("IFS_ARGS_{}", key.to_uppercase());
        body.push_str(&format!("export {env_key}={}\n", shell_quote(value)));
    }
    body.push_str(&format!("exec {} {}\n", shell_quote(&script_path.to_string_lossy()), action_str(ctx.action)));

    std::fs::write(&wrapper_path, body)?;
    std::fs::set_permissions(&wrapper_path, std::fs::Permissions::from_mode(0o700))?;
    Ok(wrapper_path)
}

/// Materialize under the default `/run/libifstate/hooks` root.
pub fn materialize_wrapper(hook: &HookModel, ctx: &WrapperContext, hook_name: &str) -> std::io::Result<PathBuf> {
    materialize_wrapper_at(Path::new(WRAPPER_ROOT), hook, ctx, hook_name)
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook(script: &str, provides: &[&str], after: &[&str]) -> HookModel {
        HookModel {
            script: script.to_string(),
            provides: provides.iter().map(|s| s.to_string()).collect(),
            after: after.iter().map(|s| s.to_string()).collect(),
            args: BTreeMap::new(),
        }
    }

    #[test]
    fn orders_dependents_after_providers() {
        let hooks = vec![hook("second.sh", &[], &["base"]), hook("first.sh", &["base"], &[])];
        let ordered = order_hooks(&hooks);
        let names: Vec<&str> = ordered.iter().map(|h| h.script.as_str()).collect();
        assert_eq!(names, vec!["first.sh", "second.sh"]);
    }

    #[test]
    fn wrapper_is_written_with_owner_executable_bit() {
        let dir = tempfile::tempdir().unwrap();
        let hook_model = hook("dhcp.sh", &[], &[]);
        let ctx = WrapperContext { ifname: "eth0".into(), index: 5, netns: "<root>".into(), vrf: None, action: HookAction::Start };
        let path = materialize_wrapper_at(dir.path(), &hook_model, &ctx, "dhcp").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("IFS_IFNAME='eth0'"));
        assert!(body.contains("hook.d/dhcp.sh' start"));
    }
}
