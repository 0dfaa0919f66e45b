//! Cross-namespace link dependency graph and topological staging (spec
//! §4.5).

use std::collections::{BTreeMap, BTreeSet};

use ifstated_model::namespace::LinkRef;

#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    /// `link -> its dependencies`.
    edges: BTreeMap<LinkRef, BTreeSet<LinkRef>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: LinkRef) {
        self.edges.entry(node).or_default();
    }

    /// `link depends on dep` (spec §4.5): master, lower-link,
    /// tunnel-underlay, mirred target, brport backup_port.
    pub fn add_edge(&mut self, link: LinkRef, dep: LinkRef) {
        self.edges.entry(link).or_default().insert(dep);
        self.edges.entry(dep).or_default();
    }

    /// Topological layering (spec §4.5): repeatedly emit nodes whose
    /// remaining dependencies are all already emitted, removing them each
    /// pass. `strict` controls cycle handling: a fatal error in strict
    /// (apply) mode, a best-effort drop of the remainder in lenient
    /// (check) mode.
    pub fn stages(&self, strict: bool) -> Result<Vec<Vec<LinkRef>>, Vec<LinkRef>> {
        let mut remaining = self.edges.clone();
        let mut stages = Vec::new();

        while !remaining.is_empty() {
            let emitted: Vec<LinkRef> = remaining
                .iter()
                .filter(|(_, deps)| deps.iter().all(|d| !remaining.contains_key(d)))
                .map(|(node, _)| node.clone())
                .collect();

            if emitted.is_empty() {
                let leftover: Vec<LinkRef> = remaining.keys().cloned().collect();
                if strict {
                    return Err(leftover);
                } else {
                    break;
                }
            }

            let mut stage = emitted.clone();
            stage.sort();
            for node in &emitted {
                remaining.remove(node);
            }
            stages.push(stage);
        }

        Ok(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifstated_model::namespace::NamespaceName;

    fn lr(name: &str) -> LinkRef {
        LinkRef::new(name.to_string(), NamespaceName::root())
    }

    #[test]
    fn independent_nodes_form_a_single_stage() {
        let mut g = DependencyGraph::new();
        g.add_node(lr("eth0"));
        g.add_node(lr("eth1"));
        let stages = g.stages(true).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].len(), 2);
    }

    #[test]
    fn master_dependency_orders_stages() {
        let mut g = DependencyGraph::new();
        g.add_edge(lr("eth0"), lr("br0"));
        let stages = g.stages(true).unwrap();
        assert_eq!(stages, vec![vec![lr("br0")], vec![lr("eth0")]]);
    }

    #[test]
    fn cycle_is_fatal_in_strict_mode() {
        let mut g = DependencyGraph::new();
        g.add_edge(lr("a"), lr("b"));
        g.add_edge(lr("b"), lr("a"));
        assert!(g.stages(true).is_err());
    }

    #[test]
    fn cycle_drops_remainder_in_lenient_mode() {
        let mut g = DependencyGraph::new();
        g.add_edge(lr("a"), lr("b"));
        g.add_edge(lr("b"), lr("a"));
        g.add_node(lr("c"));
        let stages = g.stages(false).unwrap();
        let flat: Vec<&LinkRef> = stages.iter().flatten().collect();
        assert_eq!(flat, vec![&lr("c")]);
    }
}
