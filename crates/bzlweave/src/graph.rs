//! The transitive closure of a set of targets, as handed to project generators.

use std::collections::VecDeque;

use fxhash::FxHashMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use crate::error::{BzlResult, Error};
use crate::label::CanonicalLabel;
use crate::target::Target;
use crate::workspace::Workspace;

/// Targets and the label-valued attributes between them. An edge goes from a rule to
/// each target it references.
#[derive(Debug, Default)]
pub struct TargetGraph {
    graph: DiGraph<Target, ()>,
    nodes: FxHashMap<CanonicalLabel, NodeIndex>,
}

impl TargetGraph {
    /// Follows every label-valued attribute from `roots`, resolving rules as they are
    /// reached.
    pub fn build(workspace: &Workspace, roots: &[Target]) -> BzlResult<TargetGraph> {
        let mut ret = TargetGraph::default();
        let mut queue: VecDeque<NodeIndex> = roots.iter().map(|t| ret.add(t.clone())).collect();

        while let Some(idx) = queue.pop_front() {
            let Target::Rule(rule) = ret.graph[idx].clone() else {
                continue;
            };

            let attrs = match rule.attrs() {
                Some(attrs) => attrs,
                None => {
                    let label = rule.label();
                    let package = workspace.load_pkg(&label.repository, &label.package)?;
                    rule.resolve_attrs(workspace, &package)?
                }
            };

            for dep in attrs.values().flat_map(|value| value.targets()) {
                let is_new = !ret.nodes.contains_key(dep.label());
                let dep_idx = ret.add(dep);
                if is_new {
                    queue.push_back(dep_idx);
                }
                ret.graph.update_edge(idx, dep_idx, ());
            }
        }

        debug!(
            targets = ret.graph.node_count(),
            edges = ret.graph.edge_count(),
            "built target graph"
        );
        Ok(ret)
    }

    fn add(&mut self, target: Target) -> NodeIndex {
        if let Some(idx) = self.nodes.get(target.label()) {
            return *idx;
        }
        let label = target.label().clone();
        let idx = self.graph.add_node(target);
        self.nodes.insert(label, idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn get(&self, label: &CanonicalLabel) -> Option<&Target> {
        self.nodes.get(label).map(|idx| &self.graph[*idx])
    }

    /// Direct dependencies of `label`.
    pub fn dependencies(&self, label: &CanonicalLabel) -> Vec<&Target> {
        let Some(idx) = self.nodes.get(label) else {
            return Vec::new();
        };
        let mut ret: Vec<&Target> = self
            .graph
            .neighbors_directed(*idx, Direction::Outgoing)
            .map(|dep| &self.graph[dep])
            .collect();
        ret.sort_by(|a, b| a.label().cmp(b.label()));
        ret
    }

    /// Every target, each one after all of its dependencies.
    pub fn dependency_order(&self) -> BzlResult<Vec<&Target>> {
        let mut order = toposort(&self.graph, None).map_err(|cycle| {
            Error::CyclicDependency(vec![self.graph[cycle.node_id()].label().to_string()])
        })?;
        order.reverse();
        Ok(order.into_iter().map(|idx| &self.graph[idx]).collect())
    }
}
