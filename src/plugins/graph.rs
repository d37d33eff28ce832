//! Dependency graph over registered plugins.
//!
//! Edges run from a dependency to its dependent: always for required
//! dependencies, and for optional ones only when the target is part of the
//! graph. Ordering uses Kahn's algorithm where, among plugins whose
//! dependencies are all satisfied, the greatest id goes first. The order is
//! therefore a function of the plugin set alone, not of registration order.

use std::collections::{BTreeSet, HashMap};

use super::PluginError;
use super::contracts::{OrderedMap, PluginMap};
use super::descriptor::{PluginDescriptor, PluginName};
use super::wrapper::{OpaqueId, PluginWrapper};

/// Graph input: one plugin's identity and metadata.
#[derive(Clone, Copy, Debug)]
pub struct GraphNode<'a> {
    pub opaque_id: OpaqueId,
    pub descriptor: &'a PluginDescriptor,
}

impl<'a> From<&'a PluginWrapper> for GraphNode<'a> {
    fn from(wrapper: &'a PluginWrapper) -> Self {
        Self {
            opaque_id: wrapper.opaque_id(),
            descriptor: wrapper.descriptor(),
        }
    }
}

/// Present dependencies of every plugin, keyed two ways.
#[derive(Debug, Clone, Default)]
pub struct PluginDependencies {
    pub as_names: PluginMap<Vec<PluginName>>,
    pub as_opaque_ids: OrderedMap<OpaqueId, Vec<OpaqueId>>,
}

#[derive(Debug)]
pub struct DependencyGraph<'a> {
    nodes: Vec<GraphNode<'a>>,
    /// Indices of present dependencies, required first, per node.
    edges: Vec<Vec<usize>>,
    /// Required dependencies absent from the graph, per node.
    missing: Vec<Vec<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    /// Builds the graph; node order is taken as registration order.
    pub fn new(nodes: impl IntoIterator<Item = GraphNode<'a>>) -> Self {
        let nodes: Vec<GraphNode<'a>> = nodes.into_iter().collect();
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.descriptor.id()).or_insert(i);
        }

        let mut edges = Vec::with_capacity(nodes.len());
        let mut missing = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let mut present = Vec::new();
            let mut absent = Vec::new();
            for dep in node.descriptor.all_dependencies() {
                match index.get(dep) {
                    Some(&j) => present.push(j),
                    None if node.descriptor.is_required(dep) => absent.push(dep),
                    None => {}
                }
            }
            edges.push(present);
            missing.push(absent);
        }

        Self {
            nodes,
            edges,
            missing,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, i: usize) -> GraphNode<'a> {
        self.nodes[i]
    }

    /// Present dependencies of node `i`, as node indices.
    pub fn dependencies_of(&self, i: usize) -> &[usize] {
        &self.edges[i]
    }

    /// Present dependency ids of node `i`.
    pub fn dependency_names(&self, i: usize) -> Vec<&'a str> {
        self.edges[i]
            .iter()
            .map(|&j| self.nodes[j].descriptor.id())
            .collect()
    }

    /// Node indices in dependency order.
    ///
    /// Fails with [`PluginError::UnresolvedDependencies`] naming, in sorted
    /// order, every plugin that could not be placed: plugins with a missing
    /// required dependency, plugins on a cycle, and plugins depending on either.
    pub fn topological_order(&self) -> Result<Vec<usize>, PluginError> {
        let n = self.nodes.len();
        let mut pending: Vec<usize> = self.edges.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, deps) in self.edges.iter().enumerate() {
            for &j in deps {
                dependents[j].push(i);
            }
        }

        let blocked = |i: usize| !self.missing[i].is_empty();
        let key = |i: usize| (self.nodes[i].descriptor.id(), i);
        let mut ready: BTreeSet<(&str, usize)> = (0..n)
            .filter(|&i| pending[i] == 0 && !blocked(i))
            .map(key)
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some((_, i)) = ready.pop_last() {
            order.push(i);
            for &dependent in &dependents[i] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 && !blocked(dependent) {
                    ready.insert(key(dependent));
                }
            }
        }

        if order.len() == n {
            return Ok(order);
        }

        let mut placed = vec![false; n];
        for &i in &order {
            placed[i] = true;
        }
        let mut unresolved: Vec<usize> = (0..n).filter(|&i| !placed[i]).collect();
        unresolved.sort_by(|&a, &b| self.nodes[a].descriptor.id().cmp(self.nodes[b].descriptor.id()));

        let diagnostics: Vec<String> = unresolved
            .iter()
            .map(|&i| self.diagnose(i, &placed))
            .collect();
        for line in &diagnostics {
            tracing::error!("{}", line);
        }

        Err(PluginError::UnresolvedDependencies {
            plugins: unresolved
                .iter()
                .map(|&i| self.nodes[i].descriptor.id().to_string())
                .collect(),
            diagnostics,
        })
    }

    fn diagnose(&self, i: usize, placed: &[bool]) -> String {
        let id = self.nodes[i].descriptor.id();
        if !self.missing[i].is_empty() {
            return format!(
                "Plugin \"{}\" is missing required dependencies: {:?}",
                id, self.missing[i]
            );
        }
        let stuck: Vec<&str> = self.edges[i]
            .iter()
            .filter(|&&j| !placed[j])
            .map(|&j| self.nodes[j].descriptor.id())
            .collect();
        if self.reaches(i, i) {
            format!(
                "Plugin \"{}\" is part of a dependency cycle through {:?}",
                id, stuck
            )
        } else {
            format!(
                "Plugin \"{}\" depends on unresolved plugins {:?}",
                id, stuck
            )
        }
    }

    /// True when `target` is reachable from `from` by following at least one edge.
    fn reaches(&self, from: usize, target: usize) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = self.edges[from].clone();
        while let Some(i) = stack.pop() {
            if i == target {
                return true;
            }
            if !std::mem::replace(&mut seen[i], true) {
                stack.extend(&self.edges[i]);
            }
        }
        false
    }

    /// Both keyings of the present-dependency lists, in node order.
    pub fn dependencies(&self) -> PluginDependencies {
        let mut deps = PluginDependencies::default();
        for (i, node) in self.nodes.iter().enumerate() {
            deps.as_names.insert(
                node.descriptor.id().to_string(),
                self.dependency_names(i)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            );
            deps.as_opaque_ids.insert(
                node.opaque_id,
                self.edges[i]
                    .iter()
                    .map(|&j| self.nodes[j].opaque_id)
                    .collect(),
            );
        }
        deps
    }
}
