// src/dag/graph.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::NetFile;
use crate::errors::{Result, SchedulerError};

/// Parent and child chains of one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainGraphNode {
    /// Chains that must finish before this one may start.
    pub parents: Vec<usize>,
    /// Chains that list this one as a parent.
    pub children: Vec<usize>,
}

/// Immutable graph of operator chains.
///
/// Each chain is an ordered, non-empty list of operator indices that runs on
/// a single worker thread. Edges between chains are producer/consumer
/// dependencies. The graph is validated once on construction:
///
/// - every chain is non-empty and every operator belongs to exactly one chain
/// - parent and child lists are transposes of each other
/// - there are no cycles
#[derive(Debug, Clone)]
pub struct ChainGraph {
    chains: Vec<Vec<usize>>,
    nodes: Vec<ChainGraphNode>,
}

impl ChainGraph {
    /// Build a graph from chains and each chain's parent list.
    pub fn new(chains: Vec<Vec<usize>>, parents: Vec<Vec<usize>>) -> Result<Self> {
        if parents.len() != chains.len() {
            return Err(SchedulerError::InvalidGraph(format!(
                "{} chains but {} parent lists",
                chains.len(),
                parents.len()
            )));
        }

        let mut nodes: Vec<ChainGraphNode> = parents
            .into_iter()
            .map(|parents| ChainGraphNode {
                parents,
                children: Vec::new(),
            })
            .collect();

        let edges: Vec<(usize, usize)> = nodes
            .iter()
            .enumerate()
            .flat_map(|(child, node)| node.parents.iter().map(move |&p| (p, child)))
            .collect();

        for (parent, child) in edges {
            if parent >= nodes.len() {
                return Err(SchedulerError::InvalidGraph(format!(
                    "chain {child} has unknown parent {parent}"
                )));
            }
            nodes[parent].children.push(child);
        }

        Self::from_parts(chains, nodes)
    }

    /// Build a graph from chains and explicit `(parent, child)` edges.
    pub fn from_edges(chains: Vec<Vec<usize>>, edges: &[(usize, usize)]) -> Result<Self> {
        let mut parents = vec![Vec::new(); chains.len()];
        for &(parent, child) in edges {
            match parents.get_mut(child) {
                Some(list) => list.push(parent),
                None => {
                    return Err(SchedulerError::InvalidGraph(format!(
                        "edge {parent} -> {child} points at an unknown chain"
                    )));
                }
            }
        }
        Self::new(chains, parents)
    }

    /// Build a graph from a validated chain file.
    ///
    /// Chains are numbered in name order and operators are numbered
    /// consecutively chain by chain.
    pub fn from_config(cfg: &NetFile) -> Result<Self> {
        let names: Vec<&str> = cfg.chain.keys().map(String::as_str).collect();
        let index_of = |name: &str| names.iter().position(|n| *n == name);

        let mut chains = Vec::with_capacity(names.len());
        let mut parents = Vec::with_capacity(names.len());
        let mut next_op = 0;

        for (name, chain) in cfg.chain.iter() {
            let ops: Vec<usize> = (next_op..next_op + chain.ops.len()).collect();
            next_op += chain.ops.len();
            chains.push(ops);

            let mut deps = Vec::with_capacity(chain.after.len());
            for dep in chain.after.iter() {
                let id = index_of(dep).ok_or_else(|| {
                    SchedulerError::ConfigError(format!(
                        "chain '{}' has unknown dependency '{}' in `after`",
                        name, dep
                    ))
                })?;
                if !deps.contains(&id) {
                    deps.push(id);
                }
            }
            parents.push(deps);
        }

        Self::new(chains, parents)
    }

    /// One operator per chain, no edges.
    pub fn independent(num_ops: usize) -> Self {
        Self {
            chains: (0..num_ops).map(|op| vec![op]).collect(),
            nodes: vec![ChainGraphNode::default(); num_ops],
        }
    }

    /// Build a graph from fully specified nodes, checking every invariant.
    pub fn from_parts(chains: Vec<Vec<usize>>, nodes: Vec<ChainGraphNode>) -> Result<Self> {
        let graph = Self { chains, nodes };
        graph.validate()?;
        Ok(graph)
    }

    /// All chains concatenated into one, in dependency order.
    pub fn into_single_chain(self) -> Result<Self> {
        let order = self.topological_order()?;
        let ops: Vec<usize> = order
            .into_iter()
            .flat_map(|chain| self.chains[chain].iter().copied())
            .collect();
        if ops.is_empty() {
            return Ok(Self {
                chains: Vec::new(),
                nodes: Vec::new(),
            });
        }
        Ok(Self {
            chains: vec![ops],
            nodes: vec![ChainGraphNode::default()],
        })
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn num_ops(&self) -> usize {
        self.chains.iter().map(Vec::len).sum()
    }

    pub fn chain(&self, id: usize) -> &[usize] {
        &self.chains[id]
    }

    pub fn chains(&self) -> &[Vec<usize>] {
        &self.chains
    }

    pub fn parents(&self, id: usize) -> &[usize] {
        &self.nodes[id].parents
    }

    pub fn children(&self, id: usize) -> &[usize] {
        &self.nodes[id].children
    }

    pub fn first_op(&self, id: usize) -> usize {
        self.chains[id][0]
    }

    pub fn last_op(&self, id: usize) -> usize {
        self.chains[id][self.chains[id].len() - 1]
    }

    /// Chains without parents.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&id| self.nodes[id].parents.is_empty())
    }

    /// Chain ids ordered so that parents come before children.
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for id in 0..self.len() {
            graph.add_node(id);
        }
        for (child, node) in self.nodes.iter().enumerate() {
            for &parent in &node.parents {
                graph.add_edge(parent, child, ());
            }
        }

        toposort(&graph, None).map_err(|cycle| {
            SchedulerError::DagCycle(format!(
                "cycle detected in chain graph involving chain {}",
                cycle.node_id()
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        if self.nodes.len() != self.chains.len() {
            return Err(SchedulerError::InvalidGraph(format!(
                "{} chains but {} graph nodes",
                self.chains.len(),
                self.nodes.len()
            )));
        }

        let num_ops = self.num_ops();
        let mut seen = vec![false; num_ops];
        for (id, chain) in self.chains.iter().enumerate() {
            if chain.is_empty() {
                return Err(SchedulerError::InvalidGraph(format!("chain {id} is empty")));
            }
            for &op in chain {
                match seen.get_mut(op) {
                    Some(slot) if !*slot => *slot = true,
                    Some(_) => {
                        return Err(SchedulerError::InvalidGraph(format!(
                            "operator {op} appears in more than one chain"
                        )));
                    }
                    None => {
                        return Err(SchedulerError::InvalidGraph(format!(
                            "operator index {op} out of range (graph has {num_ops} operators)"
                        )));
                    }
                }
            }
        }

        let len = self.len();
        for (id, node) in self.nodes.iter().enumerate() {
            for &parent in &node.parents {
                if parent >= len {
                    return Err(SchedulerError::InvalidGraph(format!(
                        "chain {id} has unknown parent {parent}"
                    )));
                }
                if parent == id {
                    return Err(SchedulerError::InvalidGraph(format!(
                        "chain {id} cannot depend on itself"
                    )));
                }
                if !self.nodes[parent].children.contains(&id) {
                    return Err(SchedulerError::InvalidGraph(format!(
                        "chain {parent} is a parent of {id} but does not list it as a child"
                    )));
                }
            }
            for &child in &node.children {
                if child >= len || !self.nodes[child].parents.contains(&id) {
                    return Err(SchedulerError::InvalidGraph(format!(
                        "chain {child} is a child of {id} but does not list it as a parent"
                    )));
                }
            }
            if has_duplicates(&node.parents) || has_duplicates(&node.children) {
                return Err(SchedulerError::InvalidGraph(format!(
                    "chain {id} lists the same edge twice"
                )));
            }
        }

        self.topological_order()?;
        Ok(())
    }
}

fn has_duplicates(ids: &[usize]) -> bool {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).any(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_are_the_transpose_of_parents() {
        // 0 -> 1, 0 -> 2, {1, 2} -> 3
        let graph = ChainGraph::from_edges(
            vec![vec![0], vec![1, 2], vec![3], vec![4]],
            &[(0, 1), (0, 2), (1, 3), (2, 3)],
        )
        .unwrap();

        assert_eq!(graph.children(0), &[1, 2]);
        assert_eq!(graph.parents(3), &[1, 2]);
        assert_eq!(graph.roots().collect::<Vec<_>>(), vec![0]);
        assert_eq!(graph.first_op(1), 1);
        assert_eq!(graph.last_op(1), 2);
        assert_eq!(graph.num_ops(), 5);
    }

    #[test]
    fn rejects_cycles() {
        let err = ChainGraph::from_edges(vec![vec![0], vec![1]], &[(0, 1), (1, 0)]).unwrap_err();
        assert!(matches!(err, SchedulerError::DagCycle(msg) if msg.contains("cycle detected")));
    }

    #[test]
    fn rejects_non_transposed_nodes() {
        let nodes = vec![
            ChainGraphNode {
                parents: vec![],
                children: vec![],
            },
            ChainGraphNode {
                parents: vec![0],
                children: vec![],
            },
        ];
        let err = ChainGraph::from_parts(vec![vec![0], vec![1]], nodes).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidGraph(_)));
    }

    #[test]
    fn rejects_empty_chains_and_shared_operators() {
        assert!(ChainGraph::new(vec![vec![]], vec![vec![]]).is_err());
        assert!(ChainGraph::new(vec![vec![0], vec![0]], vec![vec![], vec![]]).is_err());
        assert!(ChainGraph::new(vec![vec![0], vec![5]], vec![vec![], vec![]]).is_err());
        assert!(ChainGraph::from_edges(vec![vec![0]], &[(0, 0)]).is_err());
        assert!(ChainGraph::from_edges(vec![vec![0], vec![1]], &[(0, 1), (0, 1)]).is_err());
    }

    #[test]
    fn single_chain_follows_dependency_order() {
        let graph = ChainGraph::from_edges(vec![vec![2], vec![0, 1]], &[(1, 0)])
            .unwrap()
            .into_single_chain()
            .unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.chain(0), &[0, 1, 2]);
        assert!(graph.parents(0).is_empty());
    }

    #[test]
    fn from_config_numbers_chains_by_name_and_ops_consecutively() {
        let raw = crate::config::load_from_str(
            r#"
[chain.b]
after = ["a", "a"]
ops = [ { type = "X" }, { type = "Y" } ]

[chain.a]
ops = [ { type = "Z" } ]
"#,
        )
        .unwrap();
        let cfg = NetFile::try_from(raw).unwrap();
        let graph = ChainGraph::from_config(&cfg).unwrap();

        assert_eq!(graph.chain(0), &[0]);
        assert_eq!(graph.chain(1), &[1, 2]);
        assert_eq!(graph.parents(1), &[0]);
        assert_eq!(graph.children(0), &[1]);
    }

    #[test]
    fn independent_graph_has_one_root_per_op() {
        let graph = ChainGraph::independent(4);
        assert_eq!(graph.roots().count(), 4);
    }
}
