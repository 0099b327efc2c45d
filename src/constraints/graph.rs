//! Derived graphs and articulation-point analysis
//!
//! Path constraints reduce the topology to an undirected graph once at
//! init, then repeatedly ask which walkable nodes are unavoidable: nodes
//! whose removal would disconnect two nodes that must carry the path. The
//! analysis is a single iterative depth-first pass computing low-links,
//! restricted so that only subtrees containing a relevant node can make
//! their parent an articulation point.

use crate::spatial::GridTopology;

/// Undirected graph with deduplicated adjacency lists
#[derive(Clone, Debug)]
pub struct SimpleGraph {
    neighbors: Vec<Vec<u32>>,
}

impl SimpleGraph {
    /// Create a graph with the given number of isolated nodes
    pub fn new(node_count: usize) -> Self {
        Self {
            neighbors: vec![Vec::new(); node_count],
        }
    }

    /// One node per cell, edges between cells adjacent in any direction
    pub fn from_topology(topology: &GridTopology) -> Self {
        let mut graph = Self::new(topology.cell_count());
        for cell in topology.cells() {
            for direction in 0..topology.directions().count() {
                if let Some(neighbor) = topology.try_move(cell, direction) {
                    graph.add_edge(cell, neighbor);
                }
            }
        }
        graph
    }

    /// Connect two nodes; repeated and self edges are ignored
    ///
    /// Duplicate edges would defeat the articulation analysis (a second
    /// parallel edge is not an alternate route around a removed node), so
    /// the lists stay strict sets.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (Ok(a32), Ok(b32)) = (u32::try_from(a), u32::try_from(b)) else {
            return;
        };
        if let Some(list) = self.neighbors.get_mut(a) {
            if !list.contains(&b32) {
                list.push(b32);
            }
        }
        if let Some(list) = self.neighbors.get_mut(b) {
            if !list.contains(&a32) {
                list.push(a32);
            }
        }
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Neighbors of a node
    pub fn neighbors(&self, node: usize) -> &[u32] {
        self.neighbors.get(node).map_or(&[], Vec::as_slice)
    }
}

/// Result of a connectivity pass over the walkable subgraph
#[derive(Debug)]
pub struct ConnectivityAnalysis {
    /// Whether every relevant node is reachable from every other through
    /// walkable nodes
    pub connected: bool,
    /// Nodes whose removal would separate at least two relevant nodes
    pub is_articulation: Vec<bool>,
}

/// Find articulation points of the walkable subgraph, restricted to
/// relevant nodes
///
/// Runs one DFS from an arbitrary relevant node. A non-root node is an
/// articulation point when some child subtree contains a relevant node and
/// has no back edge climbing above the node; the root is one when at least
/// two of its child subtrees contain relevant nodes. A relevant node that
/// is unreachable (or not walkable at all) makes the result disconnected.
pub fn articulation_points(
    graph: &SimpleGraph,
    walkable: &[bool],
    relevant: &[bool],
) -> ConnectivityAnalysis {
    let node_count = graph.node_count();
    let mut analysis = ConnectivityAnalysis {
        connected: true,
        is_articulation: vec![false; node_count],
    };

    let is_walkable = |node: usize| walkable.get(node).copied().unwrap_or(false);
    let is_relevant = |node: usize| relevant.get(node).copied().unwrap_or(false);

    let Some(root) = (0..node_count).find(|&node| is_relevant(node)) else {
        return analysis;
    };
    if (0..node_count).any(|node| is_relevant(node) && !is_walkable(node)) {
        analysis.connected = false;
        return analysis;
    }

    let mut order = vec![0u32; node_count];
    let mut low = vec![0u32; node_count];
    let mut subtree_relevant = vec![false; node_count];
    let mut counter = 0u32;
    let mut root_relevant_children = 0usize;

    // (node, DFS-tree parent, next neighbor offset)
    let mut stack: Vec<(usize, usize, usize)> = Vec::new();
    counter += 1;
    if let (Some(o), Some(l), Some(s)) = (
        order.get_mut(root),
        low.get_mut(root),
        subtree_relevant.get_mut(root),
    ) {
        *o = counter;
        *l = counter;
        *s = true;
    }
    stack.push((root, usize::MAX, 0));

    while let Some(&(node, parent, offset)) = stack.last() {
        if let Some(&next) = graph.neighbors(node).get(offset) {
            if let Some(top) = stack.last_mut() {
                top.2 += 1;
            }
            let next = next as usize;
            if next == parent || !is_walkable(next) {
                continue;
            }
            let seen = order.get(next).copied().unwrap_or(0);
            if seen != 0 {
                // Back edge: the subtree can climb at least this high
                if let Some(l) = low.get_mut(node) {
                    *l = (*l).min(seen);
                }
            } else {
                counter += 1;
                if let (Some(o), Some(l), Some(s)) = (
                    order.get_mut(next),
                    low.get_mut(next),
                    subtree_relevant.get_mut(next),
                ) {
                    *o = counter;
                    *l = counter;
                    *s = is_relevant(next);
                }
                stack.push((next, node, 0));
            }
        } else {
            stack.pop();
            let Some(&(parent_node, _, _)) = stack.last() else {
                continue;
            };
            let child_low = low.get(node).copied().unwrap_or(0);
            let child_relevant = subtree_relevant.get(node).copied().unwrap_or(false);
            if let Some(l) = low.get_mut(parent_node) {
                *l = (*l).min(child_low);
            }
            if child_relevant {
                if let Some(s) = subtree_relevant.get_mut(parent_node) {
                    *s = true;
                }
                if parent_node == root {
                    root_relevant_children += 1;
                } else if child_low >= order.get(parent_node).copied().unwrap_or(0) {
                    // No route from the relevant subtree past this node; it
                    // must carry the path between the subtree and the root
                    if let Some(a) = analysis.is_articulation.get_mut(parent_node) {
                        *a = true;
                    }
                }
            }
        }
    }

    if root_relevant_children >= 2 {
        if let Some(a) = analysis.is_articulation.get_mut(root) {
            *a = true;
        }
    }

    if (0..node_count).any(|node| is_relevant(node) && order.get(node).copied().unwrap_or(0) == 0)
    {
        analysis.connected = false;
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 - 1 - 2 - 3 path graph
    fn path_graph(length: usize) -> SimpleGraph {
        let mut graph = SimpleGraph::new(length);
        for node in 1..length {
            graph.add_edge(node - 1, node);
        }
        graph
    }

    #[test]
    fn test_interior_of_path_is_articulation() {
        let graph = path_graph(4);
        let walkable = vec![true; 4];
        let mut relevant = vec![false; 4];
        relevant[0] = true;
        relevant[3] = true;

        let analysis = articulation_points(&graph, &walkable, &relevant);
        assert!(analysis.connected);
        assert_eq!(analysis.is_articulation, vec![false, true, true, false]);
    }

    #[test]
    fn test_cycle_has_no_articulation() {
        let mut graph = path_graph(4);
        graph.add_edge(3, 0);
        let walkable = vec![true; 4];
        let mut relevant = vec![false; 4];
        relevant[0] = true;
        relevant[2] = true;

        let analysis = articulation_points(&graph, &walkable, &relevant);
        assert!(analysis.connected);
        assert!(analysis.is_articulation.iter().all(|&a| !a));
    }

    #[test]
    fn test_unreachable_relevant_node_disconnects() {
        let graph = path_graph(4);
        let mut walkable = vec![true; 4];
        walkable[1] = false;
        let mut relevant = vec![false; 4];
        relevant[0] = true;
        relevant[3] = true;

        let analysis = articulation_points(&graph, &walkable, &relevant);
        assert!(!analysis.connected);
    }

    #[test]
    fn test_irrelevant_branch_does_not_force() {
        // 0 - 1 - 2 with a dead-end branch 1 - 3; only 0 and 2 relevant
        let mut graph = path_graph(3);
        graph.add_edge(1, 3);
        let walkable = vec![true; 4];
        let mut relevant = vec![false; 4];
        relevant[0] = true;
        relevant[2] = true;

        let analysis = articulation_points(&graph, &walkable, &relevant);
        assert!(analysis.connected);
        // Node 1 separates the endpoints; node 3's branch never matters
        assert_eq!(analysis.is_articulation, vec![false, true, false, false]);
    }

    #[test]
    fn test_single_relevant_node_forces_nothing() {
        let graph = path_graph(3);
        let walkable = vec![true; 3];
        let mut relevant = vec![false; 3];
        relevant[1] = true;

        let analysis = articulation_points(&graph, &walkable, &relevant);
        assert!(analysis.connected);
        assert!(analysis.is_articulation.iter().all(|&a| !a));
    }

    #[test]
    fn test_masked_diamond_reroutes() {
        // Diamond 0-1-3, 0-2-3; blocking 1 leaves 2 as the only route
        let mut graph = SimpleGraph::new(4);
        graph.add_edge(0, 1);
        graph.add_edge(0, 2);
        graph.add_edge(1, 3);
        graph.add_edge(2, 3);

        let mut walkable = vec![true; 4];
        let mut relevant = vec![false; 4];
        relevant[0] = true;
        relevant[3] = true;

        let open = articulation_points(&graph, &walkable, &relevant);
        assert!(open.connected);
        assert!(open.is_articulation.iter().all(|&a| !a));

        walkable[1] = false;
        let blocked = articulation_points(&graph, &walkable, &relevant);
        assert!(blocked.connected);
        assert_eq!(
            blocked.is_articulation,
            vec![false, false, true, false]
        );
    }
}
