use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// Error type for topology operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError<K: Debug + Clone> {
    /// Cycle detected in the graph
    CycleDetected { path: Vec<K> },
}

impl<K: Debug + Clone> std::fmt::Display for TopologyError<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::CycleDetected { path } => {
                write!(f, "Cycle detected: ")?;
                for (i, node) in path.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{:?}", node)?;
                }
                Ok(())
            }
        }
    }
}

impl<K: Debug + Clone> std::error::Error for TopologyError<K> {}

/// Generic topological sort using DFS
///
/// # Arguments
/// * `nodes` - Iterator over all nodes to sort
/// * `get_dependencies` - Function that returns the dependencies (inputs) of a node
///
/// # Returns
/// A vector of nodes in topological order (dependencies before dependents),
/// or the nodes along the first cycle found.
pub fn topological_sort<K>(
    nodes: impl IntoIterator<Item = K>,
    get_dependencies: impl Fn(&K) -> Vec<K>,
) -> Result<Vec<K>, TopologyError<K>>
where
    K: Hash + Eq + Clone + Debug,
{
    let nodes: Vec<K> = nodes.into_iter().collect();

    let mut sorted = Vec::with_capacity(nodes.len());
    let mut visited = HashSet::with_capacity(nodes.len());
    let mut on_path = HashSet::new();
    let mut path = Vec::new();

    struct Walk<'a, K, F> {
        get_dependencies: &'a F,
        visited: &'a mut HashSet<K>,
        on_path: &'a mut HashSet<K>,
        path: &'a mut Vec<K>,
        sorted: &'a mut Vec<K>,
    }

    fn visit<K, F>(node: K, walk: &mut Walk<'_, K, F>) -> Result<(), TopologyError<K>>
    where
        K: Hash + Eq + Clone + Debug,
        F: Fn(&K) -> Vec<K>,
    {
        if walk.on_path.contains(&node) {
            let start = walk.path.iter().position(|n| *n == node).unwrap_or(0);
            let mut cycle: Vec<K> = walk.path.get(start..).unwrap_or_default().to_vec();
            cycle.push(node);
            return Err(TopologyError::CycleDetected { path: cycle });
        }

        if walk.visited.contains(&node) {
            return Ok(());
        }

        walk.on_path.insert(node.clone());
        walk.path.push(node.clone());

        for dependency in (walk.get_dependencies)(&node) {
            visit(dependency, walk)?;
        }

        walk.path.pop();
        walk.on_path.remove(&node);
        walk.visited.insert(node.clone());
        walk.sorted.push(node);

        Ok(())
    }

    let mut walk = Walk {
        get_dependencies: &get_dependencies,
        visited: &mut visited,
        on_path: &mut on_path,
        path: &mut path,
        sorted: &mut sorted,
    };

    for node in nodes {
        if !walk.visited.contains(&node) {
            visit(node, &mut walk)?;
        }
    }

    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_chain() {
        // a -> b -> c
        let nodes = vec!["c", "b", "a"];
        let deps = |node: &&str| -> Vec<&str> {
            match *node {
                "b" => vec!["a"],
                "c" => vec!["b"],
                _ => vec![],
            }
        };

        let sorted = topological_sort(nodes, deps).unwrap();
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond() {
        // a -> b -> d
        // a -> c -> d
        let nodes = vec!["a", "b", "c", "d"];
        let deps = |node: &&str| -> Vec<&str> {
            match *node {
                "b" => vec!["a"],
                "c" => vec!["a"],
                "d" => vec!["b", "c"],
                _ => vec![],
            }
        };

        let sorted = topological_sort(nodes, deps).unwrap();
        assert_eq!(sorted[0], "a");
        assert_eq!(sorted[3], "d");
        // b and c can be in either order
    }

    #[test]
    fn test_repeated_dependency() {
        let nodes = vec!["sum", "x"];
        let deps = |node: &&str| -> Vec<&str> {
            match *node {
                "sum" => vec!["x", "x", "x"],
                _ => vec![],
            }
        };

        let sorted = topological_sort(nodes, deps).unwrap();
        assert_eq!(sorted, vec!["x", "sum"]);
    }

    #[test]
    fn test_cycle_detection() {
        // a -> b -> a (cycle)
        let nodes = vec!["a", "b"];
        let deps = |node: &&str| -> Vec<&str> {
            match *node {
                "a" => vec!["b"],
                "b" => vec!["a"],
                _ => vec![],
            }
        };

        let result = topological_sort(nodes, deps);
        match result {
            Err(TopologyError::CycleDetected { path }) => {
                assert_eq!(path, vec!["a", "b", "a"]);
            }
            _ => panic!("Expected cycle error"),
        }
    }

    #[test]
    fn test_self_loop() {
        let nodes = vec!["a"];
        let deps = |_: &&str| -> Vec<&str> { vec!["a"] };

        let err = topological_sort(nodes, deps).unwrap_err();
        assert_eq!(err.to_string(), "Cycle detected: \"a\" -> \"a\"");
    }
}
