//! In-memory view of a vendor's node hierarchy
//!
//! Nodes are kept in an arena; each entry holds the indices of its
//! children, sorted by name.

use std::collections::HashMap;

use serde::Serialize;

use super::GroupingNode;

/// Arena of nodes with parent/child links by index
#[derive(Debug, Default)]
pub struct NodeTree {
    nodes: Vec<GroupingNode>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

/// Nested, serializable form of the tree
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    pub id: i64,
    pub name: String,
    pub children: Vec<TreeEntry>,
}

impl NodeTree {
    /// Build from a flat list of nodes of one vendor
    ///
    /// A node whose parent is missing from the list is treated as a root.
    pub fn build(mut nodes: Vec<GroupingNode>) -> Self {
        nodes.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });

        let index: HashMap<i64, usize> = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();

        for (i, node) in nodes.iter().enumerate() {
            match node.parent_id.and_then(|pid| index.get(&pid)) {
                Some(&parent) if parent != i => children[parent].push(i),
                _ => roots.push(i),
            }
        }

        Self {
            nodes,
            children,
            roots,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first walk calling `visit(depth, node)`
    pub fn walk<F: FnMut(usize, &GroupingNode)>(&self, mut visit: F) {
        // Explicit stack; a corrupt parent chain cannot recurse forever
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&r| (r, 0)).collect();

        while let Some((idx, depth)) = stack.pop() {
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            visit(depth, &self.nodes[idx]);
            for &child in self.children[idx].iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }

    /// Nested representation for JSON/YAML output
    pub fn entries(&self) -> Vec<TreeEntry> {
        let mut visited = vec![false; self.nodes.len()];
        self.roots
            .iter()
            .filter_map(|&r| self.entry(r, &mut visited))
            .collect()
    }

    fn entry(&self, idx: usize, visited: &mut [bool]) -> Option<TreeEntry> {
        if visited[idx] {
            return None;
        }
        visited[idx] = true;
        let node = &self.nodes[idx];
        Some(TreeEntry {
            id: node.id,
            name: node.name.clone(),
            children: self.children[idx]
                .iter()
                .filter_map(|&c| self.entry(c, visited))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(id: i64, parent_id: Option<i64>, name: &str) -> GroupingNode {
        GroupingNode {
            id,
            vendor_id: 1,
            parent_id,
            name: name.to_string(),
            created_by: "test".to_string(),
            created: Utc::now(),
            updated: Utc::now(),
        }
    }

    #[test]
    fn test_walk_orders_children_by_name() {
        let tree = NodeTree::build(vec![
            node(1, None, "Main"),
            node(2, Some(1), "Switching"),
            node(3, Some(1), "Routing"),
            node(4, Some(3), "BGP"),
        ]);

        let mut seen = Vec::new();
        tree.walk(|depth, n| seen.push((depth, n.name.clone())));

        assert_eq!(
            seen,
            vec![
                (0, "Main".to_string()),
                (1, "Routing".to_string()),
                (2, "BGP".to_string()),
                (1, "Switching".to_string()),
            ]
        );
    }

    #[test]
    fn test_orphans_become_roots() {
        let tree = NodeTree::build(vec![node(5, Some(99), "Orphan"), node(6, None, "Root")]);
        let entries = tree.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Orphan");
    }

    #[test]
    fn test_self_parent_does_not_loop() {
        let tree = NodeTree::build(vec![node(7, Some(7), "Loop")]);
        let mut count = 0;
        tree.walk(|_, _| count += 1);
        assert_eq!(count, 1);
        assert_eq!(tree.entries()[0].children.len(), 0);
    }
}
