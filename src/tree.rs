use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parent id carried by top-level items.
pub const ROOT_ID: i64 = 0;

pub trait TreeItem {
    fn get_id(&self) -> i64;
    fn get_parent_id(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub data: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }
}

/// Builds a forest out of a flat listing.
///
/// Items whose parent chain never reaches [`ROOT_ID`] (missing parents,
/// self references, cycles) are left out of the result. Siblings keep the
/// relative order they had in `items`.
pub fn build_tree<T: TreeItem>(items: Vec<T>) -> Vec<TreeNode<T>> {
    build_tree_with_orphans(items).0
}

/// Same as [`build_tree`] but also hands back the items that were dropped.
pub fn build_tree_with_orphans<T: TreeItem>(items: Vec<T>) -> (Vec<TreeNode<T>>, Vec<T>) {
    let total = items.len();
    let (roots, orphans) = adopt_children(ROOT_ID, items);

    if !orphans.is_empty() {
        debug!(
            total,
            dropped = orphans.len(),
            "tree items unreachable from the root were dropped"
        );
    }

    (roots, orphans)
}

// Splits `pool` into the subtrees hanging off `parent_id` and whatever is left.
// Each item moves out of the pool before its own children are looked up, so
// every recursive call works on a strictly smaller pool.
fn adopt_children<T: TreeItem>(parent_id: i64, pool: Vec<T>) -> (Vec<TreeNode<T>>, Vec<T>) {
    let (direct, mut remaining): (Vec<T>, Vec<T>) = pool
        .into_iter()
        .partition(|item| item.get_parent_id() == parent_id);

    let mut children = Vec::with_capacity(direct.len());
    for item in direct {
        let (grandchildren, rest) = adopt_children(item.get_id(), remaining);
        remaining = rest;
        children.push(TreeNode {
            data: item,
            children: grandchildren,
        });
    }

    (children, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Node {
        id: i64,
        parent: i64,
    }

    impl TreeItem for Node {
        fn get_id(&self) -> i64 {
            self.id
        }

        fn get_parent_id(&self) -> i64 {
            self.parent
        }
    }

    fn nodes(pairs: &[(i64, i64)]) -> Vec<Node> {
        pairs
            .iter()
            .map(|&(id, parent)| Node { id, parent })
            .collect()
    }

    fn ids<T: TreeItem>(forest: &[TreeNode<T>]) -> Vec<i64> {
        forest.iter().map(|node| node.data.get_id()).collect()
    }

    #[test]
    fn test_missing_parent_is_dropped() {
        let forest = build_tree(nodes(&[(1, 0), (2, 1), (3, 99)]));

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].children), vec![2]);
        assert!(forest[0].children[0].children.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let forest: Vec<TreeNode<Node>> = build_tree(Vec::new());
        assert!(forest.is_empty());
    }

    #[test]
    fn test_siblings_keep_input_order() {
        let forest = build_tree(nodes(&[(5, 0), (9, 5), (2, 0), (7, 5), (3, 5), (1, 2)]));

        assert_eq!(ids(&forest), vec![5, 2]);
        assert_eq!(ids(&forest[0].children), vec![9, 7, 3]);
        assert_eq!(ids(&forest[1].children), vec![1]);
    }

    #[test]
    fn test_child_listed_before_parent() {
        let forest = build_tree(nodes(&[(3, 2), (2, 1), (1, 0)]));

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].children), vec![2]);
        assert_eq!(ids(&forest[0].children[0].children), vec![3]);
    }

    #[test]
    fn test_self_reference_is_dropped() {
        let (forest, orphans) = build_tree_with_orphans(nodes(&[(1, 0), (4, 4)]));

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(orphans, nodes(&[(4, 4)]));
    }

    #[test]
    fn test_cycle_and_its_descendants_are_dropped() {
        let input = nodes(&[(1, 0), (2, 3), (3, 2), (4, 3), (5, 1)]);
        let (forest, orphans) = build_tree_with_orphans(input.clone());

        let reachable: usize = forest.iter().map(TreeNode::count).sum();
        assert_eq!(reachable, 2);
        assert_eq!(reachable + orphans.len(), input.len());

        let mut dropped: Vec<i64> = orphans.iter().map(|n| n.id).collect();
        dropped.sort();
        assert_eq!(dropped, vec![2, 3, 4]);
    }

    #[test]
    fn test_every_input_is_either_placed_or_dropped() {
        let input = nodes(&[
            (1, 0),
            (2, 1),
            (3, 1),
            (4, 2),
            (5, 42),
            (6, 5),
            (7, 0),
            (8, 8),
            (9, 7),
        ]);
        let (forest, orphans) = build_tree_with_orphans(input.clone());

        let reachable: usize = forest.iter().map(TreeNode::count).sum();
        assert_eq!(reachable, 6);
        assert_eq!(orphans.len(), 3);
        assert_eq!(reachable + orphans.len(), input.len());
    }

    #[test]
    fn test_building_twice_gives_the_same_tree() {
        let input = nodes(&[(1, 0), (2, 1), (3, 2), (4, 0), (5, 4), (6, 1)]);

        let first = build_tree(input.clone());
        let second = build_tree(input);

        assert_eq!(first, second);
    }

    #[test]
    fn test_deep_chain() {
        let input: Vec<Node> = (1..=200).map(|id| Node { id, parent: id - 1 }).collect();
        let forest = build_tree(input);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].count(), 200);
    }
}
