//! Balanced percentage tree
//!
//! An AVL tree whose nodes live in one `Vec` and refer to their children by
//! index. Rotations only reassign indices; nodes never move once pushed.

use std::cmp::Ordering;

use crate::gcode::Locator;

#[derive(Debug, Clone)]
struct Node {
    key: f64,
    /// Every locator inserted under this key, in insertion order
    bucket: Vec<Locator>,
    left: Option<usize>,
    right: Option<usize>,
    height: usize,
}

impl Node {
    fn leaf(key: f64, locator: Locator) -> Self {
        Self {
            key,
            bucket: vec![locator],
            left: None,
            right: None,
            height: 1,
        }
    }
}

/// Percentage → locator tree with a cached last result
#[derive(Debug, Clone, Default)]
pub struct PercentageTree {
    nodes: Vec<Node>,
    root: Option<usize>,
    entries: usize,
    last_found: Option<Locator>,
}

impl PercentageTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.entries = 0;
        self.last_found = None;
    }

    /// Number of inserted locators
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of distinct keys
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Height of the tree; a single node has height 1
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    pub fn insert(&mut self, key: f64, locator: Locator) {
        let root = self.insert_at(self.root, key, locator);
        self.root = Some(root);
        self.entries += 1;
    }

    /// Locate the command for a progress percentage
    ///
    /// Descends by comparison. An exact key returns its bucket; otherwise the
    /// last node visited on the way down answers, which is close to the key
    /// but not necessarily the nearest one. A `None` key returns the previous
    /// answer.
    pub fn find_best(&mut self, key: Option<f64>) -> Option<Locator> {
        let Some(key) = key else {
            return self.last_found;
        };

        let mut current = self.root;
        let mut visited = None;
        while let Some(idx) = current {
            visited = Some(idx);
            let node = &self.nodes[idx];
            current = match key.total_cmp(&node.key) {
                Ordering::Equal => break,
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }

        let found = visited.and_then(|idx| self.nodes[idx].bucket.first().copied());
        if found.is_some() {
            self.last_found = found;
        }
        found
    }

    /// Last location answered by `find_best`
    pub fn last_found(&self) -> Option<Locator> {
        self.last_found
    }

    fn insert_at(&mut self, node: Option<usize>, key: f64, locator: Locator) -> usize {
        let Some(idx) = node else {
            self.nodes.push(Node::leaf(key, locator));
            return self.nodes.len() - 1;
        };

        match key.total_cmp(&self.nodes[idx].key) {
            Ordering::Equal => {
                self.nodes[idx].bucket.push(locator);
                return idx;
            }
            Ordering::Less => {
                let child = self.insert_at(self.nodes[idx].left, key, locator);
                self.nodes[idx].left = Some(child);
            }
            Ordering::Greater => {
                let child = self.insert_at(self.nodes[idx].right, key, locator);
                self.nodes[idx].right = Some(child);
            }
        }
        self.rebalance(idx)
    }

    fn height_of(&self, node: Option<usize>) -> usize {
        node.map_or(0, |idx| self.nodes[idx].height)
    }

    fn balance_of(&self, idx: usize) -> isize {
        let node = &self.nodes[idx];
        self.height_of(node.left) as isize - self.height_of(node.right) as isize
    }

    fn update_height(&mut self, idx: usize) {
        let node = &self.nodes[idx];
        let height = 1 + self.height_of(node.left).max(self.height_of(node.right));
        self.nodes[idx].height = height;
    }

    /// Returns the index now at the top of this subtree
    fn rotate_right(&mut self, idx: usize) -> usize {
        let Some(pivot) = self.nodes[idx].left else {
            return idx;
        };
        self.nodes[idx].left = self.nodes[pivot].right;
        self.nodes[pivot].right = Some(idx);
        self.update_height(idx);
        self.update_height(pivot);
        pivot
    }

    fn rotate_left(&mut self, idx: usize) -> usize {
        let Some(pivot) = self.nodes[idx].right else {
            return idx;
        };
        self.nodes[idx].right = self.nodes[pivot].left;
        self.nodes[pivot].left = Some(idx);
        self.update_height(idx);
        self.update_height(pivot);
        pivot
    }

    fn rebalance(&mut self, idx: usize) -> usize {
        self.update_height(idx);
        let balance = self.balance_of(idx);

        if balance > 1 {
            if let Some(left) = self.nodes[idx].left {
                // left-right: straighten the child first
                if self.balance_of(left) < 0 {
                    let top = self.rotate_left(left);
                    self.nodes[idx].left = Some(top);
                }
            }
            return self.rotate_right(idx);
        }

        if balance < -1 {
            if let Some(right) = self.nodes[idx].right {
                if self.balance_of(right) > 0 {
                    let top = self.rotate_right(right);
                    self.nodes[idx].right = Some(top);
                }
            }
            return self.rotate_left(idx);
        }

        idx
    }
}
