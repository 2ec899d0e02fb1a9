//! Unbalanced binary search tree backed by an arena of nodes.
//!
//! Nodes live in a single `Vec` and refer to their children by [NodeHandle]
//! instead of owning pointers, so the tree has no ownership cycles and every walk
//! is an explicit loop. The tree is never rebalanced: [BinaryTree::fill] builds a
//! near-minimal tree once, and later inserts/removes may degrade its height.

use std::cmp::Ordering;
use std::mem;

use allocative::Allocative;

/// Position of a node inside the tree's arena.
///
/// A handle stays valid across inserts and payload mutation. Any `remove` may
/// move nodes inside the arena and invalidates outstanding handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Allocative)]
pub struct NodeHandle(usize);

#[derive(Debug, Allocative)]
pub struct Node<K, V> {
    key: K,
    payload: V,
    left: Option<NodeHandle>,
    right: Option<NodeHandle>,
}

impl<K, V> Node<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn payload(&self) -> &V {
        &self.payload
    }

    pub fn left(&self) -> Option<NodeHandle> {
        self.left
    }

    pub fn right(&self) -> Option<NodeHandle> {
        self.right
    }
}

/// Which child link of a parent points at a node.
#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// `None` stands for the root link.
type Link = Option<(NodeHandle, Side)>;

#[derive(Debug, Allocative)]
pub struct BinaryTree<K, V> {
    nodes: Vec<Node<K, V>>,
    root: Option<NodeHandle>,
}

impl<K, V> Default for BinaryTree<K, V> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<K: Ord, V> BinaryTree<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    pub fn node(&self, handle: NodeHandle) -> &Node<K, V> {
        &self.nodes[handle.0]
    }

    /// Inserts `key`, replacing the payload if the key is already present.
    pub fn insert(&mut self, key: K, payload: V) {
        let Some(mut current) = self.root else {
            self.root = Some(self.alloc(key, payload));
            return;
        };

        loop {
            let node = &mut self.nodes[current.0];
            match key.cmp(&node.key) {
                Ordering::Equal => {
                    node.payload = payload;
                    return;
                }
                Ordering::Less => match node.left {
                    Some(left) => current = left,
                    None => {
                        let handle = self.alloc(key, payload);
                        self.nodes[current.0].left = Some(handle);
                        return;
                    }
                },
                Ordering::Greater => match node.right {
                    Some(right) => current = right,
                    None => {
                        let handle = self.alloc(key, payload);
                        self.nodes[current.0].right = Some(handle);
                        return;
                    }
                },
            }
        }
    }

    /// Locates the node owning `key`.
    pub fn find(&self, key: &K) -> Option<NodeHandle> {
        let mut current = self.root?;
        loop {
            let node = &self.nodes[current.0];
            current = match key.cmp(&node.key) {
                Ordering::Equal => return Some(current),
                Ordering::Less => node.left?,
                Ordering::Greater => node.right?,
            };
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|handle| &self.nodes[handle.0].payload)
    }

    /// Mutable access to the payload of a located node.
    pub fn payload_mut(&mut self, handle: NodeHandle) -> &mut V {
        &mut self.nodes[handle.0].payload
    }

    /// Locate-and-mutate: the payload stored under `key`, editable in place.
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        let handle = self.find(key)?;
        Some(self.payload_mut(handle))
    }

    /// Removes `key` and returns its payload.
    ///
    /// A node with two children takes over the key and payload of its in-order
    /// successor (the minimum of its right subtree), and the successor's original
    /// node is unlinked instead.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut link: Link = None;
        let mut current = self.root?;
        loop {
            let node = &self.nodes[current.0];
            match key.cmp(&node.key) {
                Ordering::Equal => break,
                Ordering::Less => {
                    link = Some((current, Side::Left));
                    current = node.left?;
                }
                Ordering::Greater => {
                    link = Some((current, Side::Right));
                    current = node.right?;
                }
            }
        }

        let node = &self.nodes[current.0];
        match (node.left, node.right) {
            (Some(_), Some(right)) => {
                let mut successor_link = (current, Side::Right);
                let mut successor = right;
                while let Some(left) = self.nodes[successor.0].left {
                    successor_link = (successor, Side::Left);
                    successor = left;
                }

                // The successor has no left child: splice its right child in.
                self.swap_entries(current, successor);
                let orphan = self.nodes[successor.0].right;
                self.set_link(Some(successor_link), orphan);
                Some(self.release(successor).payload)
            }
            (child, None) | (None, child) => {
                self.set_link(link, child);
                Some(self.release(current).payload)
            }
        }
    }

    /// Replaces the whole tree with one built from `pairs`.
    ///
    /// The pairs are sorted by key, then the sequence is split at its median
    /// recursively, producing a tree of near-minimal height. When a key repeats,
    /// the last payload given for it wins, as it would with repeated inserts.
    pub fn fill(&mut self, mut pairs: Vec<(K, V)>) {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.dedup_by(|later, earlier| {
            if later.0 == earlier.0 {
                mem::swap(&mut later.1, &mut earlier.1);
                true
            } else {
                false
            }
        });

        let mut entries: Vec<Option<(K, V)>> = pairs.into_iter().map(Some).collect();
        self.nodes = Vec::with_capacity(entries.len());
        self.root = self.build(&mut entries);
    }

    /// Pre-order walk of every node under `handle`, `handle` included.
    pub fn subtree(&self, handle: Option<NodeHandle>) -> Subtree<'_, K, V> {
        Subtree {
            tree: self,
            stack: handle.into_iter().collect(),
        }
    }

    /// In-order walk of the whole tree.
    #[cfg(test)]
    pub fn iter(&self) -> InOrder<'_, K, V> {
        let mut iter = InOrder {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left_spine(self.root);
        iter
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(NodeHandle, usize)> =
            self.root.into_iter().map(|root| (root, 1)).collect();
        while let Some((handle, depth)) = stack.pop() {
            height = height.max(depth);
            let node = &self.nodes[handle.0];
            stack.extend(node.left.map(|left| (left, depth + 1)));
            stack.extend(node.right.map(|right| (right, depth + 1)));
        }
        height
    }

    fn build(&mut self, entries: &mut [Option<(K, V)>]) -> Option<NodeHandle> {
        if entries.is_empty() {
            return None;
        }

        let mid = entries.len() / 2;
        let (key, payload) = entries[mid].take()?;
        let handle = self.alloc(key, payload);

        let (left, rest) = entries.split_at_mut(mid);
        let left = self.build(left);
        let right = self.build(&mut rest[1..]);

        let node = &mut self.nodes[handle.0];
        node.left = left;
        node.right = right;
        Some(handle)
    }

    fn alloc(&mut self, key: K, payload: V) -> NodeHandle {
        self.nodes.push(Node {
            key,
            payload,
            left: None,
            right: None,
        });
        NodeHandle(self.nodes.len() - 1)
    }

    fn set_link(&mut self, link: Link, target: Option<NodeHandle>) {
        match link {
            None => self.root = target,
            Some((parent, Side::Left)) => self.nodes[parent.0].left = target,
            Some((parent, Side::Right)) => self.nodes[parent.0].right = target,
        }
    }

    /// Finds the link pointing at `target`, searching by its key.
    fn link_to(&self, target: NodeHandle) -> Link {
        let key = &self.nodes[target.0].key;
        let mut link = None;
        let mut current = self.root;
        while let Some(handle) = current {
            if handle == target {
                break;
            }
            let node = &self.nodes[handle.0];
            if *key < node.key {
                link = Some((handle, Side::Left));
                current = node.left;
            } else {
                link = Some((handle, Side::Right));
                current = node.right;
            }
        }
        link
    }

    fn swap_entries(&mut self, a: NodeHandle, b: NodeHandle) {
        if a == b {
            return;
        }
        let (low, high) = if a.0 < b.0 { (a.0, b.0) } else { (b.0, a.0) };
        let (head, tail) = self.nodes.split_at_mut(high);
        let (x, y) = (&mut head[low], &mut tail[0]);
        mem::swap(&mut x.key, &mut y.key);
        mem::swap(&mut x.payload, &mut y.payload);
    }

    /// Drops an already unlinked node from the arena.
    ///
    /// The arena stays dense: the last node moves into the freed slot and the
    /// link that pointed at it is redirected.
    fn release(&mut self, handle: NodeHandle) -> Node<K, V> {
        let last = NodeHandle(self.nodes.len() - 1);
        if handle != last {
            let link = self.link_to(last);
            self.set_link(link, Some(handle));
        }
        self.nodes.swap_remove(handle.0)
    }
}

pub struct Subtree<'a, K, V> {
    tree: &'a BinaryTree<K, V>,
    stack: Vec<NodeHandle>,
}

impl<'a, K, V> Iterator for Subtree<'a, K, V> {
    type Item = &'a Node<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let handle = self.stack.pop()?;
        let node = &tree.nodes[handle.0];
        self.stack.extend(node.right);
        self.stack.extend(node.left);
        Some(node)
    }
}

#[cfg(test)]
pub struct InOrder<'a, K, V> {
    tree: &'a BinaryTree<K, V>,
    stack: Vec<NodeHandle>,
}

#[cfg(test)]
impl<K, V> InOrder<'_, K, V> {
    fn push_left_spine(&mut self, mut current: Option<NodeHandle>) {
        while let Some(handle) = current {
            self.stack.push(handle);
            current = self.tree.nodes[handle.0].left;
        }
    }
}

#[cfg(test)]
impl<'a, K, V> Iterator for InOrder<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        let handle = self.stack.pop()?;
        let node = &tree.nodes[handle.0];
        self.push_left_spine(node.right);
        Some((&node.key, &node.payload))
    }
}
