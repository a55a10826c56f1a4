//! Resource trie - prefix-indexed map keyed by [`ResourceId`]
//!
//! Answers exact lookups and "every entry below this resource" queries
//! without scanning unrelated keys.

use super::id::ResourceId;
use std::collections::BTreeMap;

/// Hierarchical map from [`ResourceId`] to `V`.
///
/// The first trie level is the identifier origin, every further level one
/// path segment. Interior nodes that hold no entry and have no children are
/// pruned on delete, so a node exists only while something lives at or
/// below it.
#[derive(Debug, Clone)]
pub struct ResourceTrie<V> {
    roots: BTreeMap<String, Node<V>>,
    len: usize,
}

#[derive(Debug, Clone)]
struct Node<V> {
    entry: Option<(ResourceId, V)>,
    children: BTreeMap<String, Node<V>>,
}

impl<V> Node<V> {
    fn new() -> Self {
        Self {
            entry: None,
            children: BTreeMap::new(),
        }
    }

    fn is_vacant(&self) -> bool {
        self.entry.is_none() && self.children.is_empty()
    }
}

impl<V> Default for ResourceTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ResourceTrie<V> {
    /// Create an empty trie
    pub fn new() -> Self {
        Self {
            roots: BTreeMap::new(),
            len: 0,
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn locate(&self, key: &ResourceId) -> Option<&Node<V>> {
        let mut node = self.roots.get(key.origin())?;
        for segment in key.segments() {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Exact lookup
    pub fn get(&self, key: &ResourceId) -> Option<&V> {
        self.locate(key)?.entry.as_ref().map(|(_, v)| v)
    }

    /// True when an entry exists exactly at `key`
    pub fn contains(&self, key: &ResourceId) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace, returning the previous value
    pub fn set(&mut self, key: ResourceId, value: V) -> Option<V> {
        let mut node = self
            .roots
            .entry(key.origin().to_string())
            .or_insert_with(Node::new);
        for segment in key.segments() {
            node = node
                .children
                .entry(segment.clone())
                .or_insert_with(Node::new);
        }

        let previous = node.entry.replace((key, value)).map(|(_, v)| v);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Remove the entry at `key`, pruning vacant nodes
    pub fn delete(&mut self, key: &ResourceId) -> Option<V> {
        let root = self.roots.get_mut(key.origin())?;
        let removed = remove_in(root, key.segments());
        if root.is_vacant() {
            self.roots.remove(key.origin());
        }
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.roots.clear();
        self.len = 0;
    }

    /// Lazily enumerate entries strictly below `key`, in segment order
    pub fn find_descendants(&self, key: &ResourceId) -> Descendants<'_, V> {
        let stack = match self.locate(key) {
            Some(node) => node.children.values().rev().collect(),
            None => Vec::new(),
        };
        Descendants { stack }
    }

    /// True when an entry exists at `key` or anywhere below it
    pub fn knows_about(&self, key: &ResourceId) -> bool {
        // vacant nodes are pruned, so reaching the node is enough
        self.locate(key).is_some()
    }

    /// Enumerate every entry
    pub fn iter(&self) -> Descendants<'_, V> {
        Descendants {
            stack: self.roots.values().rev().collect(),
        }
    }
}

fn remove_in<V>(node: &mut Node<V>, segments: &[String]) -> Option<V> {
    let Some((head, rest)) = segments.split_first() else {
        return node.entry.take().map(|(_, v)| v);
    };

    let child = node.children.get_mut(head)?;
    let removed = remove_in(child, rest);
    if child.is_vacant() {
        node.children.remove(head);
    }
    removed
}

/// Pre-order iterator over trie entries
pub struct Descendants<'a, V> {
    stack: Vec<&'a Node<V>>,
}

impl<'a, V> Iterator for Descendants<'a, V> {
    type Item = (&'a ResourceId, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            self.stack.extend(node.children.values().rev());
            if let Some((key, value)) = &node.entry {
                return Some((key, value));
            }
        }
        None
    }
}
