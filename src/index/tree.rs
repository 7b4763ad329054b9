//! AVL interval tree over CIDR entries.
//!
//! # Responsibilities
//! - Store entries under the total key order `(start, prefix_len, label)`
//! - Keep `max_end` per subtree so point queries can prune
//! - Answer point queries with the most specific covering entry
//!
//! # Design Decisions
//! - Exact key equality is the `(prefix, label)` identity, so duplicate
//!   inserts are no-ops and removal never has to search an overlap class
//! - Point queries walk with the overlap comparator against a degenerate
//!   probe interval; `max_end` cuts subtrees that end before the probe
//! - No interior locking: the routing table guards the whole tree

use std::cmp::Ordering;

use super::entry::{overlap_cmp, CidrEntry, Interval};

type Link<const W: usize> = Option<Box<Node<W>>>;

#[derive(Debug)]
struct Node<const W: usize> {
    entry: CidrEntry<W>,
    max_end: [u8; W],
    height: u8,
    left: Link<W>,
    right: Link<W>,
}

impl<const W: usize> Node<W> {
    fn leaf(entry: CidrEntry<W>) -> Box<Self> {
        Box::new(Self {
            max_end: *entry.end(),
            entry,
            height: 1,
            left: None,
            right: None,
        })
    }

    fn update(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
        let mut max_end = *self.entry.end();
        for child in [&self.left, &self.right].into_iter().flatten() {
            if child.max_end > max_end {
                max_end = child.max_end;
            }
        }
        self.max_end = max_end;
    }

    fn balance(&self) -> i16 {
        height(&self.left) as i16 - height(&self.right) as i16
    }
}

fn height<const W: usize>(link: &Link<W>) -> u8 {
    link.as_ref().map_or(0, |n| n.height)
}

/// Ordered container of CIDR entries of one address family.
#[derive(Debug, Default)]
pub struct IntervalIndex<const W: usize> {
    root: Link<W>,
    len: usize,
}

/// IPv4 interval index.
pub type V4Index = IntervalIndex<4>;

/// IPv6 interval index.
pub type V6Index = IntervalIndex<16>;

impl<const W: usize> IntervalIndex<W> {
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert an entry. Returns false if an identical entry was present.
    pub fn insert(&mut self, entry: CidrEntry<W>) -> bool {
        let (root, inserted) = insert_node(self.root.take(), entry);
        self.root = Some(root);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Remove the entry equal by `(prefix, label)`. Returns false if it
    /// was not present.
    pub fn remove(&mut self, entry: &CidrEntry<W>) -> bool {
        let (root, removed) = remove_node(self.root.take(), entry);
        self.root = root;
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Find the most specific entry covering `address`.
    pub fn find(&self, address: &[u8; W]) -> Option<&CidrEntry<W>> {
        let probe = Interval::point(*address);
        let mut best = None;
        stab(&self.root, &probe, &mut best);
        best
    }

    /// In-order iteration over stored entries.
    pub fn iter(&self) -> Iter<'_, W> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(&self.root);
        iter
    }

    #[cfg(test)]
    fn height(&self) -> u8 {
        height(&self.root)
    }
}

fn insert_node<const W: usize>(link: Link<W>, entry: CidrEntry<W>) -> (Box<Node<W>>, bool) {
    let mut node = match link {
        Some(node) => node,
        None => return (Node::leaf(entry), true),
    };
    let inserted = match entry.key_cmp(&node.entry) {
        Ordering::Less => {
            let (child, inserted) = insert_node(node.left.take(), entry);
            node.left = Some(child);
            inserted
        }
        Ordering::Greater => {
            let (child, inserted) = insert_node(node.right.take(), entry);
            node.right = Some(child);
            inserted
        }
        Ordering::Equal => return (node, false),
    };
    (rebalance(node), inserted)
}

fn remove_node<const W: usize>(link: Link<W>, entry: &CidrEntry<W>) -> (Link<W>, bool) {
    let mut node = match link {
        Some(node) => node,
        None => return (None, false),
    };
    let removed = match entry.key_cmp(&node.entry) {
        Ordering::Less => {
            let (child, removed) = remove_node(node.left.take(), entry);
            node.left = child;
            removed
        }
        Ordering::Greater => {
            let (child, removed) = remove_node(node.right.take(), entry);
            node.right = child;
            removed
        }
        Ordering::Equal => return (unlink(node), true),
    };
    (Some(rebalance(node)), removed)
}

/// Replace `node` by its successor, or by its single child.
fn unlink<const W: usize>(mut node: Box<Node<W>>) -> Link<W> {
    match (node.left.take(), node.right.take()) {
        (None, None) => None,
        (Some(child), None) | (None, Some(child)) => Some(child),
        (Some(left), Some(right)) => {
            let (rest, mut successor) = take_min(right);
            successor.left = Some(left);
            successor.right = rest;
            Some(rebalance(successor))
        }
    }
}

fn take_min<const W: usize>(mut node: Box<Node<W>>) -> (Link<W>, Box<Node<W>>) {
    match node.left.take() {
        None => (node.right.take(), node),
        Some(left) => {
            let (rest, min) = take_min(left);
            node.left = rest;
            (Some(rebalance(node)), min)
        }
    }
}

fn rebalance<const W: usize>(mut node: Box<Node<W>>) -> Box<Node<W>> {
    node.update();
    let balance = node.balance();
    if balance > 1 {
        if let Some(left) = node.left.take() {
            node.left = Some(if left.balance() < 0 {
                rotate_left(left)
            } else {
                left
            });
        }
        rotate_right(node)
    } else if balance < -1 {
        if let Some(right) = node.right.take() {
            node.right = Some(if right.balance() > 0 {
                rotate_right(right)
            } else {
                right
            });
        }
        rotate_left(node)
    } else {
        node
    }
}

fn rotate_right<const W: usize>(mut node: Box<Node<W>>) -> Box<Node<W>> {
    let mut pivot = match node.left.take() {
        Some(pivot) => pivot,
        None => return node,
    };
    node.left = pivot.right.take();
    node.update();
    pivot.right = Some(node);
    pivot.update();
    pivot
}

fn rotate_left<const W: usize>(mut node: Box<Node<W>>) -> Box<Node<W>> {
    let mut pivot = match node.right.take() {
        Some(pivot) => pivot,
        None => return node,
    };
    node.right = pivot.left.take();
    node.update();
    pivot.left = Some(node);
    pivot.update();
    pivot
}

/// Collect the most specific entry covering `probe` into `best`.
fn stab<'a, const W: usize>(
    link: &'a Link<W>,
    probe: &Interval<W>,
    best: &mut Option<&'a CidrEntry<W>>,
) {
    let node = match link {
        Some(node) => node,
        None => return,
    };
    if node.max_end < probe.start {
        return;
    }
    stab(&node.left, probe, best);
    match overlap_cmp(probe, node.entry.interval()) {
        // Everything to the right starts at or after this node.
        Ordering::Less => return,
        Ordering::Equal => {
            if best.map_or(true, |b| node.entry.more_specific_than(b)) {
                *best = Some(&node.entry);
            }
        }
        Ordering::Greater => {}
    }
    stab(&node.right, probe, best);
}

/// In-order iterator over an [`IntervalIndex`].
pub struct Iter<'a, const W: usize> {
    stack: Vec<&'a Node<W>>,
}

impl<'a, const W: usize> Iter<'a, W> {
    fn push_left(&mut self, mut link: &'a Link<W>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = &node.left;
        }
    }
}

impl<'a, const W: usize> Iterator for Iter<'a, W> {
    type Item = &'a CidrEntry<W>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(&node.right);
        Some(&node.entry)
    }
}
