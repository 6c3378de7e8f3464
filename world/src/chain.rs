//! Arena-backed doubly-linked chain of columns keyed by global X.

use std::sync::atomic::{AtomicU32, Ordering};

use clockrun_core::Side;
use thiserror::Error;

/// Handle of a node stored in a [`ColumnChain`].
///
/// Handles stay valid for the lifetime of the chain that issued them; splicing
/// never moves existing nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Node<T> {
    value: T,
    global_x: i32,
    previous: Option<NodeId>,
    next: Option<NodeId>,
}

/// Failures raised by chain navigation and splicing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// A chain needs at least one node.
    #[error("a column chain cannot be empty")]
    Empty,
    /// The requested X lies outside the buffered range.
    #[error("global x {global_x} lies outside the buffered range {leftmost}..={rightmost}")]
    OutOfRange {
        /// Requested coordinate.
        global_x: i32,
        /// Leftmost buffered coordinate.
        leftmost: i32,
        /// Rightmost buffered coordinate.
        rightmost: i32,
    },
    /// A spliced sub-chain does not continue the chain end it was attached to.
    #[error("sub-chain starting at {found} does not continue the chain at {expected}")]
    Discontiguous {
        /// Coordinate the sub-chain had to cover next to the chain end.
        expected: i32,
        /// Coordinate the sub-chain actually covers there.
        found: i32,
    },
    /// The arena cannot address any more nodes.
    #[error("column chain capacity exhausted")]
    CapacityExhausted,
}

/// Unbounded bidirectional sequence with exactly one node per global X.
///
/// Nodes live in an arena and link to their neighbours by [`NodeId`]. The
/// chain keeps a cursor at the last sought node so that queries with spatial
/// locality walk only a few links.
#[derive(Debug)]
pub struct ColumnChain<T> {
    nodes: Vec<Node<T>>,
    head: NodeId,
    tail: NodeId,
    cursor: AtomicU32,
}

impl<T: Clone> Clone for ColumnChain<T> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            head: self.head,
            tail: self.tail,
            cursor: AtomicU32::new(self.cursor.load(Ordering::Relaxed)),
        }
    }
}

impl<T> ColumnChain<T> {
    /// Builds a chain whose first value sits at `leftmost_x`.
    pub fn from_values<I>(leftmost_x: i32, values: I) -> Result<Self, ChainError>
    where
        I: IntoIterator<Item = T>,
    {
        let mut nodes: Vec<Node<T>> = Vec::new();
        for (offset, value) in values.into_iter().enumerate() {
            let id = node_id(offset)?;
            let global_x = i32::try_from(offset)
                .ok()
                .and_then(|offset| leftmost_x.checked_add(offset))
                .ok_or(ChainError::CapacityExhausted)?;
            if let Some(last) = nodes.last_mut() {
                last.next = Some(id);
            }
            let previous = offset.checked_sub(1).map(node_id).transpose()?;
            nodes.push(Node {
                value,
                global_x,
                previous,
                next: None,
            });
        }
        let tail = node_id(nodes.len().checked_sub(1).ok_or(ChainError::Empty)?)?;
        Ok(Self {
            nodes,
            head: NodeId(0),
            tail,
            cursor: AtomicU32::new(0),
        })
    }

    /// Number of nodes in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Chains are never empty; provided for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Leftmost node.
    #[must_use]
    pub const fn head(&self) -> NodeId {
        self.head
    }

    /// Rightmost node.
    #[must_use]
    pub const fn tail(&self) -> NodeId {
        self.tail
    }

    /// Node at the end of the chain facing `side`.
    #[must_use]
    pub const fn end(&self, side: Side) -> NodeId {
        match side {
            Side::Left => self.head,
            Side::Right => self.tail,
        }
    }

    /// Global X of the leftmost node.
    #[must_use]
    pub fn leftmost_x(&self) -> i32 {
        self.global_x(self.head)
    }

    /// Global X of the rightmost node.
    #[must_use]
    pub fn rightmost_x(&self) -> i32 {
        self.global_x(self.tail)
    }

    /// Whether the chain covers `global_x`.
    #[must_use]
    pub fn contains(&self, global_x: i32) -> bool {
        (self.leftmost_x()..=self.rightmost_x()).contains(&global_x)
    }

    /// Global X of a node.
    #[must_use]
    pub fn global_x(&self, id: NodeId) -> i32 {
        self.nodes[id.index()].global_x
    }

    /// Value stored at a node.
    #[must_use]
    pub fn get(&self, id: NodeId) -> &T {
        &self.nodes[id.index()].value
    }

    /// Mutable value stored at a node.
    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id.index()].value
    }

    /// Right neighbour of a node.
    #[must_use]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].next
    }

    /// Left neighbour of a node.
    #[must_use]
    pub fn previous(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].previous
    }

    /// Neighbour of a node on the provided side.
    #[must_use]
    pub fn neighbor(&self, id: NodeId, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.previous(id),
            Side::Right => self.next(id),
        }
    }

    /// Walks `offset` links from `id`, negative offsets walking left.
    #[must_use]
    pub fn step(&self, id: NodeId, offset: i32) -> Option<NodeId> {
        let side = if offset < 0 { Side::Left } else { Side::Right };
        let mut current = id;
        for _ in 0..offset.unsigned_abs() {
            current = self.neighbor(current, side)?;
        }
        Some(current)
    }

    /// Locates the node at `global_x` by walking from the cached cursor.
    pub fn seek(&self, global_x: i32) -> Result<NodeId, ChainError> {
        if !self.contains(global_x) {
            return Err(ChainError::OutOfRange {
                global_x,
                leftmost: self.leftmost_x(),
                rightmost: self.rightmost_x(),
            });
        }
        let start = NodeId(self.cursor.load(Ordering::Relaxed));
        let start = if start.index() < self.nodes.len() {
            start
        } else {
            self.head
        };
        let found = self
            .step(start, global_x - self.global_x(start))
            .ok_or(ChainError::OutOfRange {
                global_x,
                leftmost: self.leftmost_x(),
                rightmost: self.rightmost_x(),
            })?;
        self.cursor.store(found.0, Ordering::Relaxed);
        Ok(found)
    }

    /// Value at `global_x`.
    pub fn value_at(&self, global_x: i32) -> Result<&T, ChainError> {
        let id = self.seek(global_x)?;
        Ok(self.get(id))
    }

    /// Mutable value at `global_x`.
    pub fn value_at_mut(&mut self, global_x: i32) -> Result<&mut T, ChainError> {
        let id = self.seek(global_x)?;
        Ok(self.get_mut(id))
    }

    /// Node handles from head to tail.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(self.head), move |id| self.next(*id))
    }

    /// `(global_x, value)` pairs from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &T)> + '_ {
        self.ids().map(move |id| {
            let node = &self.nodes[id.index()];
            (node.global_x, &node.value)
        })
    }

    /// Values in arena order, for updates that do not care about X order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.nodes.iter_mut().map(|node| &mut node.value)
    }

    /// Whether every link advances global X by exactly one from head to tail.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        let mut visited = 1;
        let mut current = self.head;
        while let Some(next) = self.next(current) {
            if self.global_x(next) != self.global_x(current) + 1
                || self.previous(next) != Some(current)
            {
                return false;
            }
            visited += 1;
            current = next;
        }
        current == self.tail && visited == self.nodes.len()
    }

    /// Converts every value while preserving X positions and links.
    #[must_use]
    pub fn map<U, F>(&self, mut convert: F) -> ColumnChain<U>
    where
        F: FnMut(&T) -> U,
    {
        ColumnChain {
            nodes: self
                .nodes
                .iter()
                .map(|node| Node {
                    value: convert(&node.value),
                    global_x: node.global_x,
                    previous: node.previous,
                    next: node.next,
                })
                .collect(),
            head: self.head,
            tail: self.tail,
            cursor: AtomicU32::new(self.cursor.load(Ordering::Relaxed)),
        }
    }

    /// Attaches `sub` in front of the head; `sub` must end at `leftmost_x - 1`.
    pub fn splice_left(&mut self, sub: ColumnChain<T>) -> Result<(), ChainError> {
        let expected = self.leftmost_x() - 1;
        let found = sub.rightmost_x();
        if found != expected {
            return Err(ChainError::Discontiguous { expected, found });
        }
        let (sub_head, sub_tail) = self.adopt(sub)?;
        self.nodes[sub_tail.index()].next = Some(self.head);
        self.nodes[self.head.index()].previous = Some(sub_tail);
        self.head = sub_head;
        Ok(())
    }

    /// Attaches `sub` after the tail; `sub` must start at `rightmost_x + 1`.
    pub fn splice_right(&mut self, sub: ColumnChain<T>) -> Result<(), ChainError> {
        let expected = self.rightmost_x() + 1;
        let found = sub.leftmost_x();
        if found != expected {
            return Err(ChainError::Discontiguous { expected, found });
        }
        let (sub_head, sub_tail) = self.adopt(sub)?;
        self.nodes[sub_head.index()].previous = Some(self.tail);
        self.nodes[self.tail.index()].next = Some(sub_head);
        self.tail = sub_tail;
        Ok(())
    }

    /// Attaches `sub` on the provided side.
    pub fn splice(&mut self, side: Side, sub: ColumnChain<T>) -> Result<(), ChainError> {
        match side {
            Side::Left => self.splice_left(sub),
            Side::Right => self.splice_right(sub),
        }
    }

    fn adopt(&mut self, sub: ColumnChain<T>) -> Result<(NodeId, NodeId), ChainError> {
        let offset = u32::try_from(self.nodes.len()).map_err(|_| ChainError::CapacityExhausted)?;
        let _ = node_id(self.nodes.len() + sub.nodes.len())?;
        let shift = |id: NodeId| NodeId(id.0 + offset);
        let head = shift(sub.head);
        let tail = shift(sub.tail);
        self.nodes.extend(sub.nodes.into_iter().map(|node| Node {
            value: node.value,
            global_x: node.global_x,
            previous: node.previous.map(shift),
            next: node.next.map(shift),
        }));
        Ok((head, tail))
    }
}

impl<T: Clone> ColumnChain<T> {
    /// Deep-copies up to `count` nodes starting at `from_x` and walking toward `direction`.
    ///
    /// The copy is clipped at the chain end and shares nothing with `self`.
    pub fn clone_range(
        &self,
        from_x: i32,
        count: usize,
        direction: Side,
    ) -> Result<Self, ChainError> {
        let start = self.seek(from_x)?;
        let mut ids: Vec<NodeId> = std::iter::successors(Some(start), |id| {
            self.neighbor(*id, direction)
        })
        .take(count)
        .collect();
        if direction == Side::Left {
            ids.reverse();
        }
        let leftmost = match ids.first() {
            Some(id) => self.global_x(*id),
            None => return Err(ChainError::Empty),
        };
        Self::from_values(leftmost, ids.into_iter().map(|id| self.get(id).clone()))
    }

    /// Values from head to tail.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().map(|(_, value)| value.clone()).collect()
    }
}

fn node_id(index: usize) -> Result<NodeId, ChainError> {
    u32::try_from(index)
        .map(NodeId)
        .map_err(|_| ChainError::CapacityExhausted)
}
