use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use allocative::Allocative;

use crate::binary_tree::{BinaryTree, NodeHandle};
use crate::condition::{Condition, Operator};
use crate::data_type::DataType;
use crate::error::{DbError, Result};
use crate::value::Value;

/// The set of row offsets sharing one indexed value.
pub type Bucket = BTreeSet<usize>;

/// Operators an index can answer by walking its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl TryFrom<Operator> for RangeOp {
    type Error = DbError;

    fn try_from(op: Operator) -> Result<Self> {
        match op {
            Operator::Eq => Ok(Self::Eq),
            Operator::Ne => Ok(Self::Ne),
            Operator::Gt => Ok(Self::Gt),
            Operator::Ge => Ok(Self::Ge),
            Operator::Lt => Ok(Self::Lt),
            Operator::Le => Ok(Self::Le),
            Operator::Like => Err(DbError::OperatorUnsupported(op.to_string())),
        }
    }
}

/// Secondary index on one column: a binary tree from column value to the
/// [Bucket] of offsets holding that value.
///
/// No bucket is ever empty; removing the last offset of a value removes its node.
#[derive(Debug, Allocative)]
pub struct Index {
    column: String,
    data_type: DataType,
    tree: BinaryTree<Value, Bucket>,
}

impl Index {
    pub fn new(column: impl Into<String>, data_type: DataType) -> Self {
        Self {
            column: column.into(),
            data_type,
            tree: BinaryTree::new(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of distinct indexed values.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Longest root-to-leaf path of the underlying tree.
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    #[cfg(test)]
    pub fn bucket(&self, value: &Value) -> Option<&Bucket> {
        self.tree.get(value)
    }

    /// Bulk-loads the index from `(offset, value)` pairs, one bucket per
    /// distinct value.
    pub fn fill(&mut self, rows: impl IntoIterator<Item = (usize, Value)>) {
        let mut buckets: BTreeMap<Value, Bucket> = BTreeMap::new();
        for (offset, value) in rows {
            buckets.entry(value).or_default().insert(offset);
        }
        self.tree.fill(buckets.into_iter().collect());
    }

    pub fn add(&mut self, value: Value, offset: usize) {
        match self.tree.find_mut(&value) {
            Some(bucket) => {
                bucket.insert(offset);
            }
            None => self.tree.insert(value, Bucket::from([offset])),
        }
    }

    pub fn remove(&mut self, value: &Value, offset: usize) {
        let Some(handle) = self.tree.find(value) else {
            return;
        };

        let bucket = self.tree.payload_mut(handle);
        bucket.remove(&offset);
        if bucket.is_empty() {
            self.tree.remove(value);
        }
    }

    /// Resolves `condition`'s own predicate (its sub-clauses are ignored) to the
    /// offsets whose indexed value satisfies it.
    ///
    /// The walk descends from the root towards the literal. At each node passed on
    /// the way, every subtree lying entirely inside the requested range is taken
    /// whole, together with the node's own bucket when it qualifies.
    ///
    /// # Errors
    /// Returns [DbError::OperatorUnsupported] for `LIKE`.
    pub fn cursor(&self, condition: &Condition) -> Result<Bucket> {
        let op = RangeOp::try_from(condition.operator)?;
        let literal = &condition.value;

        let mut offsets = Bucket::new();
        let mut current = self.tree.root();
        while let Some(handle) = current {
            let node = self.tree.node(handle);
            let bucket = node.payload();

            match literal.cmp(node.key()) {
                Ordering::Equal => {
                    match op {
                        RangeOp::Eq => offsets.extend(bucket),
                        RangeOp::Ne => {
                            self.collect(node.left(), &mut offsets);
                            self.collect(node.right(), &mut offsets);
                        }
                        RangeOp::Gt => self.collect(node.right(), &mut offsets),
                        RangeOp::Ge => {
                            offsets.extend(bucket);
                            self.collect(node.right(), &mut offsets);
                        }
                        RangeOp::Lt => self.collect(node.left(), &mut offsets),
                        RangeOp::Le => {
                            offsets.extend(bucket);
                            self.collect(node.left(), &mut offsets);
                        }
                    }
                    break;
                }
                // Everything at and right of this node is above the literal.
                Ordering::Less => {
                    if matches!(op, RangeOp::Gt | RangeOp::Ge | RangeOp::Ne) {
                        offsets.extend(bucket);
                        self.collect(node.right(), &mut offsets);
                    }
                    current = node.left();
                }
                // Everything at and left of this node is below the literal.
                Ordering::Greater => {
                    if matches!(op, RangeOp::Lt | RangeOp::Le | RangeOp::Ne) {
                        offsets.extend(bucket);
                        self.collect(node.left(), &mut offsets);
                    }
                    current = node.right();
                }
            }
        }

        Ok(offsets)
    }

    /// Unions every bucket under `handle`.
    fn collect(&self, handle: Option<NodeHandle>, offsets: &mut Bucket) {
        for node in self.tree.subtree(handle) {
            offsets.extend(node.payload());
        }
    }
}
