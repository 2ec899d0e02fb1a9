use bitvec::prelude::*;

use crate::error::{DbError, Result};

/// Forward-only, single-pass walk over the live offsets of a table.
///
/// The cursor covers the half-open range `[start, end)` and skips every position
/// set in its copy of the tombstone bitmap. It does not see mutations made after
/// it was created, and it cannot be rewound: ask the table for a new one instead.
#[derive(Debug, Clone)]
pub struct TableCursor {
    position: usize,
    end: usize,
    tombstones: BitVec,
}

impl TableCursor {
    pub fn new(start: usize, end: usize, tombstones: BitVec) -> Self {
        let mut cursor = Self {
            position: start,
            end,
            tombstones,
        };
        cursor.skip_tombstones();
        cursor
    }

    /// Returns `true` once every live offset has been handed out.
    pub fn end(&self) -> bool {
        self.position >= self.end
    }

    /// Returns the current live offset and moves past it.
    ///
    /// # Errors
    /// Returns [DbError::Consistency] when called on an exhausted cursor.
    pub fn advance(&mut self) -> Result<usize> {
        if self.end() {
            return Err(DbError::Consistency(
                "table cursor has reached the end".into(),
            ));
        }

        let current = self.position;
        self.position += 1;
        self.skip_tombstones();
        Ok(current)
    }

    fn skip_tombstones(&mut self) {
        while self.position < self.end
            && self.tombstones.get(self.position).is_some_and(|dead| *dead)
        {
            self.position += 1;
        }
    }
}

impl Iterator for TableCursor {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.advance().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_tombstones() {
        // Six slots, 3 and 4 deleted
        let mut cursor = TableCursor::new(0, 6, bitvec![0, 0, 0, 1, 1, 0]);

        assert!(!cursor.end());
        assert_eq!(cursor.advance(), Ok(0));
        assert_eq!(cursor.advance(), Ok(1));
        assert_eq!(cursor.advance(), Ok(2));

        assert!(!cursor.end());
        assert_eq!(cursor.advance(), Ok(5));

        assert!(cursor.end());
    }

    #[test]
    fn test_leading_and_trailing_tombstones() {
        let cursor = TableCursor::new(0, 5, bitvec![1, 1, 0, 1, 1]);

        assert_eq!(cursor.collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_empty() {
        let cursor = TableCursor::new(0, 0, BitVec::new());

        assert!(cursor.end());
    }

    #[test]
    fn test_all_deleted() {
        let cursor = TableCursor::new(0, 3, bitvec![1, 1, 1]);

        assert!(cursor.end());
    }

    #[test]
    fn test_advance_after_end_fails() {
        let mut cursor = TableCursor::new(0, 1, bitvec![0]);

        assert_eq!(cursor.advance(), Ok(0));
        assert!(matches!(cursor.advance(), Err(DbError::Consistency(_))));
        assert_eq!(cursor.next(), None);
    }
}
