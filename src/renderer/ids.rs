use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Opaque identifier of one drawable (a batch head or a single instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues monotonically increasing ids starting at 1.
///
/// Clones share the same counter, so several registries built from clones of
/// one allocator never hand out the same id.
#[derive(Debug, Clone)]
pub struct IdentityAllocator {
    next: Rc<Cell<u64>>,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Values below 1 are raised to 1.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Rc::new(Cell::new(first.max(1))),
        }
    }

    pub fn allocate(&self) -> ObjectId {
        let id = self.next.get();
        self.next.set(id + 1);
        ObjectId(id)
    }

    pub fn peek(&self) -> u64 {
        self.next.get()
    }
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_id_is_one() {
        let alloc = IdentityAllocator::new();
        assert_eq!(alloc.allocate().get(), 1);
        assert_eq!(alloc.allocate().get(), 2);
    }

    #[test]
    fn clones_share_counter() {
        let a = IdentityAllocator::new();
        let b = a.clone();
        let first = a.allocate();
        let second = b.allocate();
        assert!(second > first);
        assert_eq!(a.peek(), 3);
    }

    #[test]
    fn independent_allocators_do_not_interfere() {
        let a = IdentityAllocator::new();
        let b = IdentityAllocator::new();
        a.allocate();
        a.allocate();
        assert_eq!(b.allocate().get(), 1);
    }

    #[test]
    fn starting_at_zero_is_raised() {
        let alloc = IdentityAllocator::starting_at(0);
        assert_eq!(alloc.allocate().get(), 1);
        let alloc = IdentityAllocator::starting_at(100);
        assert_eq!(alloc.allocate().get(), 100);
    }
}
