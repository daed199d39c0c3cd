//! # Ready Ring
//!
//! Circular round-robin order over the TCB pool. The ring is an arena
//! ring: threads are identified by their pool index and the successor of
//! each one is kept in a separate array, so advancing is a single load.
//!
//! ```text
//!   next: [1, 2, 3, 0]      current: 2
//!
//!   ┌──► 0 ──► 1 ──► 2 ──► 3 ──┐
//!   └──────────────────────────┘
//! ```

/// Round-robin succession order and the currently running thread.
pub struct ReadyRing<const N: usize> {
    next: [usize; N],
    len: usize,
    current: usize,
}

impl<const N: usize> ReadyRing<N> {
    pub const fn new() -> Self {
        Self {
            next: [0; N],
            len: 0,
            current: 0,
        }
    }

    /// Close the ring over pool slots `0..count` in registration order and
    /// place the cursor on slot 0.
    ///
    /// The caller guarantees `1 <= count <= N`.
    pub fn link(&mut self, count: usize) {
        debug_assert!(count >= 1 && count <= N);
        for i in 0..count {
            self.next[i] = (i + 1) % count;
        }
        self.len = count;
        self.current = 0;
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.len = 0;
        self.current = 0;
    }

    /// Move the cursor to the successor of the current thread and return it.
    #[inline]
    pub fn advance(&mut self) -> usize {
        self.current = self.next[self.current];
        self.current
    }

    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    /// Successor of `index` in the ring.
    #[inline]
    pub fn next_of(&self, index: usize) -> usize {
        self.next[index]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every thread once, starting at the cursor, in scheduling order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let mut at = self.current;
        (0..self.len).map(move |_| {
            let index = at;
            at = self.next[at];
            index
        })
    }

    /// Walking `len` links from slot 0 visits each slot exactly once and
    /// ends back at slot 0.
    pub fn is_closed(&self) -> bool {
        if self.len == 0 {
            return false;
        }
        let mut seen = [false; N];
        let mut at = 0;
        for _ in 0..self.len {
            if at >= self.len || seen[at] {
                return false;
            }
            seen[at] = true;
            at = self.next[at];
        }
        at == 0
    }
}
