//! Fixed capacity rolling history that overwrites its oldest slot.

/// Ring buffer of `N` slots, initially filled with `T::default()`.
///
/// Every insert overwrites the slot under the write cursor and moves the
/// cursor forward by one, wrapping at `N`. Nothing is ever reallocated.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    slots: [T; N],
    cursor: usize,
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    const NOT_EMPTY: () = assert!(N > 0, "ring buffer needs at least one slot");

    pub fn new() -> Self {
        let () = Self::NOT_EMPTY;
        Self {
            slots: [T::default(); N],
            cursor: 0,
        }
    }

    pub fn insert(&mut self, value: T) {
        self.slots[self.cursor] = value;
        self.cursor = (self.cursor + 1) % N;
    }

    /// Slot at an absolute index, taken modulo the capacity.
    pub fn at(&self, index: usize) -> T {
        self.slots[index % N]
    }

    /// Value written `lag` inserts ago: `lagged(1)` is the newest slot,
    /// `lagged(N)` the oldest one, the next to be overwritten.
    pub fn lagged(&self, lag: usize) -> T {
        self.slots[(self.cursor + N - lag % N) % N]
    }

    pub fn newest(&self) -> T {
        self.lagged(1)
    }

    /// Index of the slot the next insert will overwrite.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Raw slots in storage order.
    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }

    /// Slots from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (newer, older) = self.slots.split_at(self.cursor);
        older.iter().chain(newer.iter())
    }
}
