//! Slot types shared by the counting and multi-indexed filters.

/// Saturating 8-bit counter of a [`CountingBloomFilter`](super::CountingBloomFilter).
///
/// Once a counter reaches [`Counter::MAX`] it is saturated: further
/// increments are absorbed and decrements no longer move it, since the true
/// count is unknown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Counter(u8);

impl Counter {
    pub const MAX: u8 = u8::MAX;

    #[inline(always)]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    #[inline(always)]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn is_saturated(self) -> bool {
        self.0 == Self::MAX
    }

    #[inline(always)]
    pub fn increment(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    /// Decrement unless empty or saturated.
    #[inline(always)]
    pub fn decrement(&mut self) {
        if self.0 != 0 && !self.is_saturated() {
            self.0 -= 1;
        }
    }
}

/// Outcome of writing an id into an [`IdCell`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdWrite {
    /// The slot was empty and now holds the id.
    Stored,
    /// The slot already held the same id.
    Unchanged,
    /// The slot held a different id and is now flagged as saturated.
    Saturated,
}

/// One slot of a multi-indexed filter's id array.
///
/// The low 15 bits carry the id (`0` means empty), the top bit flags a slot
/// claimed by more than one id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct IdCell(u16);

impl IdCell {
    pub const SATURATION_MASK: u16 = 0x8000;
    pub const ID_MASK: u16 = !Self::SATURATION_MASK;

    #[inline(always)]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline(always)]
    pub const fn id(self) -> u16 {
        self.0 & Self::ID_MASK
    }

    #[inline(always)]
    pub const fn is_empty(self) -> bool {
        self.id() == 0
    }

    #[inline(always)]
    pub const fn is_saturated(self) -> bool {
        self.0 & Self::SATURATION_MASK != 0
    }

    #[inline(always)]
    pub fn saturate(&mut self) {
        self.0 |= Self::SATURATION_MASK;
    }

    /// Claim the slot for `id`. A slot is never overwritten: a collision
    /// with a different id only raises the saturation flag.
    pub fn record(&mut self, id: u16) -> IdWrite {
        debug_assert!(id != 0 && id <= Self::ID_MASK);
        if self.is_empty() {
            self.0 = (self.0 & Self::SATURATION_MASK) | id;
            IdWrite::Stored
        } else if self.id() == id {
            IdWrite::Unchanged
        } else {
            self.saturate();
            IdWrite::Saturated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_saturates_and_sticks() {
        let mut c = Counter::default();
        for _ in 0..300 {
            c.increment();
        }
        assert_eq!(c.get(), 255);
        assert!(c.is_saturated());
        c.decrement();
        assert_eq!(c.get(), 255);

        let mut c = Counter::new(1);
        c.decrement();
        c.decrement();
        assert_eq!(c.get(), 0);
    }

    #[test]
    fn id_cell_records_first_id_only() {
        let mut cell = IdCell::default();
        assert!(cell.is_empty());
        assert_eq!(cell.record(7), IdWrite::Stored);
        assert_eq!(cell.record(7), IdWrite::Unchanged);
        assert!(!cell.is_saturated());
        assert_eq!(cell.record(9), IdWrite::Saturated);
        assert!(cell.is_saturated());
        assert_eq!(cell.id(), 7);
        assert_eq!(cell.raw(), 0x8007);
        assert_eq!(cell.record(7), IdWrite::Unchanged);
    }

    #[test]
    fn id_masks_partition_the_word() {
        assert_eq!(IdCell::ID_MASK, 0x7FFF);
        assert_eq!(IdCell::ID_MASK & IdCell::SATURATION_MASK, 0);
        assert_eq!(IdCell::ID_MASK | IdCell::SATURATION_MASK, u16::MAX);
    }
}
