use crate::error::ContainerErrors;

/// A ring of bounded queues, one per buffering slot.
///
/// Items are pushed into the current slot. [`SlotRing::advance`] moves to the next slot and
/// hands back everything that slot accumulated during its previous turn. The caller decides
/// when it is safe to advance (typically after a fence for that slot has signalled).
#[derive(Debug)]
pub struct SlotRing<T> {
    slots: Vec<Vec<T>>,
    capacity: usize,
    current: usize,
}

impl<T> SlotRing<T> {
    /// `slot_count` must be non-zero
    pub fn new(slot_count: usize, capacity: usize) -> Self {
        Self {
            slots: (0..slot_count.max(1)).map(|_| Vec::new()).collect(),
            capacity,
            current: 0,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Index of the slot [`Self::advance`] will move to
    pub fn next_index(&self) -> usize {
        (self.current + 1) % self.slots.len()
    }

    pub fn push(&mut self, item: T) -> Result<(), ContainerErrors> {
        let queue = &mut self.slots[self.current];
        if queue.len() >= self.capacity {
            return Err(ContainerErrors::QueueFull(self.capacity));
        }
        queue.push(item);
        Ok(())
    }

    /// Number of items waiting in `slot`
    pub fn pending(&self, slot: usize) -> usize {
        self.slots.get(slot).map_or(0, Vec::len)
    }

    /// Move to the next slot and return the items it queued during its previous turn
    pub fn advance(&mut self) -> Vec<T> {
        self.current = self.next_index();
        std::mem::take(&mut self.slots[self.current])
    }

    /// Take every queued item from every slot, oldest slot first
    pub fn drain_all(&mut self) -> Vec<T> {
        let count = self.slots.len();
        let mut items = Vec::new();
        for offset in 1..=count {
            let index = (self.current + offset) % count;
            items.append(&mut self.slots[index]);
        }
        items
    }
}
