use crate::error::ContainerErrors;
use crate::slot::Slot;

/// Dense slot map with an indirection table.
///
/// Data lives contiguously in `data`; `slots` maps an external slot id to the data index and
/// owns the generation. Removal swaps the removed element with the last one and patches the
/// indirection of the moved element, keeping get/insert/remove O(1).
#[derive(Debug)]
pub struct SlotMap<T> {
    /// Stored values paired with the id of the slot that points at them
    data: Vec<(T, usize)>,
    /// Indirection: `slots[id]` holds the data index and current generation
    slots: Vec<Slot<T>>,
    free_list: Vec<usize>,
}

impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }
}

impl<T> SlotMap<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
        }
    }

    pub fn insert(&mut self, element: T) -> Slot<T> {
        let data_index = self.data.len();
        let (id, generation) = match self.free_list.pop() {
            Some(id) => {
                let generation = self.slots[id].generation();
                self.slots[id] = Slot::new(data_index, generation);
                (id, generation)
            }
            None => {
                self.slots.push(Slot::new(data_index, 0));
                (self.slots.len() - 1, 0)
            }
        };
        self.data.push((element, id));
        Slot::new(id, generation)
    }

    /// Resolve a slot into its data index, checking the generation
    fn resolve(&self, slot: &Slot<T>) -> Result<usize, ContainerErrors> {
        let proxy = self
            .slots
            .get(slot.id())
            .ok_or(ContainerErrors::NonexistentSlot)?;
        if proxy.generation() != slot.generation() {
            return Err(ContainerErrors::GenerationMismatch);
        }
        Ok(proxy.id())
    }

    pub fn contains(&self, slot: &Slot<T>) -> bool {
        self.resolve(slot).is_ok()
    }

    pub fn get(&self, slot: &Slot<T>) -> Result<&T, ContainerErrors> {
        let index = self.resolve(slot)?;
        Ok(&self.data[index].0)
    }

    pub fn get_mut(&mut self, slot: &Slot<T>) -> Result<&mut T, ContainerErrors> {
        let index = self.resolve(slot)?;
        Ok(&mut self.data[index].0)
    }

    pub fn remove(&mut self, slot: Slot<T>) -> Result<T, ContainerErrors> {
        let index = self.resolve(&slot)?;
        let proxy = &mut self.slots[slot.id()];
        *proxy = Slot::new(proxy.id(), proxy.generation() + 1);

        let (element, _) = self.data.swap_remove(index);
        // the former last element now lives at `index`
        if let Some((_, moved_id)) = self.data.get(index) {
            let moved = &mut self.slots[*moved_id];
            *moved = Slot::new(index, moved.generation());
        }
        self.free_list.push(slot.id());
        Ok(element)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot<T>, &T)> {
        self.data
            .iter()
            .map(|(element, id)| (Slot::new(*id, self.slots[*id].generation()), element))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.data.iter_mut().map(|(element, _)| element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut slot_map = SlotMap::default();
        let slot = slot_map.insert(42);
        assert_eq!(slot_map.get(&slot), Ok(&42));
    }

    #[test]
    fn test_remove_then_get_fails() {
        let mut slot_map = SlotMap::default();
        let slot = slot_map.insert(42);
        assert_eq!(slot_map.remove(slot), Ok(42));
        assert_eq!(slot_map.get(&slot), Err(ContainerErrors::GenerationMismatch));
        assert!(!slot_map.contains(&slot));
    }

    #[test]
    fn test_reuse_bumps_generation() {
        let mut slot_map = SlotMap::default();
        let slot1 = slot_map.insert(1);
        let slot2 = slot_map.insert(2);
        slot_map.remove(slot1).unwrap();
        let slot3 = slot_map.insert(3);

        assert_eq!(slot3.id(), slot1.id());
        assert_eq!(slot3.generation(), slot1.generation() + 1);
        assert_eq!(slot_map.get(&slot2), Ok(&2));
        assert_eq!(slot_map.get(&slot3), Ok(&3));
        assert!(slot_map.get(&slot1).is_err());
    }

    #[test]
    fn test_swap_remove_keeps_moved_element_reachable() {
        let mut slot_map = SlotMap::default();
        let slots: Vec<_> = (0..4).map(|i| slot_map.insert(i)).collect();
        slot_map.remove(slots[0]).unwrap();
        // slots[3] was moved into index 0
        assert_eq!(slot_map.get(&slots[3]), Ok(&3));
        assert_eq!(slot_map.get(&slots[1]), Ok(&1));
        assert_eq!(slot_map.len(), 3);
    }

    #[test]
    fn test_nonexistent_slot() {
        let mut slot_map: SlotMap<i32> = SlotMap::default();
        let invalid_slot = Slot::new(999, 0);
        assert_eq!(slot_map.remove(invalid_slot), Err(ContainerErrors::NonexistentSlot));
    }

    #[test]
    fn test_double_remove() {
        let mut slot_map = SlotMap::default();
        let slot = slot_map.insert(42);
        slot_map.remove(slot).unwrap();
        assert_eq!(slot_map.remove(slot), Err(ContainerErrors::GenerationMismatch));
    }

    #[test]
    fn test_get_mut_and_iter() {
        let mut slot_map = SlotMap::default();
        let a = slot_map.insert(1);
        let _ = slot_map.insert(2);
        *slot_map.get_mut(&a).unwrap() = 10;
        for value in slot_map.values_mut() {
            *value *= 2;
        }
        let mut collected: Vec<_> = slot_map.iter().map(|(_, value)| *value).collect();
        collected.sort();
        assert_eq!(collected, vec![4, 20]);
        let (slot, _) = slot_map.iter().find(|(_, v)| **v == 20).unwrap();
        assert_eq!(slot, a);
    }

    #[test]
    fn test_large_number_of_elements() {
        let mut slot_map = SlotMap::with_capacity(1000);
        let slots: Vec<_> = (0..1000usize).map(|i| slot_map.insert(i)).collect();
        for i in (0..1000).step_by(2) {
            slot_map.remove(slots[i]).unwrap();
        }
        for i in 0..1000 {
            if i % 2 == 0 {
                assert!(slot_map.get(&slots[i]).is_err());
            } else {
                assert_eq!(slot_map.get(&slots[i]), Ok(&i));
            }
        }
    }
}
