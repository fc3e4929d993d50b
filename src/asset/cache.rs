use super::Handle;

struct Slot<T> {
    generation: u32,
    item: Option<T>,
}

/// Slot storage with free-list reuse and generation-checked handles.
pub struct AssetCache<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> AssetCache<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn insert(&mut self, item: T) -> Handle<T> {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.item = Some(item);
            return Handle::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            item: Some(item),
        });
        Handle::new(index, 0)
    }

    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let item = slot.item.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        self.live -= 1;
        Some(item)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.item.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.item.as_mut())
    }

    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.free.clear();
        self.live = 0;
        self.slots.drain(..).filter_map(|slot| slot.item)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_handle_does_not_resolve_after_reuse() {
        let mut cache = AssetCache::new();
        let first = cache.insert("a");
        assert_eq!(cache.remove(first), Some("a"));

        let second = cache.insert("b");
        assert_eq!(second.index(), first.index());
        assert!(cache.get(first).is_none());
        assert_eq!(cache.get(second), Some(&"b"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn double_remove_is_none() {
        let mut cache = AssetCache::new();
        let h = cache.insert(1);
        assert!(cache.remove(h).is_some());
        assert!(cache.remove(h).is_none());
        assert!(cache.is_empty());
    }
}
