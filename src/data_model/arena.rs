//! Typed slot arenas backing the entity graph.
//!
//! A [`Handle`] is an index plus the generation of the slot at the time the
//! entity was inserted. Freeing a slot bumps its generation, so handles kept
//! across a destroy no longer resolve.

use core::{fmt, hash::Hash, marker::PhantomData};

pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls, the derives would require `T: Clone` etc.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32 },
}

pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    capacity: usize,
}

impl<T> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `None` when the arena is at capacity
    pub fn insert(&mut self, value: T) -> Option<Handle<T>> {
        if self.len >= self.capacity {
            return None;
        }
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                let generation = match &*slot {
                    Slot::Vacant { generation } => *generation,
                    // the free list only holds vacant slots
                    Slot::Occupied { .. } => return None,
                };
                *slot = Slot::Occupied { generation, value };
                Handle::new(index, generation)
            }
            None => {
                let index = u32::try_from(self.slots.len()).ok()?;
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    value,
                });
                Handle::new(index, 0)
            }
        };
        self.len += 1;
        Some(handle)
    }

    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        let generation = match &*slot {
            Slot::Occupied { generation, .. } if *generation == handle.generation => *generation,
            _ => return None,
        };
        let next = Slot::Vacant {
            generation: generation.wrapping_add(1),
        };
        let Slot::Occupied { value, .. } = core::mem::replace(slot, next) else {
            return None;
        };
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        match self.slots.get(handle.index as usize)? {
            Slot::Occupied { generation, value } if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        match self.slots.get_mut(handle.index as usize)? {
            Slot::Occupied { generation, value } if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let generation = match &*slot {
                Slot::Occupied { generation, .. } => *generation,
                Slot::Vacant { .. } => continue,
            };
            *slot = Slot::Vacant {
                generation: generation.wrapping_add(1),
            };
            self.free.push(index as u32);
        }
        self.len = 0;
    }
}
