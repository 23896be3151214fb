//! The slot registry.

use weft_core::ActivityId;

use crate::config::RegistryConfig;
use crate::error::ArenaError;

/// Outcome of [`Registry::release`].
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub enum Release<T> {
    /// Other owners remain.
    Retained {
        /// Owners left after this release.
        remaining: u32,
    },
    /// This was the last owner. The slot is gone and the value is handed
    /// back for finalization.
    Last(T),
}

struct Entry<T> {
    value: T,
    refcount: u32,
}

struct Slot<T> {
    generation: u32,
    entry: Option<Entry<T>>,
}

/// Generation-checked slot map with per-entry owner counts.
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: u32,
    max_live: u32,
}

impl<T> Registry<T> {
    /// Create an empty registry.
    pub fn new(config: &RegistryConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        Ok(Self {
            slots: Vec::with_capacity(config.initial_capacity),
            free: Vec::new(),
            live: 0,
            max_live: config.max_live,
        })
    }

    /// Store `value` with a single owner and return its id.
    pub fn insert(&mut self, value: T) -> Result<ActivityId, ArenaError> {
        if self.live >= self.max_live {
            return Err(ArenaError::CapacityExceeded {
                max_live: self.max_live,
            });
        }
        let entry = Entry { value, refcount: 1 };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].entry = Some(entry);
                index
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                index
            }
        };
        self.live += 1;
        Ok(ActivityId::new(index, self.slots[index as usize].generation))
    }

    fn entry(&self, id: ActivityId) -> Result<&Entry<T>, ArenaError> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(ArenaError::StaleHandle { id })
    }

    fn entry_mut(&mut self, id: ActivityId) -> Result<&mut Entry<T>, ArenaError> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.entry.as_mut())
            .ok_or(ArenaError::StaleHandle { id })
    }

    /// Register one more owner. Returns the new owner count.
    pub fn acquire(&mut self, id: ActivityId) -> Result<u32, ArenaError> {
        let entry = self.entry_mut(id)?;
        entry.refcount = entry
            .refcount
            .checked_add(1)
            .ok_or(ArenaError::RefcountOverflow { id })?;
        Ok(entry.refcount)
    }

    /// Drop one owner.
    ///
    /// On the 1 → 0 transition the slot is vacated, its generation
    /// bumped, and the value returned in [`Release::Last`]. Any further
    /// release with the same id fails with [`ArenaError::StaleHandle`].
    pub fn release(&mut self, id: ActivityId) -> Result<Release<T>, ArenaError> {
        let entry = self.entry_mut(id)?;
        entry.refcount -= 1;
        if entry.refcount > 0 {
            return Ok(Release::Retained {
                remaining: entry.refcount,
            });
        }
        let slot = &mut self.slots[id.index() as usize];
        let entry = slot.entry.take().ok_or(ArenaError::StaleHandle { id })?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.live -= 1;
        Ok(Release::Last(entry.value))
    }

    /// Shared access to a live entry.
    pub fn get(&self, id: ActivityId) -> Result<&T, ArenaError> {
        self.entry(id).map(|e| &e.value)
    }

    /// Exclusive access to a live entry.
    pub fn get_mut(&mut self, id: ActivityId) -> Result<&mut T, ArenaError> {
        self.entry_mut(id).map(|e| &mut e.value)
    }

    /// Current owner count of a live entry.
    pub fn refcount(&self, id: ActivityId) -> Result<u32, ArenaError> {
        self.entry(id).map(|e| e.refcount)
    }

    /// Whether `id` refers to a live entry.
    pub fn contains(&self, id: ActivityId) -> bool {
        self.entry(id).is_ok()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live as usize
    }

    /// Whether no entry is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ActivityId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry
                .as_ref()
                .map(|e| (ActivityId::new(index as u32, slot.generation), &e.value))
        })
    }

    /// Ids of the live entries in slot order.
    pub fn ids(&self) -> Vec<ActivityId> {
        self.iter().map(|(id, _)| id).collect()
    }
}
