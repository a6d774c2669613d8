//! Generation-checked slot table
//!
//! Owns values under stable `(index, generation)` ids. A released slot bumps
//! its generation, so ids held after removal never reach a later occupant.
//!
//! A value can be checked out for the duration of a call and checked back
//! in. Removing a checked-out value is deferred: the slot is marked doomed
//! and the value is handed back for destruction at check-in.

use mio::Token;

// Tokens pack a 32-bit generation above a 32-bit index
#[cfg(not(target_pointer_width = "64"))]
compile_error!("kvs requires a 64-bit target");

/// Stable id of a slot occupant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId {
    index: u32,
    generation: u32,
}

impl HandlerId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Poll token carrying this id
    pub fn token(self) -> Token {
        Token(((u64::from(self.generation) << 32) | u64::from(self.index)) as usize)
    }

    pub fn from_token(token: Token) -> Self {
        let raw = token.0 as u64;
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

#[derive(Debug)]
enum State<T> {
    Vacant,
    /// Id handed out, value not yet stored
    Reserved,
    Occupied(T),
    CheckedOut { doomed: bool },
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    state: State<T>,
}

/// Outcome of [`SlotTable::remove`]
#[derive(Debug)]
pub enum Removal<T> {
    /// The value was present and is returned for destruction
    Removed(T),
    /// The value is checked out; it will be returned by `checkin`
    Deferred,
    /// Stale or unknown id
    Missing,
}

#[derive(Debug)]
pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotTable<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Occupied, reserved or checked-out slots
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Allocate an id without storing a value yet
    pub fn reserve(&mut self) -> HandlerId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = State::Reserved;
            return HandlerId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state: State::Reserved,
        });
        HandlerId {
            index,
            generation: 0,
        }
    }

    /// Store a value in a reserved slot; returns the value back if the id is
    /// not reserved
    pub fn fill(&mut self, id: HandlerId, value: T) -> Result<(), T> {
        match self.slot_mut(id) {
            Some(slot) if matches!(slot.state, State::Reserved) => {
                slot.state = State::Occupied(value);
                Ok(())
            }
            _ => Err(value),
        }
    }

    pub fn insert(&mut self, value: T) -> HandlerId {
        let id = self.reserve();
        if let Some(slot) = self.slot_mut(id) {
            slot.state = State::Occupied(value);
        }
        id
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.slot(id)
            .map(|slot| !matches!(slot.state, State::Vacant))
            .unwrap_or(false)
    }

    /// Take the value out for a call; the slot stays allocated
    pub fn checkout(&mut self, id: HandlerId) -> Option<T> {
        let slot = self.slot_mut(id)?;
        match std::mem::replace(&mut slot.state, State::CheckedOut { doomed: false }) {
            State::Occupied(value) => Some(value),
            other => {
                slot.state = other;
                None
            }
        }
    }

    /// Return a checked-out value
    ///
    /// Returns `Some(value)` when the slot was removed meanwhile; the slot
    /// is released and the caller destroys the value.
    pub fn checkin(&mut self, id: HandlerId, value: T) -> Option<T> {
        let doomed = match self.slot_mut(id) {
            Some(slot) => match slot.state {
                State::CheckedOut { doomed: false } => {
                    slot.state = State::Occupied(value);
                    return None;
                }
                State::CheckedOut { doomed: true } => true,
                _ => false,
            },
            None => false,
        };
        if doomed {
            self.release(id);
        }
        Some(value)
    }

    /// Remove the value under `id`
    pub fn remove(&mut self, id: HandlerId) -> Removal<T> {
        let Some(slot) = self.slot_mut(id) else {
            return Removal::Missing;
        };
        match std::mem::replace(&mut slot.state, State::Vacant) {
            State::Occupied(value) => {
                self.release(id);
                Removal::Removed(value)
            }
            State::CheckedOut { .. } => {
                slot.state = State::CheckedOut { doomed: true };
                Removal::Deferred
            }
            other => {
                slot.state = other;
                Removal::Missing
            }
        }
    }

    /// Free the slot under `id`, whatever it holds
    pub fn release(&mut self, id: HandlerId) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        slot.state = State::Vacant;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
    }

    fn slot(&self, id: HandlerId) -> Option<&Slot<T>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
    }

    fn slot_mut(&mut self, id: HandlerId) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
    }
}
