//! # Sensor Slot Manager
//!
//! Maps arbitrary 32-bit sensor ids onto a small fixed pool of slots.
//!
//! Resolution order for an id:
//!
//! 1. id in the exclude list: `Skip`
//! 2. include list non-empty and id not in it: `Skip`
//! 3. a valid slot already holding the id: that slot
//! 4. the first invalid (free) slot: that slot
//! 5. otherwise `Full`
//!
//! Filters and slots are evaluated on every call; nothing is cached, so
//! the lists can be changed between messages.

use crate::sensor::{Payload, Reading, SensorType};

/// Outcome of [`SlotManager::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResolution {
    Slot(usize),
    Skip,
    Full,
}

/// Fixed pool of sensor slots with include/exclude filtering
#[derive(Debug, Clone, Default)]
pub struct SlotManager {
    slots: Vec<Reading>,
    include: Vec<u32>,
    exclude: Vec<u32>,
}

impl SlotManager {
    /// Create a pool of `size` empty slots
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![Reading::default(); size],
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Resolve a sensor id to a slot index
    pub fn resolve(&self, id: u32) -> SlotResolution {
        if self.exclude.contains(&id) {
            log::debug!("Sensor {id:08X} excluded");
            return SlotResolution::Skip;
        }
        if !self.include.is_empty() && !self.include.contains(&id) {
            log::debug!("Sensor {id:08X} not in include list");
            return SlotResolution::Skip;
        }

        let mut free = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.valid {
                if slot.sensor_id == id {
                    return SlotResolution::Slot(i);
                }
            } else if free.is_none() {
                free = Some(i);
            }
        }

        match free {
            Some(i) => SlotResolution::Slot(i),
            None => SlotResolution::Full,
        }
    }

    /// Number of slots in the pool
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Resize the pool; new slots start invalid, dropped slots are lost.
    pub fn resize(&mut self, size: usize) {
        self.slots.resize(size, Reading::default());
    }

    pub fn slots(&self) -> &[Reading] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&Reading> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Reading> {
        self.slots.get_mut(index)
    }

    /// Invalidate slots, all of them or only those of one sensor type.
    ///
    /// Weather field flags are dropped too, so a split 6-in-1 reading is
    /// never completed from parts received before the clear.
    pub fn clear(&mut self, s_type: Option<SensorType>) {
        for slot in self.slots.iter_mut() {
            if s_type.map_or(true, |t| slot.s_type == t) {
                slot.valid = false;
                slot.complete = false;
                if let Payload::Weather(w) = &mut slot.payload {
                    w.temp_ok = false;
                    w.humidity_ok = false;
                    w.light_ok = false;
                    w.uv_ok = false;
                    w.wind_ok = false;
                    w.rain_ok = false;
                    w.tglobe_ok = false;
                }
            }
        }
    }

    /// Index of the valid slot holding `id`
    pub fn find_id(&self, id: u32) -> Option<usize> {
        self.slots.iter().position(|s| s.valid && s.sensor_id == id)
    }

    /// Index of the first valid slot of the given type (and channel, if given)
    pub fn find_type(&self, s_type: SensorType, chan: Option<u8>) -> Option<usize> {
        self.slots.iter().position(|s| {
            s.valid && s.s_type == s_type && chan.map_or(true, |c| s.chan == c)
        })
    }

    pub fn include_ids(&self) -> &[u32] {
        &self.include
    }

    pub fn exclude_ids(&self) -> &[u32] {
        &self.exclude
    }

    pub fn set_include_ids(&mut self, ids: Vec<u32>) {
        self.include = ids;
    }

    pub fn set_exclude_ids(&mut self, ids: Vec<u32>) {
        self.exclude = ids;
    }
}
