use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use log::warn;

use crate::{
    types::{ObjectId, PeerId},
    world::error::ObjectError,
};

struct RegistryEntry<T> {
    object: Weak<RefCell<T>>,
    owner: PeerId,
}

impl<T> RegistryEntry<T> {
    fn is_live(&self) -> bool {
        self.object.strong_count() > 0
    }
}

/// Table from object id to the live object and its owning peer.
///
/// The registry never keeps an object alive. Dropping the last handle
/// tears the object down and the next lookup evicts the stale entry.
pub struct ObjectRegistry<T> {
    entries: HashMap<ObjectId, RegistryEntry<T>>,
}

impl<T> Default for ObjectRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObjectRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers `object` under `id`, replacing whatever was there.
    /// Replacing a live object is logged.
    pub fn register(&mut self, id: ObjectId, object: &Rc<RefCell<T>>, owner: PeerId) {
        if let Some(existing) = self.entries.get(&id) {
            if existing.is_live() && !Weak::ptr_eq(&existing.object, &Rc::downgrade(object)) {
                warn!(
                    "Object id {} re-registered; replacing object owned by {} with one owned by {}",
                    id, existing.owner, owner
                );
            }
        }
        self.entries.insert(
            id,
            RegistryEntry {
                object: Rc::downgrade(object),
                owner,
            },
        );
    }

    /// Registers `object` under `id`, refusing to replace a different live object.
    pub fn try_register(
        &mut self,
        id: ObjectId,
        object: &Rc<RefCell<T>>,
        owner: PeerId,
    ) -> Result<(), ObjectError> {
        if let Some(existing) = self.entries.get(&id) {
            if existing.is_live() && !Weak::ptr_eq(&existing.object, &Rc::downgrade(object)) {
                warn!("Rejected registration of {}: id already in use", id);
                return Err(ObjectError::IdCollision {
                    id,
                    owner: existing.owner,
                });
            }
        }
        self.register(id, object, owner);
        Ok(())
    }

    /// Returns true if an entry was removed
    pub fn unregister(&mut self, id: ObjectId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Returns the live object, evicting the entry if it has been torn down.
    pub fn lookup(&mut self, id: ObjectId) -> Result<Rc<RefCell<T>>, ObjectError> {
        let Some(entry) = self.entries.get(&id) else {
            return Err(ObjectError::NotFound { id });
        };
        match entry.object.upgrade() {
            Some(object) => Ok(object),
            None => {
                self.entries.remove(&id);
                Err(ObjectError::NotFound { id })
            }
        }
    }

    pub fn contains(&mut self, id: ObjectId) -> bool {
        self.lookup(id).is_ok()
    }

    pub fn owner(&mut self, id: ObjectId) -> Result<PeerId, ObjectError> {
        self.lookup(id)?;
        self.entries
            .get(&id)
            .map(|entry| entry.owner)
            .ok_or(ObjectError::NotFound { id })
    }

    /// Changes the recorded owner, returning the previous one
    pub fn rebind(&mut self, id: ObjectId, owner: PeerId) -> Result<PeerId, ObjectError> {
        self.lookup(id)?;
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(ObjectError::NotFound { id })?;
        Ok(std::mem::replace(&mut entry.owner, owner))
    }

    /// Drops every entry whose object is gone, returning how many were removed
    pub fn evict_stale(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live());
        before - self.entries.len()
    }

    /// Ids of every live object, in ascending order
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_live())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Live objects currently owned by `owner`
    pub fn owned_by(&self, owner: PeerId) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.owner == owner && entry.is_live())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Number of entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
