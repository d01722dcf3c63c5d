use bitmask_enum::bitmask;

use super::record::Record;

#[bitmask(u8)]
pub enum DeletionResultFlags {
    Ok = 0,
    NotFound = 1,
    UpdateFirstKey = 2,
    Underflow = 4,
}

/// What a subtree reports back to its parent after a delete.
pub struct DeletionResult<K, V> {
    pub flags: DeletionResultFlags,
    /// New smallest key of the subtree, present with `UpdateFirstKey`.
    pub first_key: Option<K>,
    pub record: Option<Record<K, V>>,
}

impl<K, V> DeletionResult<K, V> {
    pub fn not_found() -> Self {
        Self {
            flags: DeletionResultFlags::NotFound,
            first_key: None,
            record: None,
        }
    }

    pub fn removed(record: Record<K, V>) -> Self {
        Self {
            flags: DeletionResultFlags::Ok,
            first_key: None,
            record: Some(record),
        }
    }

    pub fn has(&self, flag: DeletionResultFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn set(&mut self, flag: DeletionResultFlags) {
        self.flags |= flag;
    }

    pub fn clear(&mut self, flag: DeletionResultFlags) {
        self.flags &= !flag;
    }

    pub fn update_first_key(&mut self, key: K) {
        self.set(DeletionResultFlags::UpdateFirstKey);
        self.first_key = Some(key);
    }

    pub fn take_first_key(&mut self) -> Option<K> {
        self.clear(DeletionResultFlags::UpdateFirstKey);
        self.first_key.take()
    }
}
