//! Reader/writer lock over the cache index with a selectable acquisition
//! mode.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::LockMode;

pub(crate) struct IndexLock<T> {
    mode: LockMode,
    inner: RwLock<T>,
}

impl<T> IndexLock<T> {
    pub(crate) fn new(mode: LockMode, value: T) -> Self {
        Self {
            mode,
            inner: RwLock::new(value),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, T> {
        match self.mode {
            LockMode::Blocking => self.inner.read(),
            LockMode::Spinning => loop {
                if let Some(guard) = self.inner.try_read() {
                    return guard;
                }
                std::hint::spin_loop();
            },
        }
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        match self.mode {
            LockMode::Blocking => self.inner.write(),
            LockMode::Spinning => loop {
                if let Some(guard) = self.inner.try_write() {
                    return guard;
                }
                std::hint::spin_loop();
            },
        }
    }
}
