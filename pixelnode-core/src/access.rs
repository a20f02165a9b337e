//! Shared access to the parameter store
//!
//! Peripheral tasks read parameters on every step and occasionally issue
//! updates. [`ConfigAccess`] hides how the store is shared: a `RefCell` on
//! the host, a blocking mutex when tasks live in statics on the target.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_storage::nor_flash::NorFlash;

use crate::config::{ConfigError, ConfigStore, ParamTable, Value};

/// Shared handle to a [`ConfigStore`]
pub trait ConfigAccess {
    /// Run `f` with read access to the parameters
    fn read<R>(&self, f: impl FnOnce(&ParamTable) -> R) -> R;

    /// Apply a batch through [`ConfigStore::update`]
    fn update(&self, changes: &[(&str, Value)]) -> Result<(), ConfigError>;

    /// Erase the flash region through [`ConfigStore::erase`]
    fn erase(&self) -> Result<(), ConfigError>;

    fn int(&self, name: &str) -> Option<i32> {
        self.read(|p| p.int(name))
    }

    fn bool(&self, name: &str) -> Option<bool> {
        self.read(|p| p.bool(name))
    }
}

impl<'a, F: NorFlash> ConfigAccess for RefCell<ConfigStore<'a, F>> {
    fn read<R>(&self, f: impl FnOnce(&ParamTable) -> R) -> R {
        f(self.borrow().params())
    }

    fn update(&self, changes: &[(&str, Value)]) -> Result<(), ConfigError> {
        self.borrow_mut().update(changes)
    }

    fn erase(&self) -> Result<(), ConfigError> {
        self.borrow_mut().erase()
    }
}

impl<'a, M: RawMutex, F: NorFlash> ConfigAccess for Mutex<M, RefCell<ConfigStore<'a, F>>> {
    fn read<R>(&self, f: impl FnOnce(&ParamTable) -> R) -> R {
        self.lock(|store| f(store.borrow().params()))
    }

    fn update(&self, changes: &[(&str, Value)]) -> Result<(), ConfigError> {
        self.lock(|store| store.borrow_mut().update(changes))
    }

    fn erase(&self) -> Result<(), ConfigError> {
        self.lock(|store| store.borrow_mut().erase())
    }
}

impl<T: ConfigAccess + ?Sized> ConfigAccess for &T {
    fn read<R>(&self, f: impl FnOnce(&ParamTable) -> R) -> R {
        (**self).read(f)
    }

    fn update(&self, changes: &[(&str, Value)]) -> Result<(), ConfigError> {
        (**self).update(changes)
    }

    fn erase(&self) -> Result<(), ConfigError> {
        (**self).erase()
    }
}
