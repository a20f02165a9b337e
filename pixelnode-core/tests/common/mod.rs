#![allow(dead_code)]

use core::sync::atomic::{AtomicUsize, Ordering};

use pixelnode_core::config::{ConfigStore, ParamTable, Rejected, Value};
use pixelnode_hal::mock::MemFlash;
use pixelnode_hal::{ConfigRegion, BLOCK_SIZE};

/// Two blocks of flash, config region in the second one
pub type Flash = MemFlash<{ 2 * BLOCK_SIZE }>;

pub const REGION_OFFSET: u32 = BLOCK_SIZE as u32;

pub fn region(flash: Flash) -> ConfigRegion<Flash> {
    ConfigRegion::new(flash, REGION_OFFSET).unwrap()
}

pub fn new_store<'a>(autosave: bool) -> ConfigStore<'a, Flash> {
    ConfigStore::new(region(Flash::new()), autosave)
}

/// Move a store's flash into a fresh, empty store
pub fn reopen<'a, 'b>(store: ConfigStore<'a, Flash>) -> ConfigStore<'b, Flash> {
    let flash = store.into_region().into_inner();
    ConfigStore::new(region(flash), false)
}

pub fn str(s: &str) -> Value {
    Value::str(s).unwrap()
}

pub fn bump(hits: &AtomicUsize) -> impl Fn(&ParamTable) + Sync + '_ {
    move |_: &ParamTable| {
        hits.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn hits(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

pub fn positive(_name: &str, value: &Value) -> Result<(), Rejected> {
    match value {
        Value::Int(v) if *v > 0 => Ok(()),
        _ => Err(Rejected),
    }
}

/// The region bytes of a store's flash
pub fn region_bytes(store: &ConfigStore<'_, Flash>) -> Vec<u8> {
    let start = REGION_OFFSET as usize;
    store.region().inner().buf[start..start + BLOCK_SIZE].to_vec()
}
