//! Persistent parameter store
//!
//! [`ConfigStore`] owns every registered parameter, its validator and its
//! notification group, and is the only reader and writer of the flash
//! configuration region.
//!
//! # Lifecycle
//!
//! ```text
//! add_param* ──► load (once, at boot) ──► (update | save)*
//! ```
//!
//! # Batches
//!
//! [`ConfigStore::update`] validates every entry before assigning any of
//! them. Once all values are assigned, each group touched by the batch has
//! its callback invoked exactly once, in group registration order, and
//! then the store is saved if autosave is enabled.

use embedded_storage::nor_flash::NorFlash;
use heapless::{String, Vec};
use pixelnode_hal::{ConfigRegion, BLOCK_SIZE};
use pixelnode_record::{RecordIter, RecordWriter, MAX_NAME_LEN};

use super::error::ConfigError;
use super::param::{validate_name, Param, ParamTable, Validator, MAX_PARAMS};
use super::value::{Value, ValueKind};

/// Maximum number of notification groups
pub const MAX_GROUPS: usize = 16;

/// Group change callback
///
/// Receives the parameter table after the batch has been applied.
/// Callbacks run inside the store's update path, so they should only
/// record or signal the change and leave real work to a task.
pub type Callback<'a> = &'a (dyn Fn(&ParamTable) + Sync);

/// Bit set of group indices
pub(super) type GroupMask = u16;

/// A notification group: one key, exactly one callback
struct Group<'a> {
    key: String<MAX_NAME_LEN>,
    callback: Callback<'a>,
}

/// Outcome of a successful [`ConfigStore::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadReport {
    /// Records applied to registered parameters
    pub loaded: usize,
    /// Records skipped because no parameter has that name
    pub skipped: usize,
}

/// Named, typed, validated parameters persisted to one flash block
pub struct ConfigStore<'a, F> {
    region: ConfigRegion<F>,
    params: ParamTable,
    groups: Vec<Group<'a>, MAX_GROUPS>,
    autosave: bool,
    scratch: [u8; BLOCK_SIZE],
}

impl<'a, F: NorFlash> ConfigStore<'a, F> {
    /// Create an empty store over `region`
    ///
    /// # Arguments
    /// * `region` - Flash block holding the records
    /// * `autosave` - Save after every successful update
    pub fn new(region: ConfigRegion<F>, autosave: bool) -> Self {
        Self {
            region,
            params: ParamTable::new(),
            groups: Vec::new(),
            autosave,
            scratch: [0xFF; BLOCK_SIZE],
        }
    }

    /// All registered parameters
    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    /// Current value of `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Integer value of `name`, `None` if missing or not an integer
    pub fn int(&self, name: &str) -> Option<i32> {
        self.params.int(name)
    }

    /// String value of `name`, `None` if missing or not a string
    pub fn str(&self, name: &str) -> Option<&str> {
        self.params.str(name)
    }

    /// Boolean value of `name`, `None` if missing or not a boolean
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.params.bool(name)
    }

    /// Turn saving after every successful update on or off
    pub fn set_autosave(&mut self, autosave: bool) {
        self.autosave = autosave;
    }

    /// The underlying flash region
    pub fn region(&self) -> &ConfigRegion<F> {
        &self.region
    }

    /// Release the flash region
    pub fn into_region(self) -> ConfigRegion<F> {
        self.region
    }

    /// Register a new parameter
    ///
    /// # Arguments
    /// * `name` - Unique name, see [`validate_name`]
    /// * `default` - Initial value; also fixes the parameter's kind
    /// * `validator` - Optional check, run against `default` right away
    /// * `callback` - Change callback; creates group `group` (or `name`)
    /// * `group` - Group key; without `callback` the parameter joins the
    ///   group's existing callback
    pub fn add_param(
        &mut self,
        name: &str,
        default: Value,
        validator: Option<Validator>,
        callback: Option<Callback<'a>>,
        group: Option<&str>,
    ) -> Result<(), ConfigError> {
        validate_name(name)?;
        if self.params.position(name).is_some() {
            return Err(ConfigError::DuplicateName);
        }
        if self.params.len() == MAX_PARAMS {
            return Err(ConfigError::TooManyParams);
        }
        if let Some(check) = validator {
            if check(name, &default).is_err() {
                warn!("default rejected for {=str}", name);
                return Err(ConfigError::ValidationFailed);
            }
        }

        let group = match (callback, group) {
            (Some(callback), key) => Some(GroupSlot::New(key.unwrap_or(name), callback)),
            (None, Some(key)) => match self.group_index(key) {
                Some(index) => Some(GroupSlot::Existing(index)),
                None => return Err(ConfigError::UnknownGroup),
            },
            (None, None) => None,
        };

        let group = match group {
            Some(GroupSlot::Existing(index)) => Some(index),
            Some(GroupSlot::New(key, callback)) => {
                if self.group_index(key).is_some() {
                    return Err(ConfigError::GroupConflict);
                }
                let key = String::try_from(key).map_err(|_| ConfigError::InvalidName)?;
                let index = self.groups.len() as u8;
                self.groups
                    .push(Group { key, callback })
                    .map_err(|_| ConfigError::TooManyGroups)?;
                Some(index)
            }
            None => None,
        };

        let name = String::try_from(name).map_err(|_| ConfigError::InvalidName)?;
        self.params.push(Param {
            name,
            value: default,
            validator,
            group,
        })
    }

    /// Validate and apply a batch of changes
    ///
    /// Every entry is checked first (name exists, kind matches, validator
    /// passes) in order; the first failure is returned and nothing changes.
    /// With autosave enabled the resulting records are also built before
    /// anything is assigned, so [`ConfigError::StoreTooLarge`] leaves the
    /// store untouched. Otherwise all values are assigned, the affected
    /// group callbacks run once each, and the region is rewritten when
    /// autosave is enabled.
    pub fn update(&mut self, changes: &[(&str, Value)]) -> Result<(), ConfigError> {
        let mut mask: GroupMask = 0;
        let mut indices: Vec<usize, MAX_PARAMS> = Vec::new();

        for &(name, ref value) in changes {
            let Some(index) = self.params.position(name) else {
                warn!("update rejected, unknown param {=str}", name);
                return Err(ConfigError::UnknownParam);
            };
            if let Some(group) = self.params.check(index, value)? {
                mask |= 1 << group;
            }
            indices
                .push(index)
                .map_err(|_| ConfigError::TooManyParams)?;
        }

        self.commit(
            mask,
            changes.iter().map(|(_, value)| value).zip(indices.iter().copied()),
        )
    }

    /// Apply checked `(value, index)` entries, notify `mask` and autosave
    pub(super) fn commit<'v, I>(&mut self, mask: GroupMask, entries: I) -> Result<(), ConfigError>
    where
        I: Iterator<Item = (&'v Value, usize)> + Clone,
    {
        let len = if self.autosave {
            Some(serialize(&mut self.scratch, &self.params, entries.clone())?)
        } else {
            None
        };

        for (value, index) in entries {
            self.params.set(index, value.clone());
        }

        self.notify(mask);

        if let Some(len) = len {
            self.write_scratch(len)?;
        }
        Ok(())
    }

    /// Replace in-memory values with the records stored in flash
    ///
    /// All records are decoded and validated before any value is assigned.
    /// On any error the in-memory values are left untouched. Records for
    /// names that are not registered are skipped. On success every group
    /// callback runs once.
    pub fn load(&mut self) -> Result<LoadReport, ConfigError> {
        self.region.read(&mut self.scratch)?;

        let report = match check_records(&self.scratch, &self.params) {
            Ok(report) => report,
            Err(e) => {
                warn!("config load failed: {}", e);
                return Err(e);
            }
        };

        for record in RecordIter::new(&self.scratch) {
            let record = record?;
            if let Some(index) = self.params.position(record.name) {
                self.params.set(index, Value::from_record(record.value)?);
            }
        }

        info!(
            "config loaded: {=usize} params, {=usize} skipped",
            report.loaded,
            report.skipped
        );

        let all: GroupMask = ((1u32 << self.groups.len()) - 1) as GroupMask;
        self.notify(all);
        Ok(report)
    }

    /// Serialize every parameter and rewrite the flash region
    ///
    /// The records are built in RAM first; if they do not fit the region
    /// budget this fails with [`ConfigError::StoreTooLarge`] before flash is
    /// touched. Returns the serialized length.
    pub fn save(&mut self) -> Result<usize, ConfigError> {
        let len = serialize(&mut self.scratch, &self.params, core::iter::empty())?;
        self.write_scratch(len)?;
        Ok(len)
    }

    /// Rewrite the region with the first `len` serialized bytes of scratch
    fn write_scratch(&mut self, len: usize) -> Result<(), ConfigError> {
        let padded = ConfigRegion::<F>::write_len(len);
        self.region.erase()?;
        self.region.write(&self.scratch[..padded])?;

        info!("config saved: {=usize} bytes", len);
        Ok(())
    }

    /// Erase the flash region; the next boot starts from defaults
    pub fn erase(&mut self) -> Result<(), ConfigError> {
        warn!("config region erased");
        self.region.erase()?;
        Ok(())
    }

    /// Whether a group called `key` exists
    pub fn has_group(&self, key: &str) -> bool {
        self.group_index(key).is_some()
    }

    fn group_index(&self, key: &str) -> Option<u8> {
        self.groups
            .iter()
            .position(|g| g.key.as_str() == key)
            .map(|i| i as u8)
    }

    /// Run the callback of every group in `mask`, in registration order
    fn notify(&self, mask: GroupMask) {
        for (index, group) in self.groups.iter().enumerate() {
            if mask & (1 << index) != 0 {
                debug!("notify group {=str}", group.key.as_str());
                (group.callback)(&self.params);
            }
        }
    }
}

/// Serialize every parameter into `scratch`, taking the last of
/// `overrides` for an index in place of its current value
///
/// Returns the serialized length.
fn serialize<'v, I>(
    scratch: &mut [u8],
    params: &ParamTable,
    overrides: I,
) -> Result<usize, ConfigError>
where
    I: Iterator<Item = (&'v Value, usize)> + Clone,
{
    scratch.fill(0xFF);
    let mut writer = RecordWriter::new(scratch);
    for (index, param) in params.iter().enumerate() {
        let value = overrides
            .clone()
            .filter(|&(_, i)| i == index)
            .last()
            .map_or(param.value(), |(value, _)| value);
        if let Err(e) = writer.push(param.name(), value.as_record()) {
            error!("config save failed at {=str}", param.name());
            return Err(e.into());
        }
    }
    Ok(writer.finish()?)
}

enum GroupSlot<'k, 'a> {
    Existing(u8),
    New(&'k str, Callback<'a>),
}

/// First load pass: decode and validate every record without applying
fn check_records(buffer: &[u8], params: &ParamTable) -> Result<LoadReport, ConfigError> {
    let mut report = LoadReport {
        loaded: 0,
        skipped: 0,
    };

    for record in RecordIter::new(buffer) {
        let record = record?;
        let Some(index) = params.position(record.name) else {
            warn!("skipping unknown stored param {=str}", record.name);
            report.skipped += 1;
            continue;
        };
        let param = params.at(index);
        if param.kind() != ValueKind::from(record.value) {
            return Err(ConfigError::TypeMismatch);
        }
        param.validate(&Value::from_record(record.value)?)?;
        report.loaded += 1;
    }

    Ok(report)
}
