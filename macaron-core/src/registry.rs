//! Interface Registry
//!
//! In-memory catalogue of discovered interfaces and their address state.
//! Nothing here is persisted; a new process starts with an empty registry.
//!
//! # Original addresses
//!
//! `original_address` is captured once and never overwritten. When the
//! executor reports a permanent (burned-in) address that is used, otherwise
//! the first address observed for the interface. An interface first seen
//! without any readable address has no original and cannot be restored.
//!
//! # Thread Safety
//!
//! Records live behind an `RwLock`. A poisoned lock is recovered rather than
//! propagated, since every write leaves the map in a consistent state.

use crate::address::{self, MacAddress};
use crate::errors::MacaronError;
use crate::executor::{CommandExecutor, DiscoveredInterface};
use crate::interface::{is_virtual_interface, InterfaceKind};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lifecycle state of an interface record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceStatus {
    /// Discovered without a readable address.
    #[default]
    Unknown,
    Idle,
    Applying,
    Applied,
    Restoring,
    Restored,
    Failed,
}

impl InterfaceStatus {
    /// An apply or restore is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Applying | Self::Restoring)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Idle => "idle",
            Self::Applying => "applying",
            Self::Applied => "applied",
            Self::Restoring => "restoring",
            Self::Restored => "restored",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for InterfaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered interface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub name: String,
    pub kind: InterfaceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_address: Option<MacAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_address: Option<MacAddress>,
    /// Caller intent for the next bulk operation.
    pub selected: bool,
    pub status: InterfaceStatus,
    /// Reason for the most recent failure, cleared on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl InterfaceRecord {
    fn discovered(found: &DiscoveredInterface) -> Self {
        let original = found
            .permanent_address
            .or(found.address)
            .filter(|addr| address::validate(addr, true));
        Self {
            name: found.name.clone(),
            kind: found.kind,
            current_address: found.address,
            original_address: original,
            selected: false,
            status: resting_status(found.address),
            last_error: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the current address differs from the captured original.
    pub fn is_randomized(&self) -> bool {
        matches!(
            (self.current_address, self.original_address),
            (Some(current), Some(original)) if current != original
        )
    }

    fn touch(&mut self, status: InterfaceStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

fn resting_status(address: Option<MacAddress>) -> InterfaceStatus {
    if address.is_some() {
        InterfaceStatus::Idle
    } else {
        InterfaceStatus::Unknown
    }
}

/// Authoritative record set, refreshed from a [`CommandExecutor`].
pub struct InterfaceRegistry {
    executor: Arc<dyn CommandExecutor>,
    records: RwLock<BTreeMap<String, InterfaceRecord>>,
}

impl InterfaceRegistry {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    /// Query the executor and merge its answer into the record set.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<InterfaceRecord>> {
        let discovered = self
            .executor
            .list_interfaces()
            .await
            .map_err(|e| MacaronError::execution("*", "list interfaces", e.0))?;
        Ok(self.merge(discovered))
    }

    /// Merge one discovery pass.
    ///
    /// Known interfaces keep `original_address` and `selected`; new ones get
    /// fresh records; missing ones are dropped. Records with an operation in
    /// flight keep their address and status, which the orchestrator owns
    /// until it finishes.
    pub fn merge(&self, discovered: Vec<DiscoveredInterface>) -> Vec<InterfaceRecord> {
        let mut records = self.write();
        let mut seen = HashSet::with_capacity(discovered.len());

        for found in discovered {
            if let Err(err) = address::check_name(&found.name) {
                tracing::warn!(error = %err, "skipping interface with unsafe name");
                continue;
            }
            if is_virtual_interface(&found.name) {
                tracing::debug!(interface = %found.name, "skipping virtual interface");
                continue;
            }
            seen.insert(found.name.clone());

            match records.get_mut(&found.name) {
                Some(record) => {
                    record.kind = found.kind;
                    if record.original_address.is_none() {
                        record.original_address = found
                            .permanent_address
                            .filter(|addr| address::validate(addr, true));
                    }
                    if !record.status.is_busy() {
                        record.current_address = found.address;
                        if matches!(record.status, InterfaceStatus::Unknown | InterfaceStatus::Idle)
                        {
                            record.status = resting_status(found.address);
                        }
                        record.updated_at = Utc::now();
                    }
                }
                None => {
                    let record = InterfaceRecord::discovered(&found);
                    tracing::debug!(
                        interface = %record.name,
                        kind = %record.kind,
                        original = ?record.original_address,
                        "discovered interface"
                    );
                    records.insert(found.name.clone(), record);
                }
            }
        }

        records.retain(|name, _| {
            let keep = seen.contains(name);
            if !keep {
                tracing::debug!(interface = %name, "interface disappeared");
            }
            keep
        });

        records.values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<InterfaceRecord> {
        self.read().get(name).cloned()
    }

    /// All records, ordered by name.
    pub fn records(&self) -> Vec<InterfaceRecord> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn set_selected(&self, name: &str, selected: bool) -> Result<()> {
        let mut records = self.write();
        let record = records
            .get_mut(name)
            .ok_or_else(|| MacaronError::UnknownInterface(name.to_string()))?;
        record.selected = selected;
        Ok(())
    }

    /// Names marked as selected.
    pub fn selected(&self) -> Vec<String> {
        self.read()
            .values()
            .filter(|r| r.selected)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Names with a known current address and no operation in flight.
    pub fn all_eligible(&self) -> Vec<String> {
        self.read()
            .values()
            .filter(|r| r.current_address.is_some() && !r.status.is_busy())
            .map(|r| r.name.clone())
            .collect()
    }

    /// Names that have an original address to restore to.
    pub fn restorable(&self) -> Vec<String> {
        self.read()
            .values()
            .filter(|r| r.original_address.is_some())
            .map(|r| r.name.clone())
            .collect()
    }

    /// Move a record into `Applying` or `Restoring` and return a snapshot.
    /// Only called while holding the interface lock.
    pub(crate) fn begin(&self, name: &str, status: InterfaceStatus) -> Result<InterfaceRecord> {
        let mut records = self.write();
        let record = records
            .get_mut(name)
            .ok_or_else(|| MacaronError::UnknownInterface(name.to_string()))?;
        record.touch(status);
        Ok(record.clone())
    }

    /// Record a successful apply. A no-op if the interface vanished meanwhile.
    pub fn record_applied(&self, name: &str, new_address: MacAddress) {
        if let Some(record) = self.write().get_mut(name) {
            record.current_address = Some(new_address);
            record.last_error = None;
            record.touch(InterfaceStatus::Applied);
        }
    }

    /// Record a successful restore.
    pub fn record_restored(&self, name: &str, address: MacAddress) {
        if let Some(record) = self.write().get_mut(name) {
            record.current_address = Some(address);
            record.last_error = None;
            record.touch(InterfaceStatus::Restored);
        }
    }

    /// Record a failure. The current address is left as it was.
    pub fn record_failed(&self, name: &str, reason: impl Into<String>) {
        if let Some(record) = self.write().get_mut(name) {
            record.last_error = Some(reason.into());
            record.touch(InterfaceStatus::Failed);
        }
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, InterfaceRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, InterfaceRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}
