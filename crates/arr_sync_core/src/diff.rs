//! The shared shape of reconciler output.

use std::collections::BTreeMap;

/// What a reconciler decided for each desired entity.
///
/// Every desired name lands in exactly one of `to_create`, `to_update` or `unchanged`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult<T> {
    pub to_create: Vec<T>,
    pub to_update: Vec<T>,
    /// Names of entities that already match
    pub unchanged: Vec<String>,
    /// Change messages per entity name, for logging
    pub change_log: BTreeMap<String, Vec<String>>,
}

impl<T> DiffResult<T> {
    /// Returns `true` when nothing needs to be created or updated.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty()
    }
}

impl<T> Default for DiffResult<T> {
    fn default() -> Self {
        Self {
            to_create: Vec::new(),
            to_update: Vec::new(),
            unchanged: Vec::new(),
            change_log: BTreeMap::new(),
        }
    }
}
