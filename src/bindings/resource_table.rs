// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The flat table of currently bound resources for one effect.

use std::ops::Range;

use crate::device::{NativeHandle, UAV_COUNTER_UNCHANGED};

/// One entry per parameter element, plus a parallel array of UAV initial counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTable {
    resources: Vec<Option<NativeHandle>>,
    uav_initial_counts: Vec<i32>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_len(len: usize) -> Self {
        let mut table = Self::new();
        table.resize(len);
        table
    }

    /// Grows (or shrinks) the table.  New entries are unbound with unchanged counters.
    pub fn resize(&mut self, len: usize) {
        self.resources.resize(len, None);
        self.uav_initial_counts.resize(len, UAV_COUNTER_UNCHANGED);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<NativeHandle> {
        self.resources.get(index).copied().flatten()
    }

    /// # Panics
    ///
    /// Panics if `index` is outside the table.
    pub fn set(&mut self, index: usize, resource: Option<NativeHandle>) {
        self.resources[index] = resource;
    }

    /// # Panics
    ///
    /// Panics if `index` is outside the table.
    pub fn set_unordered_access(&mut self, index: usize, view: Option<NativeHandle>, initial_count: i32) {
        self.resources[index] = view;
        self.uav_initial_counts[index] = initial_count;
    }

    pub fn resources(&self) -> &[Option<NativeHandle>] {
        &self.resources
    }

    pub fn uav_initial_counts(&self) -> &[i32] {
        &self.uav_initial_counts
    }

    pub(crate) fn resource_range(&self, range: Range<usize>) -> &[Option<NativeHandle>] {
        &self.resources[range]
    }

    pub(crate) fn uav_count_range(&self, range: Range<usize>) -> &[i32] {
        &self.uav_initial_counts[range]
    }
}
