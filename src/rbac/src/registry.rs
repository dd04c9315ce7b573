//! Permission registry: one power-of-two bit per permission name
//!
//! Bits are handed out in registration order starting at the configured
//! start value (default `1`) and doubling each time. A bit is never reused
//! or reassigned, and running past the 64th bit is an error rather than a
//! silent wrap.
//!
//! An unbounded registry (legacy strategy) keeps accepting names once the
//! mask is full. Those names are recorded without a bit and report bit `0`.

use crate::error::{RbacError, Result};
use crate::types::{Permission, PermissionMask};
use std::collections::{HashMap, HashSet};

/// Width of the permission mask
pub const MASK_WIDTH: u32 = PermissionMask::BITS;

/// Bit given to the first permission unless configured otherwise
pub const DEFAULT_START_BIT: PermissionMask = 1;

/// Name ↔ bit registry
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    /// Name → bit
    bits: HashMap<String, PermissionMask>,

    /// Bit → name, for expanding masks back into names
    names: HashMap<PermissionMask, String>,

    /// Highest bit handed out so far (0 while empty)
    current_max: PermissionMask,

    /// Bit for the very first permission
    start: PermissionMask,

    /// Names registered after the mask filled up, in registration order
    unassigned: Vec<String>,

    /// Whether a full mask is an error
    bounded: bool,
}

impl PermissionRegistry {
    /// Create an empty registry starting at bit `1`
    pub fn new() -> Self {
        Self {
            bits: HashMap::new(),
            names: HashMap::new(),
            current_max: 0,
            start: DEFAULT_START_BIT,
            unassigned: Vec::new(),
            bounded: true,
        }
    }

    /// Create an empty registry that records names past the mask width
    /// without a bit instead of failing
    pub fn unbounded() -> Self {
        Self {
            bounded: false,
            ..Self::new()
        }
    }

    /// Create an empty registry whose first permission receives `start`
    pub fn with_start(start: PermissionMask) -> Result<Self> {
        if !start.is_power_of_two() {
            return Err(RbacError::InvalidInput(format!(
                "start bit {} is not a single set bit",
                start
            )));
        }

        Ok(Self {
            start,
            ..Self::new()
        })
    }

    /// Register a permission and return its bit
    ///
    /// Idempotent: a known name returns its existing bit without advancing
    /// the counter. Returns `0` for a name an unbounded registry could not
    /// give a bit.
    pub fn register(&mut self, name: &str) -> Result<PermissionMask> {
        if let Some(bit) = self.bits.get(name) {
            return Ok(*bit);
        }

        match self.next_bit() {
            Ok(bit) => {
                self.insert(name, bit);
                Ok(bit)
            }
            Err(_) if !self.bounded => {
                self.insert_unassigned(name);
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    /// Register a permission with an explicit bit (configuration files, snapshots)
    ///
    /// Bit `0` is accepted by an unbounded registry and records the name
    /// without a bit.
    pub fn register_with_bit(&mut self, name: &str, bit: PermissionMask) -> Result<PermissionMask> {
        if bit == 0 && !self.bounded {
            return match self.bits.get(name) {
                Some(0) => Ok(0),
                Some(existing) => Err(RbacError::DuplicatePermission(format!(
                    "'{}' already holds bit {}",
                    name, existing
                ))),
                None => {
                    self.insert_unassigned(name);
                    Ok(0)
                }
            };
        }

        if !bit.is_power_of_two() {
            return Err(RbacError::InvalidInput(format!(
                "bit {} for permission '{}' is not a single set bit",
                bit, name
            )));
        }

        match self.bits.get(name) {
            Some(existing) if *existing == bit => return Ok(bit),
            Some(existing) => {
                return Err(RbacError::DuplicatePermission(format!(
                    "'{}' already holds bit {} (requested {})",
                    name, existing, bit
                )))
            }
            None => {}
        }

        if let Some(owner) = self.names.get(&bit) {
            return Err(RbacError::InvalidInput(format!(
                "bit {} is already assigned to '{}'",
                bit, owner
            )));
        }

        self.insert(name, bit);
        Ok(bit)
    }

    /// Bit of a registered permission (`None` for names without a bit)
    pub fn bit_of(&self, name: &str) -> Option<PermissionMask> {
        self.bits.get(name).copied().filter(|bit| *bit != 0)
    }

    /// Name owning a bit
    pub fn name_of(&self, bit: PermissionMask) -> Option<&str> {
        self.names.get(&bit).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bits.contains_key(name)
    }

    /// Every registered name
    pub fn all_names(&self) -> HashSet<String> {
        self.bits.keys().cloned().collect()
    }

    /// Registered permissions ordered by bit, then names without a bit
    pub fn permissions(&self) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = self
            .names
            .iter()
            .map(|(bit, name)| Permission::new(name.clone(), *bit))
            .collect();
        permissions.sort_by_key(|p| p.bit);
        permissions.extend(self.unassigned.iter().map(|name| Permission::new(name.clone(), 0)));
        permissions
    }

    /// Names of every registered permission whose bit is set in `mask`, ordered by bit
    pub fn names_in(&self, mask: PermissionMask) -> Vec<String> {
        let mut names = Vec::new();
        let mut remaining = mask;

        while remaining != 0 {
            let bit = remaining & remaining.wrapping_neg();
            if let Some(name) = self.names.get(&bit) {
                names.push(name.clone());
            }
            remaining &= !bit;
        }

        names
    }

    /// Highest bit assigned so far
    pub fn current_max(&self) -> PermissionMask {
        self.current_max
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn is_bounded(&self) -> bool {
        self.bounded
    }

    /// Forget every permission and restart the counter
    pub fn clear(&mut self) {
        self.bits.clear();
        self.names.clear();
        self.unassigned.clear();
        self.current_max = 0;
    }

    fn next_bit(&self) -> Result<PermissionMask> {
        if self.current_max == 0 {
            return Ok(self.start);
        }

        self.current_max
            .checked_mul(2)
            .ok_or(RbacError::CapacityExceeded { width: MASK_WIDTH })
    }

    fn insert(&mut self, name: &str, bit: PermissionMask) {
        self.bits.insert(name.to_string(), bit);
        self.names.insert(bit, name.to_string());
        self.current_max = self.current_max.max(bit);
    }

    fn insert_unassigned(&mut self, name: &str) {
        self.bits.insert(name.to_string(), 0);
        self.unassigned.push(name.to_string());
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
