//! Per-branch staging areas.
//!
//! A [`StagingArea`] maps logical paths to the objects linked there since the
//! last commit. Paths hash into a fixed number of shards; each shard maps a
//! path to its own slot mutex. The shard lock is held only to find or insert
//! a slot, the slot mutex only while installing one entry, so links to
//! different paths never wait on each other's installs and links to the same
//! path are serialized.
//!
//! A staging location is consumed by its first successful link. The area
//! remembers which path each token was linked to until the next drain, and
//! refuses to link a consumed token anywhere else.
//!
//! Lock order is always shard, then slot, then the consumed-token record.
//! Installing never takes a shard lock while holding a slot.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::{Arc, Mutex, RwLock};

use uuid::Uuid;
use vos_refs::BranchStagingState;
use vos_types::{ObjectStats, StagingMetadata, StagingToken};

use crate::error::{StagingError, StagingResult};

/// One linked object together with the token it was linked under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedEntry {
    pub stats: ObjectStats,
    pub token: StagingToken,
}

/// What an install did to the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The path had no staged object.
    Created,
    /// A different object was staged and has been superseded.
    Replaced,
    /// The identical link was already installed; nothing changed.
    Unchanged,
}


type Slot = Arc<Mutex<Option<StagedEntry>>>;
type Shard = RwLock<HashMap<String, Slot>>;

fn poisoned<E: std::fmt::Display>(e: E) -> StagingError {
    StagingError::LockPoisoned(e.to_string())
}

/// Staged objects of one branch incarnation.
pub struct StagingArea {
    shards: Box<[Shard]>,
    hasher: RandomState,
    /// Token of every location linked since the last drain, and its path.
    consumed: Mutex<HashMap<StagingToken, String>>,
}

impl std::fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingArea")
            .field("shards", &self.shards.len())
            .finish()
    }
}

impl StagingArea {
    /// Create an empty area with `shards` lock shards (at least one).
    pub fn new(shards: usize) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            hasher: RandomState::new(),
            consumed: Mutex::new(HashMap::new()),
        }
    }

    fn shard(&self, path: &str) -> &Shard {
        let index = self.hasher.hash_one(path) as usize % self.shards.len();
        &self.shards[index]
    }

    fn existing_slot(&self, path: &str) -> StagingResult<Option<Slot>> {
        let shard = self.shard(path).read().map_err(poisoned)?;
        Ok(shard.get(path).cloned())
    }

    fn slot(&self, path: &str) -> StagingResult<Slot> {
        if let Some(slot) = self.existing_slot(path)? {
            return Ok(slot);
        }
        let mut shard = self.shard(path).write().map_err(poisoned)?;
        Ok(Arc::clone(shard.entry(path.to_string()).or_default()))
    }

    /// Install the object described by `metadata` at `path`.
    ///
    /// Re-linking with the same token and identical metadata returns the
    /// already installed stats untouched. A fresh location replaces whatever
    /// is staged at `path`. A location that was already linked is refused
    /// with [`StagingError::InvalidMetadata`] unless the link is that
    /// identical retry.
    pub fn install(
        &self,
        path: &str,
        metadata: &StagingMetadata,
        mtime: i64,
    ) -> StagingResult<(ObjectStats, InstallOutcome)> {
        let token = &metadata.staging.token;
        let slot = self.slot(path)?;
        let mut current = slot.lock().map_err(poisoned)?;

        if let Some(existing) = current.as_ref() {
            if existing.token == *token {
                if existing.stats.describes(metadata) {
                    return Ok((existing.stats.clone(), InstallOutcome::Unchanged));
                }
                return Err(StagingError::InvalidMetadata(format!(
                    "staging location {} is already linked at {path} with different metadata",
                    metadata.staging.physical_address
                )));
            }
        }

        {
            let mut consumed = self.consumed.lock().map_err(poisoned)?;
            if let Some(linked_at) = consumed.get(token) {
                return Err(StagingError::InvalidMetadata(format!(
                    "staging location {} was already linked at {linked_at}",
                    metadata.staging.physical_address
                )));
            }
            consumed.insert(token.clone(), path.to_string());
        }

        let outcome = match current.as_ref() {
            Some(_) => InstallOutcome::Replaced,
            None => InstallOutcome::Created,
        };

        let stats = ObjectStats::from_metadata(path, metadata, mtime);
        *current = Some(StagedEntry {
            stats: stats.clone(),
            token: metadata.staging.token.clone(),
        });
        Ok((stats, outcome))
    }

    /// The object staged at `path`, if any.
    pub fn get(&self, path: &str) -> StagingResult<Option<ObjectStats>> {
        let Some(slot) = self.existing_slot(path)? else {
            return Ok(None);
        };
        let entry = slot.lock().map_err(poisoned)?;
        Ok(entry.as_ref().map(|e| e.stats.clone()))
    }

    /// Remove the object staged at `path`. Returns `true` if one was staged.
    pub fn remove(&self, path: &str) -> StagingResult<bool> {
        let mut shard = self.shard(path).write().map_err(poisoned)?;
        let Some(slot) = shard.get(path).cloned() else {
            return Ok(false);
        };
        let removed = slot.lock().map_err(poisoned)?.take().is_some();
        // Our clone plus the map's: nobody else can be about to install.
        if Arc::strong_count(&slot) == 2 {
            shard.remove(path);
        }
        Ok(removed)
    }

    /// All staged objects sorted by path.
    pub fn list(&self) -> StagingResult<Vec<ObjectStats>> {
        let mut result = Vec::new();
        for shard in self.shards.iter() {
            let slots: Vec<Slot> = shard.read().map_err(poisoned)?.values().cloned().collect();
            for slot in slots {
                if let Some(entry) = slot.lock().map_err(poisoned)?.as_ref() {
                    result.push(entry.stats.clone());
                }
            }
        }
        result.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(result)
    }

    /// Number of staged objects.
    pub fn len(&self) -> StagingResult<usize> {
        Ok(self.list()?.len())
    }

    /// Returns `true` if nothing is staged.
    pub fn is_empty(&self) -> StagingResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Take every staged object out of the area, sorted by path, and forget
    /// the consumed tokens.
    ///
    /// Must run after the generation bump: every forgotten token is stale by
    /// then and can no longer validate. A link that validated its token
    /// before the commit and installs after this drain stays staged for the
    /// next commit.
    pub fn drain(&self) -> StagingResult<Vec<ObjectStats>> {
        let mut result = Vec::new();
        for shard in self.shards.iter() {
            let mut shard = shard.write().map_err(poisoned)?;
            for slot in shard.values() {
                if let Some(entry) = slot.lock().map_err(poisoned)?.take() {
                    result.push(entry.stats);
                }
            }
            // Slots still referenced elsewhere belong to in-flight links.
            shard.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        self.consumed.lock().map_err(poisoned)?.clear();
        result.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(result)
    }
}

/// Registry of staging areas keyed by branch incarnation.
#[derive(Debug)]
pub struct StagingAreas {
    path_shards: usize,
    areas: RwLock<HashMap<Uuid, Arc<StagingArea>>>,
}

impl StagingAreas {
    pub fn new(path_shards: usize) -> Self {
        Self {
            path_shards,
            areas: RwLock::new(HashMap::new()),
        }
    }

    /// The area of a branch incarnation, created on first use.
    ///
    /// Refuses to create an area for a deleted branch, so an area removed by
    /// [`StagingAreas::remove`] is never resurrected.
    pub fn area_for(&self, state: &BranchStagingState) -> StagingResult<Arc<StagingArea>> {
        if let Some(area) = self.get(state.incarnation())? {
            return Ok(area);
        }
        let mut areas = self.areas.write().map_err(poisoned)?;
        if state.is_deleted() {
            return Err(StagingError::BranchDeleted {
                repository: state.repository().to_string(),
                branch: state.branch().to_string(),
            });
        }
        let area = areas
            .entry(state.incarnation())
            .or_insert_with(|| Arc::new(StagingArea::new(self.path_shards)));
        Ok(Arc::clone(area))
    }

    /// The area of a branch incarnation, if one exists.
    pub fn get(&self, incarnation: Uuid) -> StagingResult<Option<Arc<StagingArea>>> {
        Ok(self.areas.read().map_err(poisoned)?.get(&incarnation).cloned())
    }

    /// Drop the area of a deleted branch incarnation.
    pub fn remove(&self, incarnation: Uuid) -> StagingResult<Option<Arc<StagingArea>>> {
        Ok(self.areas.write().map_err(poisoned)?.remove(&incarnation))
    }
}
