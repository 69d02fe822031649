//! Ties the habit store, the local cache and the persistence gateway together.
//!
//! Local state is authoritative for the running session. A user action is
//! validated and applied locally first; only then is the record store told
//! about it. A failed push is returned to the caller but never undoes the
//! local change.

use crate::errors::HabitError;
use crate::gateway::{PersistenceGateway, RecordConnector};
use crate::models::{Habit, HabitId};
use crate::storage::{load_cache, persist_cache};
use crate::store::HabitStore;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub habit_count: usize,
    pub pushed: usize,
    pub failed: usize,
}

pub struct HabitTracker<C> {
    store: Mutex<HabitStore>,
    gateway: PersistenceGateway<C>,
    cache_path: Option<PathBuf>,
}

impl<C: RecordConnector> HabitTracker<C> {
    pub fn new(connector: C) -> Self {
        Self {
            store: Mutex::new(HabitStore::new()),
            gateway: PersistenceGateway::new(connector),
            cache_path: None,
        }
    }

    /// Seeds the store from the cache file and writes through to it afterwards.
    pub async fn with_cache(connector: C, cache_path: PathBuf) -> Self {
        let cached = load_cache(&cache_path).await;
        info!(count = cached.len(), path = %cache_path.display(), "loaded habit cache");
        Self {
            store: Mutex::new(HabitStore::from_habits(cached)),
            gateway: PersistenceGateway::new(connector),
            cache_path: Some(cache_path),
        }
    }

    pub fn gateway(&self) -> &PersistenceGateway<C> {
        &self.gateway
    }

    pub async fn snapshot(&self) -> Vec<Habit> {
        self.store.lock().await.list().to_vec()
    }

    pub async fn create(&self, name: &str) -> Result<Habit, HabitError> {
        let habit = self.mutate(|store| store.create(name)).await?;
        info!(id = %habit.id, name = %habit.name, "created habit");

        let remote_id = self.gateway.push(&habit).await.inspect_err(|err| {
            warn!(id = %habit.id, "failed to push new habit: {err}");
        })?;
        self.adopt(&habit, remote_id).await
    }

    pub async fn toggle_completion(&self, id: &HabitId, day: NaiveDate) -> Result<Habit, HabitError> {
        let (habit, _ticket) = self
            .mutate(|store| {
                let habit = store.toggle_completion(id, day)?;
                Ok((habit, self.gateway.reserve(id)))
            })
            .await?;
        self.gateway
            .push_toggle(&habit.id, &habit.completed_dates)
            .await
            .inspect_err(|err| warn!(id = %habit.id, "failed to push completion: {err}"))?;
        Ok(habit)
    }

    pub async fn rename(&self, id: &HabitId, name: &str) -> Result<Habit, HabitError> {
        let (habit, _ticket) = self
            .mutate(|store| {
                let habit = store.rename(id, name)?;
                Ok((habit, self.gateway.reserve(id)))
            })
            .await?;
        self.gateway
            .push_rename(&habit.id, &habit.name)
            .await
            .inspect_err(|err| warn!(id = %habit.id, "failed to push rename: {err}"))?;
        Ok(habit)
    }

    pub async fn remove(&self, id: &HabitId) -> Result<(), HabitError> {
        let (habit, _ticket) = self
            .mutate(|store| {
                let habit = store.remove(id)?;
                Ok((habit, self.gateway.reserve(id)))
            })
            .await?;
        info!(id = %habit.id, "removed habit");
        self.gateway
            .push_delete(&habit.id)
            .await
            .inspect_err(|err| warn!(id = %habit.id, "failed to push delete: {err}"))
    }

    /// Reloads from the record store and re-pushes habits it has never seen.
    pub async fn refresh(&self) -> Result<SyncReport, HabitError> {
        let remote = self.gateway.fetch_all().await?;
        let pending = {
            let mut store = self.store.lock().await;
            let merge = reconcile(store.list(), remote, |id| self.gateway.alias_of(id));
            store.replace_all(merge.merged)?;
            self.write_cache(store.list()).await;
            for id in &merge.settled {
                self.gateway.adopted(id);
            }
            merge.pending
        };

        let mut report = SyncReport::default();
        for habit in pending {
            match self.gateway.push(&habit).await {
                Ok(remote_id) => {
                    self.adopt(&habit, remote_id).await?;
                    report.pushed += 1;
                }
                Err(err) => {
                    warn!(id = %habit.id, "failed to re-push habit: {err}");
                    report.failed += 1;
                }
            }
        }
        report.habit_count = self.store.lock().await.list().len();
        info!(
            habits = report.habit_count,
            pushed = report.pushed,
            failed = report.failed,
            "refreshed from record store"
        );
        Ok(report)
    }

    async fn mutate<T>(
        &self,
        op: impl FnOnce(&mut HabitStore) -> Result<T, HabitError>,
    ) -> Result<T, HabitError> {
        let mut store = self.store.lock().await;
        let value = op(&mut store)?;
        self.write_cache(store.list()).await;
        Ok(value)
    }

    /// Moves the local habit onto the id the record store acknowledged.
    ///
    /// Another path (a refresh, or the create itself) may have got there
    /// first; then the remote copy is kept and the local one dropped.
    async fn adopt(&self, habit: &Habit, remote_id: HabitId) -> Result<Habit, HabitError> {
        if remote_id == habit.id {
            return Ok(habit.clone());
        }
        let adopted = self
            .mutate(|store| match store.get(&remote_id).cloned() {
                Some(existing) => {
                    let _ = store.remove(&habit.id);
                    Ok(existing)
                }
                None => store.adopt_id(&habit.id, remote_id.clone()),
            })
            .await;
        self.gateway.adopted(&habit.id);
        match adopted {
            Ok(habit) => Ok(habit),
            Err(HabitError::NotFound(_)) => {
                // Removed locally while the create was in flight.
                warn!(id = %remote_id, "habit removed before sync finished, deleting remote copy");
                match self.gateway.push_delete(&remote_id).await {
                    Ok(()) | Err(HabitError::NotFound(_)) => {}
                    Err(err) => return Err(err),
                }
                Err(HabitError::not_found(&habit.id))
            }
            Err(err) => Err(err),
        }
    }

    async fn write_cache(&self, habits: &[Habit]) {
        if let Some(path) = &self.cache_path {
            if let Err(err) = persist_cache(path, habits).await {
                error!(path = %path.display(), "failed to write habit cache: {err}");
            }
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// The new local collection.
    pub merged: Vec<Habit>,
    /// Local habits the record store has never seen, to be pushed.
    pub pending: Vec<Habit>,
    /// Local ids dropped because their create was already acknowledged.
    pub settled: Vec<HabitId>,
}

/// Merges the local collection into a freshly fetched remote one.
///
/// Remote records win for every id they carry. A local habit whose create
/// was acknowledged (`acknowledged_as` knows its remote id) is dropped when
/// the fetched set already holds that remote record, and kept unchanged
/// otherwise. Other local-only habits are kept after the remote ones and
/// returned as pending. Synced habits missing remotely were deleted
/// elsewhere and are dropped.
pub fn reconcile(
    local: &[Habit],
    remote: Vec<Habit>,
    acknowledged_as: impl Fn(&HabitId) -> Option<HabitId>,
) -> Reconciliation {
    let mut seen: HashSet<HabitId> = HashSet::new();
    let merged: Vec<Habit> = remote
        .into_iter()
        .filter(|habit| seen.insert(habit.id.clone()))
        .collect();
    let mut merge = Reconciliation {
        merged,
        ..Reconciliation::default()
    };
    let mut acknowledged = Vec::new();
    for habit in local.iter().filter(|habit| habit.id.is_local()) {
        if seen.contains(&habit.id) {
            continue;
        }
        match acknowledged_as(&habit.id) {
            Some(remote_id) if seen.contains(&remote_id) => merge.settled.push(habit.id.clone()),
            // The fetch predates the create; its adoption is still on the way.
            Some(_) => acknowledged.push(habit.clone()),
            None => merge.pending.push(habit.clone()),
        }
    }
    merge.merged.extend(acknowledged);
    merge.merged.extend(merge.pending.iter().cloned());
    merge
}
