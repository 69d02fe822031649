//! Persistence gateway between the local habit store and a remote record
//! store.
//!
//! Every gateway call opens its own connection, runs exactly one operation
//! and closes the connection again, whatever the outcome. Pushes for the
//! same habit are serialized so a late create acknowledgement cannot be
//! overtaken by the toggle queued behind it.

use crate::errors::HabitError;
use crate::models::{Habit, HabitId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Opens connections to a record store.
pub trait RecordConnector: Send + Sync {
    type Connection: RecordConnection;

    fn connect(&self) -> impl Future<Output = Result<Self::Connection, HabitError>> + Send;
}

/// A single open connection. Callers must `close` it when done.
pub trait RecordConnection: Send {
    fn list(&mut self) -> impl Future<Output = Result<Vec<Habit>, HabitError>> + Send;

    /// Stores `habit` and returns the stored record with its assigned id.
    fn create(&mut self, habit: &Habit) -> impl Future<Output = Result<Habit, HabitError>> + Send;

    fn update_completion(
        &mut self,
        id: &HabitId,
        completed_dates: &[NaiveDate],
    ) -> impl Future<Output = Result<(), HabitError>> + Send;

    fn update_name(
        &mut self,
        id: &HabitId,
        name: &str,
    ) -> impl Future<Output = Result<(), HabitError>> + Send;

    fn delete(&mut self, id: &HabitId) -> impl Future<Output = Result<(), HabitError>> + Send;

    fn close(self) -> impl Future<Output = ()> + Send;
}

pub struct PersistenceGateway<C> {
    connector: C,
    registry: Arc<StdMutex<Registry>>,
}

/// Per-habit push locks and the `local id -> remote id` map.
///
/// Entries for a local id live until the tracker has adopted the remote id
/// and nobody holds or waits on that id's lock any more.
#[derive(Default)]
struct Registry {
    locks: HashMap<HabitId, Arc<Mutex<()>>>,
    aliases: HashMap<HabitId, HabitId>,
    adopted: HashSet<HabitId>,
}

impl Registry {
    fn canonical(&self, id: &HabitId) -> HabitId {
        self.aliases.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    fn lock_for(&mut self, key: &HabitId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key.clone()).or_default())
    }

    fn sweep(&mut self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let Self {
            locks,
            aliases,
            adopted,
        } = self;
        aliases.retain(|local, _| !adopted.contains(local) || locks.contains_key(local));
        adopted.retain(|local| aliases.contains_key(local));
    }
}

/// Taken together with a local mutation and held until its push is done.
///
/// While a ticket for a local id is alive the gateway keeps that id's alias,
/// so a push issued before adoption still reaches the adopted record.
pub struct PushTicket {
    lock: Option<Arc<Mutex<()>>>,
    registry: Arc<StdMutex<Registry>>,
}

impl Drop for PushTicket {
    fn drop(&mut self) {
        self.lock.take();
        lock_registry(&self.registry).sweep();
    }
}

impl<C: RecordConnector> PersistenceGateway<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            registry: Arc::new(StdMutex::new(Registry::default())),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn reserve(&self, id: &HabitId) -> PushTicket {
        PushTicket {
            lock: Some(self.registry().lock_for(id)),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Sends a new habit and returns the id the record store settled on.
    pub async fn push(&self, habit: &Habit) -> Result<HabitId, HabitError> {
        let (key, guard) = self.lock_habit(&habit.id).await;
        if key != habit.id {
            // Already acknowledged under another id.
            drop(guard);
            self.sweep();
            return Ok(key);
        }

        debug!(id = %habit.id, "pushing new habit");
        let result = self.create_remote(habit).await;
        if let Ok(stored) = &result {
            if stored != &habit.id {
                self.registry().aliases.insert(habit.id.clone(), stored.clone());
            }
        }
        drop(guard);
        self.sweep();
        result
    }

    /// Replaces the remote completion set for `id`.
    pub async fn push_toggle(
        &self,
        id: &HabitId,
        completed_dates: &[NaiveDate],
    ) -> Result<(), HabitError> {
        let (target, guard) = self.lock_habit(id).await;
        let result = self.send_completion(&target, completed_dates).await;
        drop(guard);
        self.sweep();
        result
    }

    pub async fn push_rename(&self, id: &HabitId, name: &str) -> Result<(), HabitError> {
        let (target, guard) = self.lock_habit(id).await;
        let result = self.send_name(&target, name).await;
        drop(guard);
        self.sweep();
        result
    }

    pub async fn push_delete(&self, id: &HabitId) -> Result<(), HabitError> {
        let (target, guard) = self.lock_habit(id).await;
        // Never acknowledged remotely, so there is nothing to delete.
        let result = if target.is_local() {
            Ok(())
        } else {
            debug!(id = %target, "pushing delete");
            self.delete_remote(&target).await
        };
        drop(guard);
        self.adopted(id);
        result
    }

    pub async fn fetch_all(&self) -> Result<Vec<Habit>, HabitError> {
        let mut conn = self.connector.connect().await?;
        let result = conn.list().await;
        conn.close().await;
        let habits = result?;
        debug!(count = habits.len(), "fetched remote habits");
        Ok(habits)
    }

    /// The remote id a local id was mapped to, if its create was acknowledged.
    pub fn alias_of(&self, id: &HabitId) -> Option<HabitId> {
        self.registry().aliases.get(id).cloned()
    }

    /// Marks a local id as settled so its alias can be dropped once no push
    /// still refers to it.
    pub fn adopted(&self, local: &HabitId) {
        let mut registry = self.registry();
        if registry.aliases.contains_key(local) {
            registry.adopted.insert(local.clone());
        }
        registry.sweep();
    }

    async fn create_remote(&self, habit: &Habit) -> Result<HabitId, HabitError> {
        let mut conn = self.connector.connect().await?;
        let result = conn.create(habit).await;
        conn.close().await;
        result.map(|stored| stored.id)
    }

    async fn send_completion(
        &self,
        target: &HabitId,
        completed_dates: &[NaiveDate],
    ) -> Result<(), HabitError> {
        acknowledged(target)?;
        debug!(id = %target, days = completed_dates.len(), "pushing completion set");
        let mut conn = self.connector.connect().await?;
        let result = conn.update_completion(target, completed_dates).await;
        conn.close().await;
        result
    }

    async fn send_name(&self, target: &HabitId, name: &str) -> Result<(), HabitError> {
        acknowledged(target)?;
        debug!(id = %target, "pushing rename");
        let mut conn = self.connector.connect().await?;
        let result = conn.update_name(target, name).await;
        conn.close().await;
        result
    }

    async fn delete_remote(&self, id: &HabitId) -> Result<(), HabitError> {
        let mut conn = self.connector.connect().await?;
        let result = conn.delete(id).await;
        conn.close().await;
        result
    }

    /// Locks the push slot of the record `id` currently resolves to and
    /// returns that id. Re-resolves if the id was adopted while waiting.
    async fn lock_habit(&self, id: &HabitId) -> (HabitId, OwnedMutexGuard<()>) {
        let mut key = self.registry().canonical(id);
        loop {
            let lock = self.registry().lock_for(&key);
            let guard = lock.lock_owned().await;
            let current = self.registry().canonical(id);
            if current == key || !key.is_local() {
                return (key, guard);
            }
            key = current;
        }
    }

    fn sweep(&self) {
        self.registry().sweep();
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        lock_registry(&self.registry)
    }

    /// Number of tracked push locks and aliases.
    #[cfg(test)]
    pub(crate) fn tracked(&self) -> (usize, usize) {
        let registry = self.registry();
        (registry.locks.len(), registry.aliases.len())
    }
}

fn lock_registry(registry: &StdMutex<Registry>) -> MutexGuard<'_, Registry> {
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn acknowledged(target: &HabitId) -> Result<(), HabitError> {
    if target.is_local() {
        return Err(HabitError::transport(format!(
            "habit {target} is not yet acknowledged by the record store"
        )));
    }
    Ok(())
}

/// Record stores this binary can talk to.
#[derive(Clone)]
pub enum RecordBackend {
    Memory(MemoryRecordStore),
    File(FileRecordStore),
}

pub enum BackendConnection {
    Memory(MemoryConnection),
    File(FileConnection),
}

impl RecordConnector for RecordBackend {
    type Connection = BackendConnection;

    async fn connect(&self) -> Result<BackendConnection, HabitError> {
        match self {
            Self::Memory(store) => store.open_connection().await.map(BackendConnection::Memory),
            Self::File(store) => store.open_connection().await.map(BackendConnection::File),
        }
    }
}

impl RecordConnection for BackendConnection {
    async fn list(&mut self) -> Result<Vec<Habit>, HabitError> {
        match self {
            Self::Memory(conn) => conn.list().await,
            Self::File(conn) => conn.list().await,
        }
    }

    async fn create(&mut self, habit: &Habit) -> Result<Habit, HabitError> {
        match self {
            Self::Memory(conn) => conn.create(habit).await,
            Self::File(conn) => conn.create(habit).await,
        }
    }

    async fn update_completion(
        &mut self,
        id: &HabitId,
        completed_dates: &[NaiveDate],
    ) -> Result<(), HabitError> {
        match self {
            Self::Memory(conn) => conn.update_completion(id, completed_dates).await,
            Self::File(conn) => conn.update_completion(id, completed_dates).await,
        }
    }

    async fn update_name(&mut self, id: &HabitId, name: &str) -> Result<(), HabitError> {
        match self {
            Self::Memory(conn) => conn.update_name(id, name).await,
            Self::File(conn) => conn.update_name(id, name).await,
        }
    }

    async fn delete(&mut self, id: &HabitId) -> Result<(), HabitError> {
        match self {
            Self::Memory(conn) => conn.delete(id).await,
            Self::File(conn) => conn.delete(id).await,
        }
    }

    async fn close(self) {
        match self {
            Self::Memory(conn) => conn.close().await,
            Self::File(conn) => conn.close().await,
        }
    }
}

/// Record collection shared by the in-memory and file stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordSet {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    habits: Vec<Habit>,
}

impl RecordSet {
    fn insert(&mut self, habit: &Habit) -> Result<Habit, HabitError> {
        if self.habits.iter().any(|stored| stored.id == habit.id) {
            return Err(HabitError::conflict(format!(
                "record {} already exists",
                habit.id
            )));
        }
        self.next_id += 1;
        let stored = Habit {
            id: HabitId::new(format!("{:024x}", self.next_id)),
            ..habit.clone()
        };
        self.habits.push(stored.clone());
        Ok(stored)
    }

    fn find_mut(&mut self, id: &HabitId) -> Result<&mut Habit, HabitError> {
        self.habits
            .iter_mut()
            .find(|habit| &habit.id == id)
            .ok_or_else(|| HabitError::not_found(id))
    }

    fn remove(&mut self, id: &HabitId) -> Result<(), HabitError> {
        let pos = self
            .habits
            .iter()
            .position(|habit| &habit.id == id)
            .ok_or_else(|| HabitError::not_found(id))?;
        self.habits.remove(pos);
        Ok(())
    }
}

/// Process-local record store with switches for simulating outages.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    records: StdMutex<RecordSet>,
    offline: AtomicBool,
    failing: AtomicBool,
    open: AtomicUsize,
    connects: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse new connections.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Accept connections but reject every operation.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    pub fn open_connections(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    pub fn total_connects(&self) -> u64 {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<Habit> {
        self.inner
            .records
            .lock()
            .map(|set| set.habits.clone())
            .unwrap_or_default()
    }

    async fn open_connection(&self) -> Result<MemoryConnection, HabitError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(HabitError::transport("record store unreachable"));
        }
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.open.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryConnection {
            inner: Arc::clone(&self.inner),
        })
    }
}

impl RecordConnector for MemoryRecordStore {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, HabitError> {
        self.open_connection().await
    }
}

pub struct MemoryConnection {
    inner: Arc<MemoryInner>,
}

impl MemoryConnection {
    fn with_records<T>(
        &self,
        op: impl FnOnce(&mut RecordSet) -> Result<T, HabitError>,
    ) -> Result<T, HabitError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(HabitError::transport("record store rejected the call"));
        }
        let mut records = self
            .inner
            .records
            .lock()
            .map_err(|_| HabitError::transport("record store poisoned"))?;
        op(&mut records)
    }
}

impl RecordConnection for MemoryConnection {
    async fn list(&mut self) -> Result<Vec<Habit>, HabitError> {
        self.with_records(|set| Ok(set.habits.clone()))
    }

    async fn create(&mut self, habit: &Habit) -> Result<Habit, HabitError> {
        self.with_records(|set| set.insert(habit))
    }

    async fn update_completion(
        &mut self,
        id: &HabitId,
        completed_dates: &[NaiveDate],
    ) -> Result<(), HabitError> {
        self.with_records(|set| {
            set.find_mut(id)?.completed_dates = completed_dates.to_vec();
            Ok(())
        })
    }

    async fn update_name(&mut self, id: &HabitId, name: &str) -> Result<(), HabitError> {
        self.with_records(|set| {
            set.find_mut(id)?.name = name.to_string();
            Ok(())
        })
    }

    async fn delete(&mut self, id: &HabitId) -> Result<(), HabitError> {
        self.with_records(|set| set.remove(id))
    }

    async fn close(self) {}
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.inner.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Record store kept in a JSON file. A connection holds the file exclusively
/// until it is closed.
#[derive(Clone)]
pub struct FileRecordStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open_connection(&self) -> Result<FileConnection, HabitError> {
        let guard = Arc::clone(&self.lock).lock_owned().await;
        let records = read_records(&self.path).await?;
        Ok(FileConnection {
            path: self.path.clone(),
            records,
            _guard: guard,
        })
    }
}

impl RecordConnector for FileRecordStore {
    type Connection = FileConnection;

    async fn connect(&self) -> Result<FileConnection, HabitError> {
        self.open_connection().await
    }
}

pub struct FileConnection {
    path: PathBuf,
    records: RecordSet,
    _guard: OwnedMutexGuard<()>,
}

impl FileConnection {
    async fn write(&self) -> Result<(), HabitError> {
        let payload = serde_json::to_vec_pretty(&self.records)
            .map_err(|err| HabitError::transport(err.to_string()))?;
        fs::write(&self.path, payload).await.map_err(|err| {
            warn!(path = %self.path.display(), "failed to write record file: {err}");
            HabitError::transport(err.to_string())
        })
    }
}

impl RecordConnection for FileConnection {
    async fn list(&mut self) -> Result<Vec<Habit>, HabitError> {
        Ok(self.records.habits.clone())
    }

    async fn create(&mut self, habit: &Habit) -> Result<Habit, HabitError> {
        let stored = self.records.insert(habit)?;
        self.write().await?;
        Ok(stored)
    }

    async fn update_completion(
        &mut self,
        id: &HabitId,
        completed_dates: &[NaiveDate],
    ) -> Result<(), HabitError> {
        self.records.find_mut(id)?.completed_dates = completed_dates.to_vec();
        self.write().await
    }

    async fn update_name(&mut self, id: &HabitId, name: &str) -> Result<(), HabitError> {
        self.records.find_mut(id)?.name = name.to_string();
        self.write().await
    }

    async fn delete(&mut self, id: &HabitId) -> Result<(), HabitError> {
        self.records.remove(id)?;
        self.write().await
    }

    async fn close(self) {}
}

async fn read_records(path: &Path) -> Result<RecordSet, HabitError> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
            warn!(path = %path.display(), "failed to parse record file: {err}");
            HabitError::transport(format!("corrupt record file: {err}"))
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(RecordSet::default()),
        Err(err) => Err(HabitError::transport(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habit(id: &str, name: &str) -> Habit {
        Habit::new(HabitId::new(id), name)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn temp_path(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "habit_tracker_gateway_{tag}_{}_{nanos}.json",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn push_adopts_remote_id_and_routes_later_calls() {
        let store = MemoryRecordStore::new();
        let gateway = PersistenceGateway::new(store.clone());
        let local = habit("local-1-1", "Read");

        let remote_id = gateway.push(&local).await.unwrap();
        assert_ne!(remote_id, local.id);
        assert_eq!(gateway.alias_of(&local.id), Some(remote_id.clone()));

        gateway.push_toggle(&local.id, &[day(2)]).await.unwrap();
        gateway.push_rename(&remote_id, "Read more").await.unwrap();
        let records = store.records();
        assert_eq!(records[0].id, remote_id);
        assert_eq!(records[0].name, "Read more");
        assert_eq!(records[0].completed_dates, vec![day(2)]);

        gateway.push_delete(&local.id).await.unwrap();
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn connections_are_released_on_every_path() {
        let store = MemoryRecordStore::new();
        let gateway = PersistenceGateway::new(store.clone());
        let id = gateway.push(&habit("local-1-1", "Read")).await.unwrap();

        let missing = gateway.push_toggle(&HabitId::new("nope"), &[]).await;
        assert!(matches!(missing, Err(HabitError::NotFound(_))));

        store.set_failing(true);
        assert!(matches!(
            gateway.fetch_all().await,
            Err(HabitError::Transport(_))
        ));
        assert!(gateway.push_delete(&id).await.is_err());
        store.set_failing(false);

        store.set_offline(true);
        assert!(matches!(
            gateway.push(&habit("local-1-2", "Run")).await,
            Err(HabitError::Transport(_))
        ));
        store.set_offline(false);

        assert_eq!(store.open_connections(), 0);
        assert_eq!(store.total_connects(), 4);
    }

    #[tokio::test]
    async fn unacknowledged_local_habits_are_not_sent() {
        let store = MemoryRecordStore::new();
        let gateway = PersistenceGateway::new(store.clone());
        let id = HabitId::new("local-9-9");

        let toggle = gateway.push_toggle(&id, &[day(1)]).await;
        assert!(matches!(toggle, Err(HabitError::Transport(_))));
        gateway.push_delete(&id).await.unwrap();
        assert_eq!(store.total_connects(), 0);
    }

    #[tokio::test]
    async fn create_with_existing_id_conflicts() {
        let store = MemoryRecordStore::new();
        let gateway = PersistenceGateway::new(store.clone());
        let id = gateway.push(&habit("local-1-1", "Read")).await.unwrap();

        let again = gateway.push(&habit(id.as_str(), "Read")).await;
        assert!(matches!(again, Err(HabitError::Conflict(_))));
    }

    #[tokio::test]
    async fn file_store_persists_between_connections() {
        let path = temp_path("file");
        let gateway = PersistenceGateway::new(FileRecordStore::new(&path));

        let id = gateway.push(&habit("local-1-1", "Read")).await.unwrap();
        gateway.push_toggle(&id, &[day(3), day(4)]).await.unwrap();

        let reopened = PersistenceGateway::new(FileRecordStore::new(&path));
        let habits = reopened.fetch_all().await.unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].id, id);
        assert_eq!(habits[0].completed_dates, vec![day(3), day(4)]);

        let missing = reopened.push_delete(&HabitId::new("nope")).await;
        assert!(matches!(missing, Err(HabitError::NotFound(_))));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn settled_aliases_and_idle_locks_are_forgotten() {
        let store = MemoryRecordStore::new();
        let gateway = PersistenceGateway::new(store.clone());
        let local = habit("local-1-1", "Read");

        let remote_id = gateway.push(&local).await.unwrap();
        assert_eq!(gateway.tracked(), (0, 1));

        // A push issued before adoption keeps the alias alive until it is done.
        let ticket = gateway.reserve(&local.id);
        gateway.adopted(&local.id);
        assert_eq!(gateway.alias_of(&local.id), Some(remote_id.clone()));
        gateway.push_toggle(&local.id, &[day(1)]).await.unwrap();
        assert_eq!(store.records()[0].completed_dates, vec![day(1)]);

        drop(ticket);
        assert_eq!(gateway.tracked(), (0, 0));
        assert_eq!(gateway.alias_of(&local.id), None);

        for d in 1..=5 {
            gateway.push_toggle(&remote_id, &[day(d)]).await.unwrap();
        }
        assert_eq!(gateway.tracked(), (0, 0));
    }

    #[tokio::test]
    async fn dropped_connection_is_released() {
        let store = MemoryRecordStore::new();
        let conn = store.connect().await.unwrap();
        assert_eq!(store.open_connections(), 1);
        drop(conn);
        assert_eq!(store.open_connections(), 0);
    }

    #[tokio::test]
    async fn backend_enum_delegates() {
        let memory = MemoryRecordStore::new();
        let gateway = PersistenceGateway::new(RecordBackend::Memory(memory.clone()));
        gateway.push(&habit("local-1-1", "Read")).await.unwrap();
        assert_eq!(gateway.fetch_all().await.unwrap().len(), 1);
        assert_eq!(memory.open_connections(), 0);
    }
}
