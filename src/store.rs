use crate::errors::HabitError;
use crate::models::{Habit, HabitId, normalize_name};
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;

/// Canonical in-process collection of habits, in display order.
///
/// Every operation validates before it mutates, so a failed call leaves the
/// collection untouched.
#[derive(Debug, Default)]
pub struct HabitStore {
    habits: Vec<Habit>,
    next_seq: u64,
}

impl HabitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from previously persisted habits, dropping repeated ids
    /// and repeated completion days.
    pub fn from_habits(habits: Vec<Habit>) -> Self {
        let mut seen = HashSet::new();
        let habits = habits
            .into_iter()
            .filter(|habit| seen.insert(habit.id.clone()))
            .map(|mut habit| {
                habit.dedup_dates();
                habit
            })
            .collect();
        Self { habits, next_seq: 0 }
    }

    pub fn create(&mut self, name: &str) -> Result<Habit, HabitError> {
        let name = normalize_name(name)?;
        let id = self.next_local_id();
        let habit = Habit::new(id, name);
        self.habits.push(habit.clone());
        Ok(habit)
    }

    pub fn toggle_completion(&mut self, id: &HabitId, day: NaiveDate) -> Result<Habit, HabitError> {
        let habit = self.get_mut(id)?;
        habit.toggle(day);
        Ok(habit.clone())
    }

    pub fn rename(&mut self, id: &HabitId, name: &str) -> Result<Habit, HabitError> {
        let name = normalize_name(name)?;
        let habit = self.get_mut(id)?;
        habit.name = name;
        Ok(habit.clone())
    }

    pub fn remove(&mut self, id: &HabitId) -> Result<Habit, HabitError> {
        let pos = self.position(id)?;
        Ok(self.habits.remove(pos))
    }

    /// Swaps a provisional id for the one the record store assigned.
    pub fn adopt_id(&mut self, old: &HabitId, new: HabitId) -> Result<Habit, HabitError> {
        let pos = self.position(old)?;
        if old == &new {
            return Ok(self.habits[pos].clone());
        }
        if self.habits.iter().any(|habit| habit.id == new) {
            return Err(HabitError::conflict(format!("id {new} is already in use")));
        }
        let habit = &mut self.habits[pos];
        habit.id = new;
        Ok(habit.clone())
    }

    pub fn replace_all(&mut self, mut habits: Vec<Habit>) -> Result<(), HabitError> {
        let mut seen = HashSet::new();
        for habit in &habits {
            if !seen.insert(&habit.id) {
                return Err(HabitError::conflict(format!("duplicate habit id {}", habit.id)));
            }
        }
        habits.iter_mut().for_each(Habit::dedup_dates);
        self.habits = habits;
        Ok(())
    }

    pub fn get(&self, id: &HabitId) -> Option<&Habit> {
        self.habits.iter().find(|habit| &habit.id == id)
    }

    pub fn list(&self) -> &[Habit] {
        &self.habits
    }

    fn get_mut(&mut self, id: &HabitId) -> Result<&mut Habit, HabitError> {
        self.habits
            .iter_mut()
            .find(|habit| &habit.id == id)
            .ok_or_else(|| HabitError::not_found(id))
    }

    fn position(&self, id: &HabitId) -> Result<usize, HabitError> {
        self.habits
            .iter()
            .position(|habit| &habit.id == id)
            .ok_or_else(|| HabitError::not_found(id))
    }

    fn next_local_id(&mut self) -> HabitId {
        let millis = Utc::now().timestamp_millis();
        loop {
            self.next_seq += 1;
            let id = HabitId::local(millis, self.next_seq);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[test]
    fn create_appends_trimmed_habit_with_local_id() {
        let mut store = HabitStore::new();
        let first = store.create("  Read ").unwrap();
        let second = store.create("Run").unwrap();

        assert_eq!(first.name, "Read");
        assert!(first.completed_dates.is_empty());
        assert!(first.id.is_local());
        assert_ne!(first.id, second.id);
        let names: Vec<_> = store.list().iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["Read", "Run"]);
    }

    #[test]
    fn create_rejects_whitespace_name() {
        let mut store = HabitStore::new();
        let err = store.create("   ").unwrap_err();
        assert!(matches!(err, HabitError::InvalidInput(_)));
        assert!(store.list().is_empty());
    }

    #[test]
    fn toggling_twice_restores_dates() {
        let mut store = HabitStore::new();
        let habit = store.create("Read").unwrap();
        store.toggle_completion(&habit.id, day(3)).unwrap();
        let before = store.get(&habit.id).unwrap().completed_dates.clone();

        let toggled = store.toggle_completion(&habit.id, day(4)).unwrap();
        assert_eq!(toggled.completed_dates, vec![day(3), day(4)]);
        let restored = store.toggle_completion(&habit.id, day(4)).unwrap();
        assert_eq!(restored.completed_dates, before);
    }

    #[test]
    fn toggle_unknown_id_is_not_found_without_change() {
        let mut store = HabitStore::new();
        store.create("Read").unwrap();
        let snapshot = store.list().to_vec();

        let err = store
            .toggle_completion(&HabitId::new("missing"), day(1))
            .unwrap_err();
        assert!(matches!(err, HabitError::NotFound(_)));
        assert_eq!(store.list(), snapshot.as_slice());
    }

    #[test]
    fn remove_deletes_and_reports_missing() {
        let mut store = HabitStore::new();
        let habit = store.create("Read").unwrap();
        store.remove(&habit.id).unwrap();
        assert!(store.list().is_empty());
        assert!(matches!(store.remove(&habit.id), Err(HabitError::NotFound(_))));
    }

    #[test]
    fn rename_validates_name() {
        let mut store = HabitStore::new();
        let habit = store.create("Read").unwrap();
        assert_eq!(store.rename(&habit.id, " Read more ").unwrap().name, "Read more");
        assert!(matches!(
            store.rename(&habit.id, ""),
            Err(HabitError::InvalidInput(_))
        ));
    }

    #[test]
    fn adopt_id_rejects_ids_in_use() {
        let mut store = HabitStore::new();
        let a = store.create("A").unwrap();
        let b = store.create("B").unwrap();

        let adopted = store.adopt_id(&a.id, HabitId::new("remote-a")).unwrap();
        assert_eq!(adopted.id.as_str(), "remote-a");
        assert!(store.get(&a.id).is_none());

        let err = store.adopt_id(&b.id, HabitId::new("remote-a")).unwrap_err();
        assert!(matches!(err, HabitError::Conflict(_)));
    }

    #[test]
    fn replace_all_rejects_duplicate_ids() {
        let mut store = HabitStore::new();
        let dup = vec![
            Habit::new(HabitId::new("x"), "A"),
            Habit::new(HabitId::new("x"), "B"),
        ];
        assert!(matches!(store.replace_all(dup), Err(HabitError::Conflict(_))));

        let from_disk = HabitStore::from_habits(vec![
            Habit::new(HabitId::new("x"), "A"),
            Habit::new(HabitId::new("x"), "B"),
        ]);
        assert_eq!(from_disk.list().len(), 1);
    }

    #[test]
    fn loaded_habits_keep_each_day_once() {
        let mut habit = Habit::new(HabitId::new("x"), "A");
        habit.completed_dates = vec![day(2), day(1), day(2), day(1), day(3)];

        let store = HabitStore::from_habits(vec![habit.clone()]);
        assert_eq!(store.list()[0].completed_dates, vec![day(2), day(1), day(3)]);

        let mut store = HabitStore::new();
        store.replace_all(vec![habit.clone()]).unwrap();
        assert_eq!(store.list()[0].completed_dates, vec![day(2), day(1), day(3)]);

        // A single toggle now clears the day instead of leaving a copy behind.
        let toggled = store.toggle_completion(&habit.id, day(2)).unwrap();
        assert!(!toggled.is_completed_on(day(2)));
    }
}
