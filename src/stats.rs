//! Habit analytics.
//!
//! Everything here is a pure function of a snapshot and an explicit anchor
//! day. Nothing reads the clock.

use crate::models::{Habit, HabitId};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashSet;

pub const STREAK_LOOKBACK_DAYS: i64 = 365;
pub const WEEK_DAYS: i64 = 7;
pub const SERIES_DAYS: i64 = 30;
pub const SUCCESS_WINDOW_DAYS: u64 = 30;

const ON_FIRE_STREAK: u32 = 7;
const TROPHY_STREAK: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Complete,
    Partial,
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StreakBadge {
    OnFire,
    Trophy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub completed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub status: CompletionStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub id: HabitId,
    pub name: String,
    pub streak: u32,
    pub badges: Vec<StreakBadge>,
    pub completed_today: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub today: NaiveDate,
    pub today_status: CompletionStatus,
    pub habits: Vec<HabitStats>,
    pub weekly_progress: u32,
    pub daily_series: Vec<DailyPoint>,
    pub overall_success_rate: u32,
}

pub fn build_stats_at(today: NaiveDate, snapshot: &[Habit]) -> StatsResponse {
    let habits = snapshot
        .iter()
        .map(|habit| {
            let streak = streak(habit, today);
            HabitStats {
                id: habit.id.clone(),
                name: habit.name.clone(),
                streak,
                badges: badges(streak),
                completed_today: habit.is_completed_on(today),
            }
        })
        .collect();

    StatsResponse {
        today,
        today_status: completion_status(snapshot, today),
        habits,
        weekly_progress: weekly_progress(snapshot, today),
        daily_series: daily_series(snapshot, today),
        overall_success_rate: overall_success_rate(snapshot),
    }
}

/// Consecutive completed days walking back from `today`, today included.
pub fn streak(habit: &Habit, today: NaiveDate) -> u32 {
    let done: HashSet<NaiveDate> = habit.completed_dates.iter().copied().collect();
    let mut count = 0;
    for offset in 0..STREAK_LOOKBACK_DAYS {
        if !done.contains(&(today - Duration::days(offset))) {
            break;
        }
        count += 1;
    }
    count
}

pub fn badges(streak: u32) -> Vec<StreakBadge> {
    let mut earned = Vec::new();
    if streak >= ON_FIRE_STREAK {
        earned.push(StreakBadge::OnFire);
    }
    if streak >= TROPHY_STREAK {
        earned.push(StreakBadge::Trophy);
    }
    earned
}

pub fn completion_status(snapshot: &[Habit], day: NaiveDate) -> CompletionStatus {
    let done = completed_on(snapshot, day);
    if done == 0 {
        CompletionStatus::Incomplete
    } else if done == snapshot.len() {
        CompletionStatus::Complete
    } else {
        CompletionStatus::Partial
    }
}

/// Percentage of possible completions over the trailing week ending `today`.
///
/// Returns 0 for an empty snapshot.
pub fn weekly_progress(snapshot: &[Habit], today: NaiveDate) -> u32 {
    let start = today - Duration::days(WEEK_DAYS - 1);
    let completed: u64 = snapshot
        .iter()
        .map(|habit| {
            habit
                .completed_dates
                .iter()
                .filter(|day| **day >= start && **day <= today)
                .count() as u64
        })
        .sum();
    percentage(completed, snapshot.len() as u64 * WEEK_DAYS as u64)
}

/// Completion counts for the 30 days ending at `today`, oldest first.
pub fn daily_series(snapshot: &[Habit], today: NaiveDate) -> Vec<DailyPoint> {
    (0..SERIES_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            DailyPoint {
                date,
                completed_count: completed_on(snapshot, date),
            }
        })
        .collect()
}

/// All-time markers against a 30-day allowance per habit, capped at 100.
pub fn overall_success_rate(snapshot: &[Habit]) -> u32 {
    let completed: u64 = snapshot
        .iter()
        .map(|habit| habit.completed_dates.len() as u64)
        .sum();
    percentage(completed, snapshot.len() as u64 * SUCCESS_WINDOW_DAYS).min(100)
}

/// Status of each day in a calendar month, for tile coloring.
pub fn month_calendar(snapshot: &[Habit], year: i32, month: u32) -> Option<Vec<DayStatus>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let statuses = first
        .iter_days()
        .take_while(|date| date.month0() == first.month0())
        .map(|date| DayStatus {
            date,
            status: completion_status(snapshot, date),
        })
        .collect();
    Some(statuses)
}

fn completed_on(snapshot: &[Habit], day: NaiveDate) -> usize {
    snapshot
        .iter()
        .filter(|habit| habit.is_completed_on(day))
        .count()
}

fn percentage(completed: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed * 200 + total) / (total * 2)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn habit(id: &str, days_ago: &[i64]) -> Habit {
        let mut habit = Habit::new(HabitId::new(id), id);
        for offset in days_ago {
            habit.toggle(anchor() - Duration::days(*offset));
        }
        habit
    }

    #[test]
    fn streak_is_zero_without_completions() {
        assert_eq!(streak(&habit("read", &[]), anchor()), 0);
    }

    #[test]
    fn streak_counts_back_to_first_gap() {
        let read = habit("read", &[0, 1, 2, 4, 5]);
        assert_eq!(streak(&read, anchor()), 3);
        assert_eq!(streak(&habit("run", &[0]), anchor()), 1);
        assert_eq!(streak(&habit("swim", &[1, 2]), anchor()), 0);
    }

    #[test]
    fn streak_stops_at_lookback_window() {
        let all: Vec<i64> = (0..400).collect();
        assert_eq!(streak(&habit("read", &all), anchor()), 365);
    }

    #[test]
    fn badges_follow_streak_thresholds() {
        assert!(badges(6).is_empty());
        assert_eq!(badges(7), vec![StreakBadge::OnFire]);
        assert_eq!(badges(30), vec![StreakBadge::OnFire, StreakBadge::Trophy]);
    }

    #[test]
    fn completion_status_classifies_days() {
        let today = anchor();
        assert_eq!(completion_status(&[], today), CompletionStatus::Incomplete);

        let a = habit("a", &[0]);
        let b = habit("b", &[]);
        assert_eq!(
            completion_status(&[a.clone(), b.clone()], today),
            CompletionStatus::Partial
        );
        assert_eq!(
            completion_status(&[b.clone()], today),
            CompletionStatus::Incomplete
        );

        let mut both = vec![a, habit("b", &[0])];
        assert_eq!(completion_status(&both, today), CompletionStatus::Complete);
        both[1].toggle(today);
        assert_ne!(completion_status(&both, today), CompletionStatus::Complete);
    }

    #[test]
    fn weekly_progress_uses_trailing_seven_days() {
        let today = anchor();
        assert_eq!(weekly_progress(&[], today), 0);

        // 6 and 7 days ago: only the former is inside the window.
        let a = habit("a", &[0, 1, 6, 7]);
        let b = habit("b", &[2]);
        // 4 of 14
        assert_eq!(weekly_progress(&[a, b], today), 29);

        let mut future = habit("c", &[0]);
        future.toggle(today + Duration::days(1));
        assert_eq!(weekly_progress(&[future], today), 14);
    }

    #[test]
    fn daily_series_is_thirty_contiguous_days() {
        let today = anchor();
        let snapshot = vec![habit("a", &[0, 29, 30]), habit("b", &[0])];
        let series = daily_series(&snapshot, today);

        assert_eq!(series.len(), 30);
        assert_eq!(series.last().unwrap().date, today);
        assert_eq!(series[0].date, today - Duration::days(29));
        for pair in series.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
        assert_eq!(series[0].completed_count, 1);
        assert_eq!(series[29].completed_count, 2);
        assert_eq!(daily_series(&[], today).len(), 30);
    }

    #[test]
    fn overall_success_rate_rounds_and_caps() {
        assert_eq!(overall_success_rate(&[]), 0);
        let a = habit("a", &[0, 1, 2]);
        let b = habit("b", &[]);
        // 3 of 60
        assert_eq!(overall_success_rate(&[a, b]), 5);

        let days: Vec<i64> = (0..45).collect();
        assert_eq!(overall_success_rate(&[habit("c", &days)]), 100);
    }

    #[test]
    fn month_calendar_covers_every_day() {
        let snapshot = vec![habit("a", &[0])];
        let january = month_calendar(&snapshot, 2026, 1).unwrap();
        assert_eq!(january.len(), 31);
        assert_eq!(january[4].status, CompletionStatus::Complete);
        assert_eq!(january[5].status, CompletionStatus::Incomplete);
        assert_eq!(month_calendar(&snapshot, 2028, 2).unwrap().len(), 29);
        assert!(month_calendar(&snapshot, 2026, 13).is_none());
    }

    #[test]
    fn stats_bundle_reports_each_habit() {
        let snapshot = vec![habit("read", &[0, 1, 2]), habit("run", &[1])];
        let stats = build_stats_at(anchor(), &snapshot);
        assert_eq!(stats.habits.len(), 2);
        assert_eq!(stats.habits[0].streak, 3);
        assert!(stats.habits[0].completed_today);
        assert_eq!(stats.habits[1].streak, 0);
        assert_eq!(stats.today_status, CompletionStatus::Partial);
        assert_eq!(stats.daily_series.len(), 30);
    }
}
