use crate::models::Habit;
use crate::stats::{overall_success_rate, streak};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write;

pub const REPORT_FILE_NAME: &str = "habit-tracker-report.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub habit_name: String,
    pub streak: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitReport {
    pub generated_for: NaiveDate,
    pub entries: Vec<ReportEntry>,
    pub overall_success_rate: u32,
}

pub fn build_report(snapshot: &[Habit], today: NaiveDate) -> HabitReport {
    HabitReport {
        generated_for: today,
        entries: snapshot
            .iter()
            .map(|habit| ReportEntry {
                habit_name: habit.name.clone(),
                streak: streak(habit, today),
            })
            .collect(),
        overall_success_rate: overall_success_rate(snapshot),
    }
}

pub fn render_text(report: &HabitReport) -> String {
    let mut out = String::from("Habit Tracker Report\n");
    let _ = writeln!(out, "Generated for {}", report.generated_for);
    out.push('\n');
    for entry in &report.entries {
        let _ = writeln!(out, "{}: {} day streak", entry.habit_name, entry.streak);
    }
    let _ = writeln!(out, "Overall Success Rate: {}%", report.overall_success_rate);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HabitId;
    use chrono::Duration;

    #[test]
    fn report_lists_streaks_and_success_rate() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mut read = Habit::new(HabitId::new("a"), "Read");
        for offset in 0..3 {
            read.toggle(today - Duration::days(offset));
        }
        let run = Habit::new(HabitId::new("b"), "Run");

        let report = build_report(&[read, run], today);
        assert_eq!(report.entries[0].streak, 3);
        assert_eq!(report.overall_success_rate, 5);

        let text = render_text(&report);
        assert!(text.starts_with("Habit Tracker Report\n"));
        assert!(text.contains("Read: 3 day streak\n"));
        assert!(text.contains("Run: 0 day streak\n"));
        assert!(text.ends_with("Overall Success Rate: 5%\n"));
    }
}
