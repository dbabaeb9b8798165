//! crates/attendance_core/src/scoring.rs
//!
//! The punctuality ("deep score") calculation.
//!
//! Every IST day of the trailing 14-day window that has at least one session earns up
//! to 3 points for arrival time, hours worked, check-out time and work mode. Two
//! cross-day bonuses are added on top (consistency of arrival times and the longest
//! run of early arrivals) and the total is capped at 42.
//!
//! The computation is a pure function of the sessions and "now". It never fails:
//! missing data degrades to zero scores and `None` fields.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::domain::{WorkMode, WorkSession};
use crate::time::{format_minutes, ist_date, minutes_since_midnight, window_dates};

pub const WINDOW_DAYS: u32 = 14;
pub const MAX_SCORE: f64 = 42.0;
pub const MAX_DAY_SCORE: f64 = 3.0;

/// Shown instead of an average when there is nothing to average.
pub const NO_AVERAGE: &str = "--:--";

const ON_TIME_TOLERANCE_MINUTES: i64 = 30;

//=========================================================================================
// Per-Day Tiers
//=========================================================================================

/// Arrival score for a first check-in at `minutes` past IST midnight.
pub fn base_score(minutes: u32) -> f64 {
    match minutes {
        m if m < 600 => 3.0,
        m if m < 660 => 2.0,
        m if m < 1020 => 1.0,
        _ => 0.5,
    }
}

pub fn hours_bonus(hours_worked: f64) -> f64 {
    if hours_worked >= 8.0 {
        0.5
    } else if hours_worked >= 6.0 {
        0.3
    } else if hours_worked >= 4.0 {
        0.1
    } else {
        0.0
    }
}

pub fn checkout_bonus(checkout_minutes: Option<u32>) -> f64 {
    match checkout_minutes {
        Some(m) if m >= 1020 => 0.3,
        Some(m) if m >= 960 => 0.2,
        Some(m) if m >= 900 => 0.1,
        _ => 0.0,
    }
}

pub fn mode_bonus(mode: WorkMode) -> f64 {
    match mode {
        WorkMode::Office => 0.2,
        WorkMode::Remote => 0.1,
    }
}

/// The score of a single calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayScore {
    pub date: NaiveDate,
    pub checkin_minutes: u32,
    pub checkout_minutes: Option<u32>,
    pub hours_worked: f64,
    pub mode: WorkMode,
    pub base_score: f64,
    pub hours_bonus: f64,
    pub checkout_bonus: f64,
    pub mode_bonus: f64,
    pub total_score: f64,
}

impl DayScore {
    pub fn compute(
        date: NaiveDate,
        checkin_minutes: u32,
        checkout_minutes: Option<u32>,
        hours_worked: f64,
        mode: WorkMode,
    ) -> Self {
        let mut day = Self {
            date,
            checkin_minutes,
            checkout_minutes,
            hours_worked,
            mode,
            base_score: base_score(checkin_minutes),
            hours_bonus: hours_bonus(hours_worked),
            checkout_bonus: checkout_bonus(checkout_minutes),
            mode_bonus: mode_bonus(mode),
            total_score: 0.0,
        };
        day.recompute_total();
        day
    }

    fn from_session(session: &WorkSession, now: DateTime<Utc>) -> Self {
        Self::compute(
            ist_date(session.checkin_at),
            minutes_since_midnight(session.checkin_at),
            session.checkout_at.map(minutes_since_midnight),
            session.hours_worked(now),
            session.mode,
        )
    }

    /// Folds a later session of the same day into this one. Arrival time and mode stay
    /// locked to the first session; hours and check-out follow whichever session
    /// worked the most.
    fn absorb(&mut self, session: &WorkSession, now: DateTime<Utc>) {
        let hours_worked = session.hours_worked(now);
        if hours_worked <= self.hours_worked {
            return;
        }
        self.hours_worked = hours_worked;
        self.checkout_minutes = session.checkout_at.map(minutes_since_midnight);
        self.hours_bonus = hours_bonus(hours_worked);
        self.checkout_bonus = checkout_bonus(self.checkout_minutes);
        self.recompute_total();
    }

    fn recompute_total(&mut self) {
        let sum = self.base_score + self.hours_bonus + self.checkout_bonus + self.mode_bonus;
        self.total_score = sum.min(MAX_DAY_SCORE);
    }
}

//=========================================================================================
// Cross-Day Bonuses
//=========================================================================================

/// Rewards arriving at a similar time every day. Needs at least three days of data.
pub fn consistency_bonus(checkin_minutes: &[u32]) -> f64 {
    if checkin_minutes.len() < 3 {
        return 0.0;
    }
    let n = checkin_minutes.len() as f64;
    let mean = checkin_minutes.iter().map(|&m| f64::from(m)).sum::<f64>() / n;
    let variance = checkin_minutes
        .iter()
        .map(|&m| (f64::from(m) - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let std_dev = variance.sqrt();

    if std_dev < 30.0 {
        2.0
    } else if std_dev < 60.0 {
        1.0
    } else if std_dev < 90.0 {
        0.5
    } else {
        0.0
    }
}

/// Longest run of consecutive recorded days that arrived before 10:00.
pub fn longest_early_streak(days: &[DayScore]) -> u32 {
    let mut current = 0;
    let mut longest = 0;
    for day in days {
        if day.base_score >= 3.0 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

pub fn streak_bonus(longest_streak: u32) -> f64 {
    match longest_streak {
        s if s >= 7 => 1.5,
        s if s >= 5 => 1.0,
        s if s >= 3 => 0.5,
        _ => 0.0,
    }
}

//=========================================================================================
// Aggregate
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinStatus {
    Early,
    OnTime,
    Late,
}

impl CheckinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckinStatus::Early => "early",
            CheckinStatus::OnTime => "on-time",
            CheckinStatus::Late => "late",
        }
    }

    /// Compares today's first check-in to the window average.
    pub fn classify(today_minutes: u32, average_minutes: u32) -> Self {
        let diff = i64::from(today_minutes) - i64::from(average_minutes);
        if diff < -ON_TIME_TOLERANCE_MINUTES {
            CheckinStatus::Early
        } else if diff > ON_TIME_TOLERANCE_MINUTES {
            CheckinStatus::Late
        } else {
            CheckinStatus::OnTime
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub punctuality_score: f64,
    pub max_score: f64,
    pub no_fill_days: u32,
    pub avg_checkin_time: String,
    pub avg_checkin_time_minutes: u32,
    pub today_checkin_time: Option<String>,
    pub checkin_status: Option<CheckinStatus>,
    pub consistency_bonus: f64,
    pub streak_bonus: f64,
    /// One entry per recorded day, oldest first.
    pub days: Vec<DayScore>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scores the sessions that fall in the 14-day IST window ending on `now`'s date.
/// Sessions outside the window are ignored.
pub fn compute_score(sessions: &[WorkSession], now: DateTime<Utc>) -> ScoreResult {
    let (first_day, today) = window_dates(now, WINDOW_DAYS);

    let mut ordered: Vec<&WorkSession> = sessions
        .iter()
        .filter(|s| {
            let date = ist_date(s.checkin_at);
            first_day <= date && date <= today
        })
        .collect();
    ordered.sort_by_key(|s| s.checkin_at);

    let mut by_date: BTreeMap<NaiveDate, DayScore> = BTreeMap::new();
    for session in ordered {
        match by_date.entry(ist_date(session.checkin_at)) {
            Entry::Vacant(slot) => {
                slot.insert(DayScore::from_session(session, now));
            }
            Entry::Occupied(mut slot) => slot.get_mut().absorb(session, now),
        }
    }
    let days: Vec<DayScore> = by_date.into_values().collect();

    let checkins: Vec<u32> = days.iter().map(|d| d.checkin_minutes).collect();
    let consistency = consistency_bonus(&checkins);
    let streak = streak_bonus(longest_early_streak(&days));
    let day_total: f64 = days.iter().map(|d| d.total_score).sum();
    let punctuality_score = round2((day_total + consistency + streak).min(MAX_SCORE));

    let average = if checkins.is_empty() {
        None
    } else {
        let sum: u64 = checkins.iter().map(|&m| u64::from(m)).sum();
        Some((sum as f64 / checkins.len() as f64).round() as u32)
    };

    let today_minutes = days
        .iter()
        .find(|d| d.date == today)
        .map(|d| d.checkin_minutes);

    let checkin_status = match (today_minutes, average) {
        (Some(t), Some(avg)) => Some(CheckinStatus::classify(t, avg)),
        _ => None,
    };

    ScoreResult {
        punctuality_score,
        max_score: MAX_SCORE,
        no_fill_days: WINDOW_DAYS.saturating_sub(days.len() as u32),
        avg_checkin_time: average
            .map(format_minutes)
            .unwrap_or_else(|| NO_AVERAGE.to_string()),
        avg_checkin_time_minutes: average.unwrap_or(0),
        today_checkin_time: today_minutes.map(format_minutes),
        checkin_status,
        consistency_bonus: consistency,
        streak_bonus: streak,
        days,
    }
}
