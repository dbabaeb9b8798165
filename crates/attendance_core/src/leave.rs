//! crates/attendance_core/src/leave.rs
//!
//! Leave arithmetic: how many working days a request covers, how much annual leave
//! an employee has accrued, and what is still available to book.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::cmp::Ordering;

use crate::domain::{LeaveRequest, LeaveStatus, LeaveType, NewLeaveRequest};
use crate::ports::{PortError, PortResult};

/// Accrual settings for annual leave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeavePolicy {
    pub accrual_per_month: f64,
    pub annual_cap: f64,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            accrual_per_month: 1.5,
            annual_cap: 18.0,
        }
    }
}

fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of Monday–Friday dates in `[start, end]`.
pub fn working_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut count = 0;
    let mut day = start;
    while day <= end {
        if is_working_day(day) {
            count += 1;
        }
        day += Duration::days(1);
    }
    count
}

/// Validates a requested range and returns how many leave days it costs.
pub fn requested_days(start: NaiveDate, end: NaiveDate, half_day: bool) -> PortResult<f64> {
    if end < start {
        return Err(PortError::Invalid(
            "end_date must not be before start_date".to_string(),
        ));
    }
    if half_day && start != end {
        return Err(PortError::Invalid(
            "A half-day request must start and end on the same day".to_string(),
        ));
    }
    let days = working_days_between(start, end);
    if days == 0 {
        return Err(PortError::Invalid(
            "The requested range contains no working days".to_string(),
        ));
    }
    Ok(if half_day { 0.5 } else { f64::from(days) })
}

/// Whole calendar months from `from` up to `to`.
fn full_months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Annual leave accrued in `as_of`'s calendar year. Accrual starts on 1 January, or on
/// the joining date for people who joined during the year.
pub fn accrued_days(joined_on: NaiveDate, as_of: NaiveDate, policy: &LeavePolicy) -> f64 {
    let year_start = NaiveDate::from_ymd_opt(as_of.year(), 1, 1).unwrap_or(as_of);
    let from = joined_on.max(year_start);
    let months = full_months_between(from, as_of);
    (f64::from(months) * policy.accrual_per_month).min(policy.annual_cap)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaveBalance {
    pub accrued: f64,
    pub used: f64,
    pub pending: f64,
    pub available: f64,
}

/// Derives the annual leave balance for `as_of`'s calendar year from an employee's
/// requests. Only annual leave starting in that year counts.
pub fn balance(
    joined_on: NaiveDate,
    as_of: NaiveDate,
    requests: &[LeaveRequest],
    policy: &LeavePolicy,
) -> LeaveBalance {
    let accrued = accrued_days(joined_on, as_of, policy);
    let same_year = |r: &&LeaveRequest| {
        r.leave_type.draws_on_balance() && r.start_date.year() == as_of.year()
    };
    let total = |status: LeaveStatus| {
        requests
            .iter()
            .filter(same_year)
            .filter(|r| r.status == status)
            .fold(0.0, |acc, r| acc + r.days)
    };

    let used = total(LeaveStatus::Approved);
    let pending = total(LeaveStatus::Pending);
    LeaveBalance {
        accrued,
        used,
        pending,
        available: accrued - used - pending,
    }
}

/// The date a booking starting on `start` is measured against. Leave in the
/// current year uses what has accrued by `today`, leave in a later year what will
/// have accrued by its start date, and leave in a past year the whole year.
pub fn accrual_date(today: NaiveDate, start: NaiveDate) -> NaiveDate {
    match start.year().cmp(&today.year()) {
        Ordering::Greater => start,
        Ordering::Equal => today,
        Ordering::Less => NaiveDate::from_ymd_opt(start.year(), 12, 31).unwrap_or(start),
    }
}

/// The balance a new request starting on `start` draws on.
pub fn booking_balance(
    joined_on: NaiveDate,
    today: NaiveDate,
    start: NaiveDate,
    requests: &[LeaveRequest],
    policy: &LeavePolicy,
) -> LeaveBalance {
    balance(joined_on, accrual_date(today, start), requests, policy)
}

/// Checks that a new request of `days` of `leave_type` fits the balance.
pub fn ensure_affordable(leave_type: LeaveType, days: f64, balance: &LeaveBalance) -> PortResult<()> {
    if leave_type.draws_on_balance() && days > balance.available {
        return Err(PortError::Conflict(format!(
            "Insufficient annual leave: requested {} day(s), {} available",
            days, balance.available
        )));
    }
    Ok(())
}

/// Pending and approved requests hold their dates; rejected and cancelled ones do not.
pub fn is_active(request: &LeaveRequest) -> bool {
    matches!(request.status, LeaveStatus::Pending | LeaveStatus::Approved)
}

/// Inclusive on both ends.
pub fn overlaps(request: &LeaveRequest, start: NaiveDate, end: NaiveDate) -> bool {
    request.start_date <= end && start <= request.end_date
}

/// Everything a new request is checked against before it is stored.
#[derive(Debug, Clone, Copy)]
pub struct BookingRules {
    pub joined_on: NaiveDate,
    pub today: NaiveDate,
    pub policy: LeavePolicy,
}

impl BookingRules {
    /// Validates `request` against the employee's `existing` requests: annual leave
    /// must stay within one calendar year, dates may not overlap an active request,
    /// and annual leave must fit the balance of the year it falls in.
    pub fn check(&self, request: &NewLeaveRequest, existing: &[LeaveRequest]) -> PortResult<()> {
        if request.leave_type.draws_on_balance()
            && request.start_date.year() != request.end_date.year()
        {
            return Err(PortError::Invalid(
                "Annual leave cannot span two calendar years; book each year separately"
                    .to_string(),
            ));
        }
        if existing
            .iter()
            .any(|r| is_active(r) && overlaps(r, request.start_date, request.end_date))
        {
            return Err(PortError::Conflict(
                "The requested dates overlap an existing leave request".to_string(),
            ));
        }
        let available = booking_balance(
            self.joined_on,
            self.today,
            request.start_date,
            existing,
            &self.policy,
        );
        ensure_affordable(request.leave_type, request.days, &available)
    }
}
