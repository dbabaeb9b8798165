mod common;

use attendance_core::{domain::Role, time::ist_date};
use axum::http::{Method, StatusCode};
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use common::TestApp;
use serde_json::{json, Value};

/// A Monday at least two weeks out.
fn future_monday() -> NaiveDate {
    let mut day = ist_date(Utc::now()) + Duration::days(14);
    while day.weekday() != Weekday::Mon {
        day += Duration::days(1);
    }
    day
}

/// The first Monday of March next year: two full months of that year's accrual
/// (3 days under the default policy) are available by then.
fn next_year_march_monday() -> NaiveDate {
    let year = ist_date(Utc::now()).year() + 1;
    let mut day = NaiveDate::from_ymd_opt(year, 3, 1).unwrap();
    while day.weekday() != Weekday::Mon {
        day += Duration::days(1);
    }
    day
}

fn annual_leave(start: NaiveDate, end: NaiveDate) -> Value {
    json!({
        "leave_type": "annual",
        "start_date": start,
        "end_date": end,
    })
}

fn sick_leave(start: NaiveDate, end: NaiveDate) -> Value {
    json!({
        "leave_type": "sick",
        "start_date": start,
        "end_date": end,
        "reason": "flu",
    })
}

#[tokio::test]
async fn booking_counts_working_days_and_rejects_overlaps() {
    let app = TestApp::new();
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let cookie = app.cookie_for(&asha).await;
    let monday = future_monday();

    // Monday to the following Monday: six working days.
    let (status, created) = app
        .request(
            Method::POST,
            "/leave",
            Some(&cookie),
            Some(sick_leave(monday, monday + Duration::days(7))),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["days"], 6.0);
    assert_eq!(created["status"], "pending");

    let (status, _) = app
        .request(
            Method::POST,
            "/leave",
            Some(&cookie),
            Some(sick_leave(monday + Duration::days(7), monday + Duration::days(8))),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, mine) = app.request(Method::GET, "/leave", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["requests"].as_array().unwrap().len(), 1);
    // Sick leave does not touch the annual balance.
    assert_eq!(mine["balance"]["pending"], 0.0);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let app = TestApp::new();
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let cookie = app.cookie_for(&asha).await;
    let monday = future_monday();

    let cases = [
        sick_leave(monday + Duration::days(1), monday),
        // Saturday and Sunday only.
        sick_leave(monday + Duration::days(5), monday + Duration::days(6)),
        json!({ "leave_type": "sick", "start_date": monday, "end_date": monday + Duration::days(1), "half_day": true }),
        json!({ "leave_type": "sabbatical", "start_date": monday, "end_date": monday }),
    ];
    for body in cases {
        let (status, _) = app
            .request(Method::POST, "/leave", Some(&cookie), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    }

    let (status, half) = app
        .request(
            Method::POST,
            "/leave",
            Some(&cookie),
            Some(json!({ "leave_type": "unpaid", "start_date": monday, "end_date": monday, "half_day": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(half["days"], 0.5);
}

#[tokio::test]
async fn annual_leave_cannot_exceed_the_balance() {
    let app = TestApp::new();
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let cookie = app.cookie_for(&asha).await;
    let monday = next_year_march_monday();

    // Six weeks of working days is more than a full year's accrual.
    let (status, body) = app
        .request(
            Method::POST,
            "/leave",
            Some(&cookie),
            Some(annual_leave(monday, monday + Duration::days(41))),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn next_year_annual_leave_draws_on_next_years_accrual() {
    let app = TestApp::new();
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let cookie = app.cookie_for(&asha).await;
    let monday = next_year_march_monday();

    // Monday to Wednesday uses all three days accrued by then.
    let (status, created) = app
        .request(
            Method::POST,
            "/leave",
            Some(&cookie),
            Some(annual_leave(monday, monday + Duration::days(2))),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["days"], 3.0);

    for week in 1..10 {
        let start = monday + Duration::weeks(week);
        let (status, _) = app
            .request(
                Method::POST,
                "/leave",
                Some(&cookie),
                Some(annual_leave(start, start + Duration::days(4))),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT, "week {}", week);
    }

    // A February booking only has January's accrual behind it.
    let february = monday - Duration::weeks(4);
    let (status, _) = app
        .request(
            Method::POST,
            "/leave",
            Some(&cookie),
            Some(annual_leave(february, february + Duration::days(1))),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The current year's balance is untouched by next year's booking.
    let (_, mine) = app.request(Method::GET, "/leave", Some(&cookie), None).await;
    assert_eq!(mine["balance"]["pending"], 0.0);
}

#[tokio::test]
async fn annual_leave_cannot_span_two_years() {
    let app = TestApp::new();
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let cookie = app.cookie_for(&asha).await;
    let year = ist_date(Utc::now()).year() + 1;
    let start = NaiveDate::from_ymd_opt(year, 12, 29).unwrap();

    let (status, _) = app
        .request(
            Method::POST,
            "/leave",
            Some(&cookie),
            Some(annual_leave(start, start + Duration::days(4))),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/leave",
            Some(&cookie),
            Some(sick_leave(start, start + Duration::days(4))),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn concurrent_bookings_cannot_overdraw_the_balance() {
    let app = TestApp::new();
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let cookie = app.cookie_for(&asha).await;
    let monday = next_year_march_monday();
    let next_monday = monday + Duration::weeks(1);

    // Each fits the three available days on its own; together they do not.
    let ((first, _), (second, _)) = tokio::join!(
        app.request(
            Method::POST,
            "/leave",
            Some(&cookie),
            Some(annual_leave(monday, monday + Duration::days(2))),
        ),
        app.request(
            Method::POST,
            "/leave",
            Some(&cookie),
            Some(annual_leave(next_monday, next_monday + Duration::days(2))),
        ),
    );
    let mut statuses = [first, second];
    statuses.sort_by_key(|s| s.as_u16());
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let (_, mine) = app.request(Method::GET, "/leave", Some(&cookie), None).await;
    assert_eq!(mine["requests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cancelling_only_touches_own_pending_requests() {
    let app = TestApp::new();
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let ravi = app.seed_employee("Ravi", Role::Employee, "password1").await;
    let cookie = app.cookie_for(&asha).await;
    let other_cookie = app.cookie_for(&ravi).await;
    let monday = future_monday();

    let (_, created) = app
        .request(Method::POST, "/leave", Some(&cookie), Some(sick_leave(monday, monday)))
        .await;
    let cancel_uri = format!("/leave/{}/cancel", created["id"].as_str().unwrap());

    let (status, _) = app
        .request(Method::POST, &cancel_uri, Some(&other_cookie), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, cancelled) = app.request(Method::POST, &cancel_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, _) = app.request(Method::POST, &cancel_uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A cancelled request frees its dates.
    let (status, _) = app
        .request(Method::POST, "/leave", Some(&cookie), Some(sick_leave(monday, monday)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn admins_decide_pending_requests_once() {
    let app = TestApp::new();
    let admin = app.seed_employee("Meera", Role::Admin, "password1").await;
    let asha = app.seed_employee("Asha", Role::Employee, "password1").await;
    let admin_cookie = app.cookie_for(&admin).await;
    let cookie = app.cookie_for(&asha).await;
    let monday = future_monday();

    let (_, created) = app
        .request(Method::POST, "/leave", Some(&cookie), Some(sick_leave(monday, monday)))
        .await;
    let decision_uri = format!("/admin/leave/{}/decision", created["id"].as_str().unwrap());

    let (status, _) = app
        .request(Method::GET, "/admin/leave", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .request(Method::POST, &decision_uri, Some(&cookie), Some(json!({ "approve": true })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, pending) = app
        .request(Method::GET, "/admin/leave?status=pending", Some(&admin_cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);
    let (status, _) = app
        .request(Method::GET, "/admin/leave?status=maybe", Some(&admin_cookie), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, decided) = app
        .request(
            Method::POST,
            &decision_uri,
            Some(&admin_cookie),
            Some(json!({ "approve": true, "note": " get well " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "approved");
    assert_eq!(decided["decision_note"], "get well");
    assert_eq!(decided["decided_by"], admin.id.to_string());

    let (status, _) = app
        .request(Method::POST, &decision_uri, Some(&admin_cookie), Some(json!({ "approve": false })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/admin/leave/{}/decision", uuid::Uuid::new_v4()),
            Some(&admin_cookie),
            Some(json!({ "approve": true })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
