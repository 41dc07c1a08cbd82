//! Subscription ledger: expiry arithmetic, delete-then-insert, sweep selection.

mod common;

use porterocore::core::utils::{expiry_after, format_ts, parse_ts};
use porterocore::storage::get_connection;
use porterocore::storage::ledger::{
    all_subscriptions, delete_subscription, delete_subscription_for, expired_subscriptions,
    subscriptions_for_user, upsert_subscription, NewSubscription,
};
use pretty_assertions::assert_eq;

fn grant(user_id: i64, plan_name: &str, joined_at: &str, days: i64) -> NewSubscription {
    let joined = parse_ts(joined_at).unwrap();
    NewSubscription {
        user_id,
        plan_id: Some(1),
        plan_name: plan_name.to_string(),
        target_chat_id: -100555,
        joined_at: joined_at.to_string(),
        expires_at: format_ts(expiry_after(joined, days)),
    }
}

#[test]
fn expiry_is_join_date_plus_duration() {
    let (_dir, pool) = common::test_pool();
    let mut conn = get_connection(&pool).unwrap();

    upsert_subscription(&mut conn, &grant(7, "VIP", "2026-01-01 12:00:00", 30)).unwrap();

    let subs = subscriptions_for_user(&conn, 7).unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].joined_at, "2026-01-01 12:00:00");
    assert_eq!(subs[0].expires_at, "2026-01-31 12:00:00");
}

#[test]
fn reapproval_replaces_instead_of_stacking() {
    let (_dir, pool) = common::test_pool();
    let mut conn = get_connection(&pool).unwrap();

    upsert_subscription(&mut conn, &grant(7, "VIP", "2026-01-01 12:00:00", 30)).unwrap();
    upsert_subscription(&mut conn, &grant(7, "VIP", "2026-02-01 12:00:00", 30)).unwrap();

    let subs = subscriptions_for_user(&conn, 7).unwrap();
    assert_eq!(subs.len(), 1);
    // The second approval wins
    assert_eq!(subs[0].joined_at, "2026-02-01 12:00:00");
}

#[test]
fn different_plans_for_same_user_coexist() {
    let (_dir, pool) = common::test_pool();
    let mut conn = get_connection(&pool).unwrap();

    upsert_subscription(&mut conn, &grant(7, "VIP", "2026-01-01 12:00:00", 30)).unwrap();
    upsert_subscription(&mut conn, &grant(7, "Basic", "2026-01-01 12:00:00", 7)).unwrap();

    assert_eq!(subscriptions_for_user(&conn, 7).unwrap().len(), 2);
}

#[test]
fn sweep_selection_respects_the_boundary() {
    let (_dir, pool) = common::test_pool();
    let mut conn = get_connection(&pool).unwrap();

    // Expires exactly at "now": must NOT be selected
    upsert_subscription(&mut conn, &grant(1, "Exact", "2026-01-01 00:00:00", 31)).unwrap();
    // Already past: must be selected
    upsert_subscription(&mut conn, &grant(2, "Past", "2026-01-01 00:00:00", 30)).unwrap();
    // Well in the future
    upsert_subscription(&mut conn, &grant(3, "Future", "2026-01-01 00:00:00", 365)).unwrap();

    let expired = expired_subscriptions(&conn, "2026-02-01 00:00:00").unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].plan_name, "Past");
}

#[test]
fn second_sweep_finds_nothing_after_deletes() {
    let (_dir, pool) = common::test_pool();
    let mut conn = get_connection(&pool).unwrap();

    upsert_subscription(&mut conn, &grant(1, "A", "2026-01-01 00:00:00", 1)).unwrap();
    upsert_subscription(&mut conn, &grant(2, "B", "2026-01-01 00:00:00", 2)).unwrap();

    let now = "2026-03-01 00:00:00";
    let expired = expired_subscriptions(&conn, now).unwrap();
    assert_eq!(expired.len(), 2);

    for sub in &expired {
        assert!(delete_subscription(&conn, sub.id).unwrap());
    }

    assert!(expired_subscriptions(&conn, now).unwrap().is_empty());
    assert!(all_subscriptions(&conn).unwrap().is_empty());
}

#[test]
fn revoke_by_user_and_plan_name() {
    let (_dir, pool) = common::test_pool();
    let mut conn = get_connection(&pool).unwrap();

    upsert_subscription(&mut conn, &grant(7, "VIP", "2026-01-01 12:00:00", 30)).unwrap();

    assert!(delete_subscription_for(&conn, 7, "vip").unwrap());
    assert!(!delete_subscription_for(&conn, 7, "vip").unwrap());
    assert!(subscriptions_for_user(&conn, 7).unwrap().is_empty());
}
