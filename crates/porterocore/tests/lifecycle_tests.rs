//! End-to-end membership lifecycle at the storage level: catalog setup,
//! approval write, expiry selection, eviction bookkeeping.

mod common;

use porterocore::approval::{advance, ApprovalEvent, ApprovalState, PurchaseTarget, SessionStore};
use porterocore::core::utils::{expiry_after, format_ts, parse_ts};
use porterocore::storage::catalog::{create_category, create_plan, get_plan, NewPlan};
use porterocore::storage::get_connection;
use porterocore::storage::ledger::{expired_subscriptions, delete_subscription, upsert_subscription, NewSubscription};
use pretty_assertions::assert_eq;

#[test]
fn purchase_approval_and_sweep_lifecycle() {
    let (_dir, pool) = common::test_pool();
    let mut conn = get_connection(&pool).unwrap();

    // Admin builds the catalog
    let movies = create_category(&conn, "Movies").unwrap();
    let plan_id = create_plan(
        &conn,
        &NewPlan {
            category_id: movies,
            name: "VIP".to_string(),
            invite_link: "https://t.me/+vip".to_string(),
            price: "$10".to_string(),
            duration_days: 30,
            target_chat_id: -100555,
        },
    )
    .unwrap();

    // Buyer picks the plan and submits a screenshot
    let sessions = SessionStore::new();
    let buyer = 424242;
    sessions.begin(buyer, PurchaseTarget::Plan(plan_id));

    let state = ApprovalState::AwaitingProof;
    let state = advance(state, ApprovalEvent::SubmitProof).unwrap();
    assert_eq!(sessions.take(buyer), Some(PurchaseTarget::Plan(plan_id)));
    assert_eq!(state, ApprovalState::Submitted);

    // Admin approves: ledger write with exact expiry
    let state = advance(state, ApprovalEvent::Approve).unwrap();
    assert_eq!(state, ApprovalState::Approved);

    let plan = get_plan(&conn, plan_id).unwrap().unwrap();
    let joined = parse_ts("2026-03-01 10:00:00").unwrap();
    upsert_subscription(
        &mut conn,
        &NewSubscription {
            user_id: buyer,
            plan_id: Some(plan.id),
            plan_name: plan.name.clone(),
            target_chat_id: plan.target_chat_id,
            joined_at: format_ts(joined),
            expires_at: format_ts(expiry_after(joined, plan.duration_days)),
        },
    )
    .unwrap();

    // A sweep the day before expiry touches nothing
    let before = format_ts(expiry_after(joined, 29));
    assert!(expired_subscriptions(&conn, &before).unwrap().is_empty());

    // A sweep at T0+31d evicts the row
    let after = format_ts(expiry_after(joined, 31));
    let expired = expired_subscriptions(&conn, &after).unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].user_id, buyer);
    assert_eq!(expired[0].plan_name, "VIP");
    assert_eq!(expired[0].target_chat_id, -100555);
    assert_eq!(expired[0].expires_at, "2026-03-31 10:00:00");

    delete_subscription(&conn, expired[0].id).unwrap();

    // An immediate second sweep finds nothing
    assert!(expired_subscriptions(&conn, &after).unwrap().is_empty());
}
