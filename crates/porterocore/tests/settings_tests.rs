//! Settings singleton: accessors, payment rails, bundle configuration.

mod common;

use porterocore::forms::PaymentRail;
use porterocore::storage::get_connection;
use porterocore::storage::settings::{
    get_settings, set_bundle, set_notify_target, set_payment_rail, set_update_link,
};
use pretty_assertions::assert_eq;

#[test]
fn fresh_database_has_empty_singleton() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    let settings = get_settings(&conn).unwrap();
    assert_eq!(settings.notify_chat_id, None);
    assert!(!settings.has_payment_rails());
    assert!(settings.bundle().is_none());
}

#[test]
fn payment_rails_round_trip() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    set_payment_rail(&conn, PaymentRail::Upi, "someone@bank").unwrap();
    set_payment_rail(&conn, PaymentRail::Crypto, "bc1qxyz").unwrap();

    let settings = get_settings(&conn).unwrap();
    assert_eq!(settings.payment_upi.as_deref(), Some("someone@bank"));
    assert_eq!(settings.payment_crypto.as_deref(), Some("bc1qxyz"));
    assert_eq!(settings.payment_paypal, None);
    assert!(settings.has_payment_rails());
}

#[test]
fn bundle_requires_all_three_fields() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    let links = vec!["https://t.me/+a".to_string(), "https://t.me/+b".to_string()];
    set_bundle(&conn, &links, "$25", 90).unwrap();

    let bundle = get_settings(&conn).unwrap().bundle().unwrap();
    assert_eq!(bundle.links, links);
    assert_eq!(bundle.price, "$25");
    assert_eq!(bundle.duration_days, 90);
}

#[test]
fn notify_target_and_update_link() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    set_notify_target(&conn, Some(-100777)).unwrap();
    set_update_link(&conn, "https://t.me/portero_updates").unwrap();

    let settings = get_settings(&conn).unwrap();
    assert_eq!(settings.notify_chat_id, Some(-100777));
    assert_eq!(settings.update_link.as_deref(), Some("https://t.me/portero_updates"));

    set_notify_target(&conn, None).unwrap();
    assert_eq!(get_settings(&conn).unwrap().notify_chat_id, None);
}
