//! Catalog CRUD: categories, plans, cascade delete.

mod common;

use porterocore::core::AppError;
use porterocore::storage::catalog::{
    create_category, create_plan, delete_category, delete_plan, find_plan_by_name, get_category,
    get_plan, list_categories, list_plans, NewPlan,
};
use porterocore::storage::get_connection;
use pretty_assertions::assert_eq;

fn vip_plan(category_id: i64) -> NewPlan {
    NewPlan {
        category_id,
        name: "VIP".to_string(),
        invite_link: "https://t.me/+vip".to_string(),
        price: "$10".to_string(),
        duration_days: 30,
        target_chat_id: -100555,
    }
}

#[test]
fn category_create_and_list() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    let movies = create_category(&conn, "Movies").unwrap();
    let series = create_category(&conn, "Series").unwrap();

    let cats = list_categories(&conn).unwrap();
    assert_eq!(cats.len(), 2);
    assert_eq!(cats[0].name, "Movies");
    assert_eq!(cats[0].id, movies);
    assert_eq!(cats[1].id, series);

    assert_eq!(get_category(&conn, movies).unwrap().unwrap().name, "Movies");
    assert!(get_category(&conn, 999).unwrap().is_none());
}

#[test]
fn plan_requires_existing_category() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    let err = create_plan(&conn, &vip_plan(42)).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn plan_create_get_delete() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    let cat = create_category(&conn, "Movies").unwrap();
    let plan_id = create_plan(&conn, &vip_plan(cat)).unwrap();

    let plan = get_plan(&conn, plan_id).unwrap().unwrap();
    assert_eq!(plan.name, "VIP");
    assert_eq!(plan.price, "$10");
    assert_eq!(plan.duration_days, 30);
    assert_eq!(plan.target_chat_id, -100555);

    assert!(delete_plan(&conn, plan_id).unwrap());
    assert!(get_plan(&conn, plan_id).unwrap().is_none());
    assert!(!delete_plan(&conn, plan_id).unwrap());
}

#[test]
fn deleting_category_cascades_to_plans() {
    let (_dir, pool) = common::test_pool();
    let mut conn = get_connection(&pool).unwrap();

    let cat = create_category(&conn, "Movies").unwrap();
    let other = create_category(&conn, "Series").unwrap();
    create_plan(&conn, &vip_plan(cat)).unwrap();
    create_plan(
        &conn,
        &NewPlan {
            name: "Basic".to_string(),
            ..vip_plan(cat)
        },
    )
    .unwrap();
    create_plan(
        &conn,
        &NewPlan {
            name: "Other".to_string(),
            ..vip_plan(other)
        },
    )
    .unwrap();

    let removed_plans = delete_category(&mut conn, cat).unwrap();
    assert_eq!(removed_plans, 2);
    assert!(get_category(&conn, cat).unwrap().is_none());
    assert!(list_plans(&conn, cat).unwrap().is_empty());
    // The unrelated category is untouched
    assert_eq!(list_plans(&conn, other).unwrap().len(), 1);
}

#[test]
fn find_plan_by_name_is_case_insensitive() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    let cat = create_category(&conn, "Movies").unwrap();
    create_plan(&conn, &vip_plan(cat)).unwrap();

    assert!(find_plan_by_name(&conn, "vip").unwrap().is_some());
    assert!(find_plan_by_name(&conn, "VIP").unwrap().is_some());
    assert!(find_plan_by_name(&conn, "gold").unwrap().is_none());
}
