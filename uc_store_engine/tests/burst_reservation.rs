//! Contention tests: two orders racing for the last codes in the pool must never both win.
mod support;

use support::*;
use uc_store_engine::{
    db_types::NewOrder,
    recipes::RecipeBook,
    StorefrontDatabase,
};

#[tokio::test]
async fn the_last_stock_code_is_claimed_by_exactly_one_order() {
    let db = new_db().await;
    let alice = customer_with_balance(&db, 3001, "20.00").await;
    let bob = customer_with_balance(&db, 3002, "20.00").await;
    db.add_stock_code("LAST-ONE", 60).await.unwrap();
    let item = stock_item(1, "5.00", 60);

    let order_a = db.insert_order(NewOrder::for_item(alice.id, &item, 1).unwrap()).await.unwrap();
    let order_b = db.insert_order(NewOrder::for_item(bob.id, &item, 1).unwrap()).await.unwrap();

    let db_a = db.clone();
    let db_b = db.clone();
    let (res_a, res_b) = tokio::join!(db_a.reserve_stock_codes(&order_a), db_b.reserve_stock_codes(&order_b));

    let winners = [res_a.is_ok(), res_b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one reservation must win: {res_a:?} vs {res_b:?}");
    let winner_id = if res_a.is_ok() { order_a.id } else { order_b.id };
    let winner = db.fetch_order(winner_id).await.unwrap().unwrap();
    let codes = db.codes_for_order(&winner).await.unwrap();
    assert_eq!(codes, vec!["LAST-ONE".to_string()]);
}

#[tokio::test]
async fn racing_uc_reservations_never_leave_a_half_claimed_order() {
    let db = new_db().await;
    let alice = customer_with_balance(&db, 3003, "20.00").await;
    let bob = customer_with_balance(&db, 3004, "20.00").await;
    // one recipe's worth of codes for two competing 720 orders
    db.add_uc_code("UC-360-A", 360, false).await.unwrap();
    db.add_uc_code("UC-360-B", 360, false).await.unwrap();
    let item = uc_item(1, "9.50", 720);
    let recipes = RecipeBook::standard();

    let order_a =
        db.insert_order(NewOrder::for_item(alice.id, &item, 1).unwrap().with_player_id("111")).await.unwrap();
    let order_b =
        db.insert_order(NewOrder::for_item(bob.id, &item, 1).unwrap().with_player_id("222")).await.unwrap();

    let db_a = db.clone();
    let db_b = db.clone();
    let recipes_a = recipes.clone();
    let recipes_b = recipes.clone();
    let (res_a, res_b) =
        tokio::join!(db_a.reserve_uc_codes(&order_a, &recipes_a), db_b.reserve_uc_codes(&order_b, &recipes_b));

    let winners = [res_a.is_ok(), res_b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one reservation must win: {res_a:?} vs {res_b:?}");
    let (winner_order, loser_order) = if res_a.is_ok() { (order_a, order_b) } else { (order_b, order_a) };
    let winner_codes = db.codes_for_order(&winner_order).await.unwrap();
    assert_eq!(winner_codes.len(), 2);
    // the loser's transaction rolled back completely: no codes dangle on it
    let loser_codes = db.codes_for_order(&loser_order).await.unwrap();
    assert!(loser_codes.is_empty());
}

#[tokio::test]
async fn a_reservation_retry_after_winning_is_a_no_op() {
    let db = new_db().await;
    let alice = customer_with_balance(&db, 3005, "20.00").await;
    db.add_uc_code("UC-720-A", 720, false).await.unwrap();
    let item = uc_item(1, "9.50", 720);
    let recipes = RecipeBook::standard();
    let order = db.insert_order(NewOrder::for_item(alice.id, &item, 1).unwrap().with_player_id("333")).await.unwrap();

    let first = db.reserve_uc_codes(&order, &recipes).await.unwrap();
    assert!(!first.already_reserved);
    assert_eq!(first.codes, vec!["UC-720-A".to_string()]);

    let second = db.reserve_uc_codes(&order, &recipes).await.unwrap();
    assert!(second.already_reserved);
    assert_eq!(second.codes, first.codes);
}
