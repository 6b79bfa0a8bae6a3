mod support;

use chrono::Duration;
use support::*;
use uc_store_engine::{db_types::Currency, AccountManagement, OrderFlowError};
use ucs_common::Usdt;

#[tokio::test]
async fn wallet_deposits_get_a_unique_amount_to_pay() {
    let db = new_db().await;
    let customer = customer_with_balance(&db, 4001, "0").await;
    let api = topup_api(&db, 95.5);

    let first = api.create_topup(customer.id, Usdt::from_whole(25), Currency::Usdt, None).await.unwrap();
    let second = api.create_topup(customer.id, Usdt::from_whole(25), Currency::Usdt, None).await.unwrap();

    // base commission 0.03 plus at least one 0.001 disambiguation step
    assert_eq!(first.to_pay, Usdt::from_milli(25_031));
    assert_eq!(second.to_pay, Usdt::from_milli(25_032));
    assert_eq!(first.amount + first.commission, first.to_pay);
    assert!(!first.is_paid);
    assert!(!first.is_topped);
}

#[tokio::test]
async fn confirming_a_payment_credits_the_base_amount_exactly_once() {
    let db = new_db().await;
    let customer = customer_with_balance(&db, 4002, "0").await;
    let api = topup_api(&db, 95.5);
    let topup = api.create_topup(customer.id, Usdt::from_whole(25), Currency::Usdt, None).await.unwrap();

    let credited = api.confirm_payment(topup.id, Some("0xdeadbeef")).await.unwrap().unwrap();
    assert!(credited.is_paid);
    assert!(credited.is_topped);
    assert_eq!(credited.tx_id.as_deref(), Some("0xdeadbeef"));
    let balance = db.fetch_customer(customer.id).await.unwrap().unwrap().balance;
    assert_eq!(balance, Usdt::from_whole(25));

    // a replayed payment notification must not credit twice
    assert!(api.confirm_payment(topup.id, Some("0xdeadbeef")).await.unwrap().is_none());
    let balance = db.fetch_customer(customer.id).await.unwrap().unwrap().balance;
    assert_eq!(balance, Usdt::from_whole(25));
}

#[tokio::test]
async fn ruble_deposits_convert_at_the_configured_rate() {
    let db = new_db().await;
    let customer = customer_with_balance(&db, 4003, "0").await;
    let api = topup_api(&db, 95.5);
    let topup = api
        .create_topup(customer.id, Usdt::from_whole(955), Currency::Rub, Some("https://pay.example/42".into()))
        .await
        .unwrap();
    // ruble deposits carry no commission; the gateway reference tells them apart
    assert_eq!(topup.to_pay, Usdt::from_whole(955));
    assert_eq!(topup.commission, Usdt::default());
    assert_eq!(topup.payment_url.as_deref(), Some("https://pay.example/42"));

    api.confirm_payment(topup.id, None).await.unwrap().unwrap();
    let balance = db.fetch_customer(customer.id).await.unwrap().unwrap().balance;
    assert_eq!(balance, Usdt::from_whole(10));
}

#[tokio::test]
async fn zero_and_negative_deposits_are_rejected() {
    let db = new_db().await;
    let customer = customer_with_balance(&db, 4004, "0").await;
    let api = topup_api(&db, 95.5);
    let err = api.create_topup(customer.id, Usdt::default(), Currency::Usdt, None).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidAmount));
    let err = api.create_topup(customer.id, Usdt::from_whole(-5), Currency::Usdt, None).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidAmount));
}

#[tokio::test]
async fn the_expiry_sweep_only_deletes_never_paid_deposits() {
    let db = new_db().await;
    let customer = customer_with_balance(&db, 4005, "0").await;
    let api = topup_api(&db, 95.5);
    let stale = api.create_topup(customer.id, Usdt::from_whole(10), Currency::Usdt, None).await.unwrap();
    let paid = api.create_topup(customer.id, Usdt::from_whole(20), Currency::Usdt, None).await.unwrap();
    api.confirm_payment(paid.id, None).await.unwrap();

    // a generous lifetime keeps everything
    let swept = api.expire_stale(Duration::hours(1)).await.unwrap();
    assert_eq!(swept.deleted, 0);

    // a cutoff in the future sweeps the unpaid deposit but never the paid one
    let swept = api.expire_stale(Duration::seconds(-5)).await.unwrap();
    assert_eq!(swept.deleted, 1);
    assert!(api.fetch_topup(stale.id).await.unwrap().is_none());
    assert!(api.fetch_topup(paid.id).await.unwrap().is_some());
}
