//! Runs against a live Postgres. Set DATABASE_URL and use `cargo test -- --ignored`.

use rust_decimal_macros::dec;
use shelf_catalog::Product;
use shelf_core::{Catalog, ProductQuery, ProductRepository};
use shelf_store::{DbClient, PgProductRepository};
use std::sync::Arc;

async fn repository() -> PgProductRepository {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = DbClient::new(&url, 2).await.expect("connect");
    db.migrate().await.expect("migrate");
    let repo = PgProductRepository::new(db.pool);
    repo.remove_all().await.expect("clean table");
    repo
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_pg_crud_cycle() {
    let repo = repository().await;

    let created = repo
        .insert(&Product::new("PG-1", "Vacuum Cleaner", dec!(123.456)).with_description("d"))
        .await
        .unwrap();
    let id = created.id.unwrap();
    // NUMERIC(10,2) keeps two fractional digits
    assert_eq!(created.price, dec!(123.46));
    assert_eq!(created.likes, 0);

    let liked = repo.like(id).await.unwrap().unwrap();
    assert_eq!(liked.likes, 1);
    assert!(liked.updated_time > created.updated_time);

    let updated = repo
        .update(id, &Product::new("PG-1", "Vacuum", dec!(99)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Vacuum");
    assert_eq!(updated.likes, 1);
    assert_eq!(updated.created_time, created.created_time);

    assert!(repo.delete(id).await.unwrap());
    assert!(!repo.delete(id).await.unwrap());
    assert!(repo.find(id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_pg_duplicate_sku_rolls_back() {
    let catalog = Catalog::new(Arc::new(repository().await));

    catalog.create(Product::new("DUP", "first", dec!(1))).await.unwrap();
    let err = catalog.create(Product::new("DUP", "second", dec!(2))).await.unwrap_err();
    assert_eq!(err.reason(), "persistence");

    let all = catalog.all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "first");
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn test_pg_price_filters() {
    let repo = repository().await;
    for (i, price) in [dec!(30), dec!(60), dec!(90), dec!(120)].into_iter().enumerate() {
        repo.insert(&Product::new(format!("P{i}"), "priced", price)).await.unwrap();
    }

    let range = repo
        .search(&ProductQuery::PriceRange { min: dec!(50), max: dec!(100) })
        .await
        .unwrap();
    let prices: Vec<_> = range.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![dec!(60), dec!(90)]);

    assert_eq!(repo.search(&ProductQuery::MinPrice(dec!(75))).await.unwrap().len(), 2);
    assert_eq!(repo.search(&ProductQuery::MaxPrice(dec!(75))).await.unwrap().len(), 2);
    assert_eq!(repo.search(&ProductQuery::Name("priced".into())).await.unwrap().len(), 4);
}
