#![cfg(feature = "database")]

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;

use boxdrop_core::BoxdropError;
use boxdrop_core::database::PostgresDatabase;
use boxdrop_core::database::ports::{BoxTypeRepository, DeliveryRepository, StoreRepository};
use boxdrop_core::domain::records::{NewBoxType, NewStore, StoreId, ValidDelivery};

async fn seed(db: &PostgresDatabase) -> Result<(StoreId, ValidDelivery)> {
    let store = db
        .stores()
        .create_store(NewStore {
            name: "Corner Market".into(),
            phone: Some("0501234567".into()),
            address: None,
            keywords: Some("corner market".into()),
        })
        .await?;
    let box_type = db
        .box_types()
        .create_box_type(NewBoxType {
            type_name: "Fruit Box".into(),
            keywords: None,
        })
        .await?;
    let delivery = ValidDelivery {
        store_id: store.id,
        box_type_id: box_type.id,
        date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        delivery_content: None,
        quantity_carton: 3,
        quantity_basket: 0,
        vehicle_number: None,
        exit_time: None,
    };
    Ok((store.id, delivery))
}

#[sqlx::test(migrator = "boxdrop_core::MIGRATOR")]
#[cfg_attr(not(feature = "pg-tests"), ignore = "requires DATABASE_URL")]
async fn duplicate_store_names_are_conflicts(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool);
    seed(&db).await?;

    let err = db
        .stores()
        .create_store(NewStore {
            name: "Corner Market".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BoxdropError::Conflict(_)));
    Ok(())
}

#[sqlx::test(migrator = "boxdrop_core::MIGRATOR")]
#[cfg_attr(not(feature = "pg-tests"), ignore = "requires DATABASE_URL")]
async fn receipt_context_joins_store_and_box_type(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool);
    let (_, new_delivery) = seed(&db).await?;
    let delivery = db.deliveries().create_delivery(new_delivery).await?;

    let context = db
        .deliveries()
        .load_receipt_context(delivery.id)
        .await?
        .expect("context exists");
    assert_eq!(context.store.name, "Corner Market");
    assert_eq!(
        context.box_type.map(|b| b.type_name).as_deref(),
        Some("Fruit Box")
    );
    assert_eq!(context.delivery.quantity_carton, 3);
    Ok(())
}

#[sqlx::test(migrator = "boxdrop_core::MIGRATOR")]
#[cfg_attr(not(feature = "pg-tests"), ignore = "requires DATABASE_URL")]
async fn receipts_are_write_once(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool);
    let (_, new_delivery) = seed(&db).await?;
    let first = db.deliveries().create_delivery(new_delivery.clone()).await?;
    let second = db.deliveries().create_delivery(new_delivery).await?;

    assert_eq!(db.deliveries().max_receipt_number().await?, None);

    let numbered = db
        .deliveries()
        .assign_receipt(first.id, 17421, "static/receipt_17421.png")
        .await?;
    assert_eq!(numbered.receipt_number, Some(17421));
    assert_eq!(db.deliveries().max_receipt_number().await?, Some(17421));

    let overwrite = db
        .deliveries()
        .assign_receipt(first.id, 17422, "static/receipt_17422.png")
        .await
        .unwrap_err();
    assert!(matches!(overwrite, BoxdropError::Conflict(_)));

    let reuse = db
        .deliveries()
        .assign_receipt(second.id, 17421, "static/receipt_17421.png")
        .await
        .unwrap_err();
    assert!(matches!(reuse, BoxdropError::Conflict(_)));
    Ok(())
}

#[sqlx::test(migrator = "boxdrop_core::MIGRATOR")]
#[cfg_attr(not(feature = "pg-tests"), ignore = "requires DATABASE_URL")]
async fn month_filter_matches_any_year(pool: PgPool) -> Result<()> {
    let db = PostgresDatabase::from_pool(pool);
    let (store_id, template) = seed(&db).await?;

    for date in [
        NaiveDate::from_ymd_opt(2023, 3, 30).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
    ] {
        db.deliveries()
            .create_delivery(ValidDelivery {
                date,
                ..template.clone()
            })
            .await?;
    }

    let march = db
        .deliveries()
        .list_deliveries_for_store_month(store_id, 3)
        .await?;
    assert_eq!(march.len(), 2);
    assert!(march[0].date < march[1].date);
    Ok(())
}
