//! Integration tests against a real MongoDB deployment.
//!
//! These tests require a MongoDB server to be running.
//! Set MONGODB_URI (defaults to mongodb://localhost:27017) and run with --ignored.

mod common;

use std::time::Duration;

use basilisk_mongodb::{DatabaseOption, Registry};
use bson::doc;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Example {
    user_id: String,
    items: Option<Vec<Item>>,
}

#[derive(Debug, Serialize)]
struct Item {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
}

fn mongodb_uri() -> String {
    std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

#[tokio::test]
#[ignore] // Only run with --ignored flag when database is available
async fn test_insert_then_positional_update() -> Result<(), Box<dyn std::error::Error>> {
    common::init_tracing();

    let registry = Registry::new();
    let database = registry
        .new_database(
            &mongodb_uri(),
            "basilisk_test",
            &[
                DatabaseOption::MaxPoolSize(10),
                DatabaseOption::MaxConnIdleTime(Duration::from_secs(5)),
                DatabaseOption::MinPoolSize(1),
            ],
        )
        .await?;
    let collection = database.get_collection("examples")?;

    let dom = Example {
        user_id: "1".to_string(),
        items: Some(vec![
            Item { id: "Dsd0daX1".to_string(), kind: 1 },
            Item { id: "GpdH8J3R".to_string(), kind: 1 },
        ]),
    };
    let id = collection.insert_one(&dom).await?;

    let update = Example {
        user_id: String::new(),
        items: Some(vec![Item { id: String::new(), kind: 3 }]),
    };
    let outcome = collection
        .update_one(Some(doc! { "_id": id, "items.id": "GpdH8J3R" }), &update, None)
        .await?;

    assert_eq!(outcome.matched_count, 1);
    assert_eq!(outcome.modified_count, 1);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_unreachable_server_fails_fast() {
    let registry = Registry::new();

    let result = registry
        .new_database(
            "mongodb://127.0.0.1:1/?directConnection=true",
            "basilisk_test",
            &[DatabaseOption::PingTimeout(Duration::from_millis(500))],
        )
        .await;

    assert!(result.unwrap_err().is_retryable());
    assert!(registry.database("basilisk_test").is_none());
}
