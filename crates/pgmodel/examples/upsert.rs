//! Upsert example: INSERT ... ON CONFLICT with a unique target column.
//!
//! Run with: cargo run --example upsert -p pgmodel
//!
//! Set DATABASE_URL in .env file or environment variable.

use pgmodel::{Conflict, DatabaseClient, Model, ModelConfig, ModelError, create_pool, row};
use std::env;

#[tokio::main]
async fn main() -> Result<(), ModelError> {
    dotenvy::dotenv().ok();

    let database_url =
        env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env or environment");

    let pool = create_pool(&database_url)?;
    let client = pool.get().await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS settings (
                id BIGSERIAL PRIMARY KEY,
                key TEXT NOT NULL UNIQUE,
                value JSONB,
                created_at TIMESTAMPTZ,
                updated_at TIMESTAMPTZ
            )",
            &[],
        )
        .await?;
    client.execute("DELETE FROM settings", &[]).await?;

    let settings = Model::new(ModelConfig::new("settings"), &client);

    // First upsert inserts; the row comes back with its primary key.
    let mut row = row!({"key": "theme", "value": {"mode": "dark"}});
    settings
        .upsert(&mut row, Some(Conflict::target(["key"])))
        .await?;
    println!("Inserted: {row:?}");

    // Second upsert hits the unique key and updates in place; updated_at is
    // refreshed even though the caller never set it.
    let mut row = row!({"key": "theme", "value": {"mode": "light"}});
    settings
        .upsert(&mut row, Some(Conflict::target(["key"])))
        .await?;
    println!("Upserted: {row:?}");

    let stored = settings.find_one(row!({"key": "theme"}), None).await?;
    println!("Stored: {stored:?}");

    Ok(())
}
