//! Database seeders for demo data
//!
//! Sample listings make an empty marketplace browsable on first run. They are
//! inserted once, only when the items table is empty.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

/// Seed a handful of sample listings owned by the given user.
///
/// A no-op when any items already exist, so restarting the server never
/// duplicates data.
pub async fn seed_sample_listings(pool: &SqlitePool, owner_id: &str) -> Result<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    info!("Seeding sample listings...");

    // Format: (title, description, category, price_per_day, location, images)
    let listings: Vec<(&str, &str, &str, f64, &str, &str)> = vec![
        (
            "Mountain Bike",
            "Hardtail mountain bike, 29\" wheels, recently serviced. Helmet included.",
            "Sports & Outdoors",
            18.0,
            "Portland, OR",
            r#"["https://images.rentcycle.local/seed/mountain-bike.jpg"]"#,
        ),
        (
            "DSLR Camera Kit",
            "24MP DSLR with 18-55mm and 50mm lenses, two batteries and a 64GB card.",
            "Electronics",
            35.0,
            "Portland, OR",
            r#"["https://images.rentcycle.local/seed/dslr-kit.jpg"]"#,
        ),
        (
            "4-Person Camping Tent",
            "Three-season dome tent with rainfly and footprint. Packs into one bag.",
            "Sports & Outdoors",
            12.0,
            "Beaverton, OR",
            r#"["https://images.rentcycle.local/seed/camping-tent.jpg"]"#,
        ),
        (
            "Cordless Drill Set",
            "20V drill/driver with two batteries, charger and a 60-piece bit set.",
            "Tools",
            10.0,
            "Portland, OR",
            r#"["https://images.rentcycle.local/seed/drill-set.jpg"]"#,
        ),
        (
            "Stand-Up Paddleboard",
            "Inflatable SUP with pump, paddle and leash. Suits riders up to 110kg.",
            "Sports & Outdoors",
            25.0,
            "Vancouver, WA",
            r#"["https://images.rentcycle.local/seed/paddleboard.jpg"]"#,
        ),
        (
            "Projector + Screen",
            "1080p projector with a 100\" portable screen and HDMI cables. Great for movie nights.",
            "Electronics",
            22.0,
            "Portland, OR",
            r#"["https://images.rentcycle.local/seed/projector.jpg"]"#,
        ),
    ];

    let now = chrono::Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;
    for (title, description, category, price_per_day, location, images) in &listings {
        sqlx::query(
            "INSERT INTO items (id, title, description, category, price_per_day, location, images, is_available, owner_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(title)
        .bind(description)
        .bind(category)
        .bind(price_per_day)
        .bind(location)
        .bind(images)
        .bind(owner_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(count = listings.len(), "Sample listings seeded");
    Ok(())
}
