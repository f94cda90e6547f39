//! Database fixtures for tests

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

use super::entities::{parking_spot, reservation};
use super::migrator::Migrator;
use super::{init_database, DatabaseConfig};

/// Fresh migrated in-memory SQLite database
pub async fn test_db() -> DatabaseConnection {
    let db = init_database(&DatabaseConfig::in_memory())
        .await
        .expect("in-memory sqlite");
    Migrator::up(&db, None).await.expect("migrations");
    db
}

/// Migrated SQLite database in a fresh temp file, opened with the default
/// pool settings. The caller removes the file.
pub async fn file_db() -> (DatabaseConnection, PathBuf) {
    let path = std::env::temp_dir().join(format!("parking-{}.db", uuid::Uuid::new_v4()));
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", path.display()),
        ..DatabaseConfig::default()
    };
    let db = init_database(&config).await.expect("file sqlite");
    Migrator::up(&db, None).await.expect("migrations");
    (db, path)
}

/// Insert a standard spot at a fixed location with the given hourly price
pub async fn seed_spot(db: &DatabaseConnection, price_per_hour: f64) -> i32 {
    seed_spot_at(db, 44.4268, 26.1025, price_per_hour).await
}

pub async fn seed_spot_at(db: &DatabaseConnection, latitude: f64, longitude: f64, price_per_hour: f64) -> i32 {
    let model = parking_spot::ActiveModel {
        latitude: Set(latitude),
        longitude: Set(longitude),
        address: Set(format!("Str. Test {:.4},{:.4}", latitude, longitude)),
        price_per_hour: Set(price_per_hour),
        spot_type: Set("standard".to_string()),
        is_occupied: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed spot");
    model.id
}

/// Insert a reservation row directly, bypassing every check
pub async fn seed_reservation(
    db: &DatabaseConnection,
    spot_id: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    status: &str,
) -> i32 {
    let model = reservation::ActiveModel {
        user_id: Set(1),
        vehicle_id: Set(1),
        parking_spot_id: Set(spot_id),
        start_time: Set(start),
        end_time: Set(end),
        status: Set(status.to_string()),
        total_price: Set(0.0),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed reservation");
    model.id
}
