//! SeaORM implementation of SpotRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use tracing::debug;

use crate::domain::spot::{GeoPoint, NewParkingSpot, ParkingSpot, SpotRepository, SpotType};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::parking_spot;

pub struct SeaOrmSpotRepository {
    db: DatabaseConnection,
}

impl SeaOrmSpotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: parking_spot::Model) -> DomainResult<ParkingSpot> {
    let spot_type = m.spot_type.parse::<SpotType>().map_err(|_| {
        DomainError::Internal(format!("Spot {} has unknown type '{}'", m.id, m.spot_type))
    })?;
    Ok(ParkingSpot {
        id: m.id,
        location: GeoPoint {
            latitude: m.latitude,
            longitude: m.longitude,
        },
        address: m.address,
        price_per_hour: m.price_per_hour,
        spot_type,
        is_occupied: m.is_occupied,
        created_at: m.created_at,
    })
}

#[async_trait]
impl SpotRepository for SeaOrmSpotRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ParkingSpot>> {
        parking_spot::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_all(&self) -> DomainResult<Vec<ParkingSpot>> {
        parking_spot::Entity::find()
            .order_by_asc(parking_spot::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn create(&self, spot: NewParkingSpot) -> DomainResult<ParkingSpot> {
        spot.validate()?;
        debug!("Provisioning parking spot at {}", spot.address);

        let model = parking_spot::ActiveModel {
            latitude: Set(spot.location.latitude),
            longitude: Set(spot.location.longitude),
            address: Set(spot.address),
            price_per_hour: Set(spot.price_per_hour),
            spot_type: Set(spot.spot_type.as_str().to_string()),
            is_occupied: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        model_to_domain(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::testing::test_db;

    #[tokio::test]
    async fn create_then_list() {
        let repo = SeaOrmSpotRepository::new(test_db().await);
        let created = repo
            .create(NewParkingSpot {
                location: GeoPoint::new(46.77, 23.62).unwrap(),
                address: "Str. Memorandumului 28".into(),
                price_per_hour: 3.5,
                spot_type: SpotType::Electric,
            })
            .await
            .unwrap();

        assert_eq!(created.spot_type, SpotType::Electric);
        assert!(!created.is_occupied);
        assert_eq!(repo.find_all().await.unwrap(), vec![created.clone()]);
        assert_eq!(repo.find_by_id(created.id).await.unwrap(), Some(created));
        assert_eq!(repo.find_by_id(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_spot_is_not_written() {
        let repo = SeaOrmSpotRepository::new(test_db().await);
        let err = repo
            .create(NewParkingSpot {
                location: GeoPoint::new(0.0, 0.0).unwrap(),
                address: "  ".into(),
                price_per_hour: 1.0,
                spot_type: SpotType::Standard,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(repo.find_all().await.unwrap().is_empty());
    }
}
