//! Create parking_spots table
//!
//! Spots are provisioned by operators and only read by the reservation flow,
//! apart from the `is_occupied` convenience flag.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ParkingSpots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ParkingSpots::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ParkingSpots::Latitude).double().not_null())
                    .col(ColumnDef::new(ParkingSpots::Longitude).double().not_null())
                    .col(ColumnDef::new(ParkingSpots::Address).string().not_null())
                    .col(
                        ColumnDef::new(ParkingSpots::PricePerHour)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParkingSpots::Type)
                            .string()
                            .not_null()
                            .default("standard"),
                    )
                    .col(
                        ColumnDef::new(ParkingSpots::IsOccupied)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ParkingSpots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_parking_spots_location")
                    .table(ParkingSpots::Table)
                    .col(ParkingSpots::Latitude)
                    .col(ParkingSpots::Longitude)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ParkingSpots::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ParkingSpots {
    Table,
    Id,
    Latitude,
    Longitude,
    Address,
    PricePerHour,
    Type,
    IsOccupied,
    CreatedAt,
}
