use anyhow::Result;
use arena_core::RoomStore;
use arena_types::{Player, Room};
use async_trait::async_trait;
use sea_orm::{ActiveValue, DatabaseConnection, EntityTrait, PaginatorTrait};

use crate::entities::{prelude::*, rooms};

/// SQLite-backed [`RoomStore`]. The player list is stored as a JSON column
/// so a room loads and saves as one row.
pub struct RoomRepository {
    db: DatabaseConnection,
}

impl RoomRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_room(model: rooms::Model) -> Result<Room> {
        let players: Vec<Player> = serde_json::from_value(model.players)?;
        Ok(Room {
            code: model.code,
            secret: model.secret,
            current_round: model.current_round as u32,
            max_rounds: model.max_rounds as u32,
            round_time_limit_seconds: model.round_time_limit_seconds as u32,
            is_round_active: model.is_round_active,
            players,
        })
    }

    fn room_to_active_model(room: &Room) -> Result<rooms::ActiveModel> {
        Ok(rooms::ActiveModel {
            code: ActiveValue::Set(room.code.clone()),
            secret: ActiveValue::Set(room.secret.clone()),
            current_round: ActiveValue::Set(room.current_round as i32),
            max_rounds: ActiveValue::Set(room.max_rounds as i32),
            round_time_limit_seconds: ActiveValue::Set(room.round_time_limit_seconds as i32),
            is_round_active: ActiveValue::Set(room.is_round_active),
            players: ActiveValue::Set(serde_json::to_value(&room.players)?),
            created_at: ActiveValue::NotSet,
            updated_at: ActiveValue::Set(chrono::Utc::now().into()),
        })
    }

    pub async fn room_count(&self) -> Result<u64> {
        Ok(Rooms::find().count(&self.db).await?)
    }
}

#[async_trait]
impl RoomStore for RoomRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Room>> {
        let model = Rooms::find_by_id(code).one(&self.db).await?;
        model.map(Self::model_to_room).transpose()
    }

    async fn save(&self, room: &Room) -> Result<()> {
        let exists = Rooms::find_by_id(&room.code).one(&self.db).await?.is_some();
        let mut active = Self::room_to_active_model(room)?;

        if exists {
            active.code = ActiveValue::Unchanged(room.code.clone());
            Rooms::update(active).exec(&self.db).await?;
        } else {
            active.created_at = ActiveValue::Set(chrono::Utc::now().into());
            Rooms::insert(active).exec(&self.db).await?;
        }
        Ok(())
    }

    async fn delete_by_code(&self, code: &str) -> Result<()> {
        Rooms::delete_by_id(code).exec(&self.db).await?;
        Ok(())
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        Ok(Rooms::find_by_id(code).one(&self.db).await?.is_some())
    }
}
