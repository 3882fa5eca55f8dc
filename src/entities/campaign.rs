use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Promotional campaign ("event") granting a percentage discount to a set of
/// books. The covered set is defined by `target_mode`: an explicit book list,
/// the union of the selected genres' books, or the entire catalog. A campaign
/// is active for as long as its row exists.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub target_mode: TargetMode,
    /// 0..=100.
    pub discount_percent: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::campaign_book::Entity")]
    CampaignBooks,
    #[sea_orm(has_many = "super::campaign_genre::Entity")]
    CampaignGenres,
}

impl Related<super::campaign_book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CampaignBooks.def()
    }
}

impl Related<super::campaign_genre::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CampaignGenres.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Which association set defines the campaign's covered books. Exactly one
/// mode is meaningful per campaign; association rows for the other modes are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum TargetMode {
    #[sea_orm(string_value = "books")]
    Books,
    #[sea_orm(string_value = "genres")]
    Genres,
    #[sea_orm(string_value = "all_books")]
    AllBooks,
}
