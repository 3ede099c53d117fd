//! Shared fixtures for the integration tests: two related entities and an
//! in-memory SQLite connection with their tables created.

#![allow(dead_code)]

use sea_orm::{ConnectOptions, ConnectionTrait, DatabaseConnection, Schema};
use sea_orm::ActiveValue::Set;

use ipop::adapter::ConnectionAdapter;
use ipop::Connection;

pub mod team {
    use sea_orm::entity::prelude::*;
    use validator::Validate;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Validate)]
    #[sea_orm(table_name = "teams")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        #[validate(length(min = 1, message = "name must not be empty"))]
        pub name: String,
        pub size: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::player::Entity")]
        Player,
    }

    impl Related<super::player::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Player.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod player {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "players")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub name: String,
        pub team_id: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::team::Entity",
            from = "Column::TeamId",
            to = "super::team::Column::Id"
        )]
        Team,
    }

    impl Related<super::team::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Team.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod task {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "tasks")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub title: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Open an in-memory SQLite database without any tables.
///
/// The pool is capped at one connection so every statement sees the same
/// in-memory database.
pub async fn connect_bare() -> ConnectionAdapter<DatabaseConnection> {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    ConnectionAdapter::connect_with(opts)
        .await
        .expect("failed to open in-memory database")
}

/// Open an in-memory SQLite database and create the fixture tables.
pub async fn connect() -> ConnectionAdapter<DatabaseConnection> {
    let conn = connect_bare().await;

    let backend = conn.backend();
    let schema = Schema::new(backend);
    for stmt in [
        schema.create_table_from_entity(team::Entity),
        schema.create_table_from_entity(player::Entity),
        schema.create_table_from_entity(task::Entity),
    ] {
        conn.inner()
            .execute(backend.build(&stmt))
            .await
            .expect("failed to create fixture table");
    }
    conn
}

pub fn team_model(id: i32, name: &str, size: i32) -> team::Model {
    team::Model {
        id,
        name: name.to_owned(),
        size,
    }
}

pub fn team_active(id: i32, name: &str, size: i32) -> team::ActiveModel {
    team::ActiveModel {
        id: Set(id),
        name: Set(name.to_owned()),
        size: Set(size),
    }
}

pub fn player_active(id: i32, name: &str, team_id: i32) -> player::ActiveModel {
    player::ActiveModel {
        id: Set(id),
        name: Set(name.to_owned()),
        team_id: Set(team_id),
    }
}

/// Insert `n` teams with ids `1..=n`, names `Team <id>`, and sizes cycling
/// `id % 10`.
pub async fn seed_teams(conn: &ConnectionAdapter<DatabaseConnection>, n: i32) {
    for id in 1..=n {
        conn.create(team_active(id, &format!("Team {id}"), id % 10))
            .await
            .expect("failed to seed team");
    }
}
