//! Connection contract tests against in-memory SQLite.

mod common;

use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{DatabaseBackend, IntoActiveModel};

use ipop::{with_transaction, Connection, Error};

use common::{connect, player_active, seed_teams, team, team_active, team_model};

#[tokio::test]
async fn test_connection_metadata() {
    let conn = connect().await;
    assert_eq!(conn.backend(), DatabaseBackend::Sqlite);
    assert_eq!(conn.url(), Some("sqlite::memory:"));
    assert_eq!(conn.migration_table_name(), "seaql_migrations");
    conn.ping().await.unwrap();
}

#[tokio::test]
async fn test_create_and_retrieve() {
    let conn = connect().await;
    seed_teams(&conn, 100).await;

    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 100);
    assert_eq!(conn.all::<team::Entity>().await.unwrap().len(), 100);

    let found = conn.find::<team::Entity>(42).await.unwrap().unwrap();
    assert_eq!(found.name, "Team 42");
    assert!(conn.find::<team::Entity>(101).await.unwrap().is_none());

    assert_eq!(conn.first::<team::Entity>().await.unwrap().unwrap().id, 1);
    assert_eq!(conn.last::<team::Entity>().await.unwrap().unwrap().id, 100);
}

#[tokio::test]
async fn test_update_reload_destroy() {
    let conn = connect().await;
    let team = conn.create(team_active(1, "Original", 4)).await.unwrap();

    let renamed = conn
        .update(team::ActiveModel {
            id: Set(1),
            name: Set("Renamed".to_owned()),
            size: NotSet,
        })
        .await
        .unwrap();
    assert_eq!(renamed.name, "Renamed");
    assert_eq!(renamed.size, 4);

    // The stale copy still says "Original"; reload fetches the new row.
    let reloaded = conn.reload::<team::Entity>(&team).await.unwrap().unwrap();
    assert_eq!(reloaded.name, "Renamed");

    conn.destroy(reloaded.into_active_model()).await.unwrap();
    assert!(conn.reload::<team::Entity>(&team).await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_inserts_when_key_is_not_set() {
    let conn = connect().await;

    let saved = conn
        .save(common::task::ActiveModel {
            id: NotSet,
            title: Set("write report".to_owned()),
        })
        .await
        .unwrap();

    // Insert path: the database assigned the key.
    assert_eq!(saved.id.unwrap(), 1);
    assert_eq!(conn.count::<common::task::Entity>().await.unwrap(), 1);

    let row = conn.find::<common::task::Entity>(1).await.unwrap().unwrap();
    assert_eq!(row.title, "write report");
}

#[tokio::test]
async fn test_save_updates_existing_record() {
    let conn = connect().await;
    conn.create(team_active(7, "Before", 1)).await.unwrap();

    conn.save(team_active(7, "After", 2)).await.unwrap();

    let row = conn.find::<team::Entity>(7).await.unwrap().unwrap();
    assert_eq!(row.name, "After");
    assert_eq!(row.size, 2);
}

#[tokio::test]
async fn test_destroy_by_id_reports_rows_affected() {
    let conn = connect().await;
    seed_teams(&conn, 3).await;

    assert_eq!(conn.destroy_by_id::<team::Entity>(2).await.unwrap(), 1);
    assert_eq!(conn.destroy_by_id::<team::Entity>(2).await.unwrap(), 0);
    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 2);
}

#[tokio::test]
async fn test_validate_and_create() {
    let conn = connect().await;

    let created = conn
        .validate_and_create::<team::Model, team::ActiveModel>(team_model(1, "Valid", 5))
        .await
        .unwrap();
    assert_eq!(created.name, "Valid");

    let err = conn
        .validate_and_create::<team::Model, team::ActiveModel>(team_model(2, "", 5))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    // The invalid record never reached the database.
    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 1);
}

#[tokio::test]
async fn test_validate_and_update() {
    let conn = connect().await;
    conn.create(team_active(1, "Valid", 5)).await.unwrap();

    let err = conn
        .validate_and_update::<team::Model, team::ActiveModel>(team_model(1, "", 5))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let updated = conn
        .validate_and_update::<team::Model, team::ActiveModel>(team_model(1, "Still valid", 6))
        .await
        .unwrap();
    assert_eq!(updated.size, 6);
}

#[tokio::test]
async fn test_transaction_commits_on_ok() {
    let conn = connect().await;

    let created = with_transaction!(conn, |tx| {
        let a = tx.create(team_active(1, "One", 1)).await?;
        tx.create(team_active(2, "Two", 2)).await?;
        Ok(a)
    })
    .unwrap();

    assert_eq!(created.id, 1);
    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 2);
}

#[tokio::test]
async fn test_transaction_rolls_back_on_error() {
    let conn = connect().await;

    let err = with_transaction!(conn, |tx| {
        tx.create(team_active(1, "Doomed", 1)).await?;
        Err::<(), _>(Error::NotFound)
    })
    .unwrap_err();

    assert!(matches!(err, Error::NotFound));
    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 0);
}

#[tokio::test]
async fn test_rollback_never_persists() {
    let conn = connect().await;

    let seen = conn
        .rollback(|tx| {
            Box::pin(async move {
                tx.create(team_active(1, "Ephemeral", 1)).await?;
                tx.count::<team::Entity>().await
            })
        })
        .await
        .unwrap();

    // Visible inside the transaction, gone after the forced rollback.
    assert_eq!(seen, 1);
    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 0);
}

#[tokio::test]
async fn test_begin_commit_and_close() {
    let conn = connect().await;

    let tx = conn.begin().await.unwrap();
    tx.create(team_active(1, "Committed", 1)).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 1);

    // Closing a transaction handle rolls it back.
    let tx = conn.begin().await.unwrap();
    tx.create(team_active(2, "Abandoned", 2)).await.unwrap();
    tx.close().await.unwrap();
    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 1);
}

#[tokio::test]
async fn test_truncate_single_table() {
    let conn = connect().await;
    seed_teams(&conn, 3).await;
    conn.create(player_active(1, "Ann", 1)).await.unwrap();

    conn.truncate::<common::player::Entity>().await.unwrap();

    assert_eq!(conn.count::<common::player::Entity>().await.unwrap(), 0);
    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 3);
}

#[tokio::test]
async fn test_truncate_all_erases_every_user_table() {
    let conn = connect().await;
    seed_teams(&conn, 5).await;
    conn.create(player_active(1, "Ann", 1)).await.unwrap();
    conn.create(player_active(2, "Ben", 2)).await.unwrap();

    conn.truncate_all().await.unwrap();

    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 0);
    assert_eq!(conn.count::<common::player::Entity>().await.unwrap(), 0);
}

#[tokio::test]
async fn test_eager_loading() {
    let conn = connect().await;
    seed_teams(&conn, 2).await;
    conn.create(player_active(1, "Ann", 1)).await.unwrap();
    conn.create(player_active(2, "Ben", 1)).await.unwrap();
    conn.create(player_active(3, "Cas", 2)).await.unwrap();

    let teams = conn.all::<team::Entity>().await.unwrap();
    let rosters = conn
        .load_many::<team::Entity, common::player::Entity>(&teams)
        .await
        .unwrap();
    assert_eq!(rosters[0].len(), 2);
    assert_eq!(rosters[1].len(), 1);

    let players = conn.all::<common::player::Entity>().await.unwrap();
    let clubs = conn
        .load_one::<common::player::Entity, team::Entity>(&players)
        .await
        .unwrap();
    assert_eq!(clubs.len(), 3);
    assert!(clubs.iter().all(|t| t.is_some()));

    let nested = conn
        .all_with_related::<team::Entity, common::player::Entity>()
        .await
        .unwrap();
    assert_eq!(nested.len(), 2);
    assert_eq!(nested[0].1.len(), 2);
}

#[tokio::test]
async fn test_close_connection() {
    let conn = connect().await;
    conn.close().await.unwrap();
}
