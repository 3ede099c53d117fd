//! Query contract tests against in-memory SQLite.

mod common;

use sea_orm::{JoinType, Order};

use ipop::{Connection, PaginationParams, Query};

use common::{connect, player_active, seed_teams, team};

#[tokio::test]
async fn test_filter_with_bound_values() {
    let conn = connect().await;
    seed_teams(&conn, 100).await;

    let row = conn
        .q::<team::Entity>()
        .filter("name = ?", vec!["Team 7".into()])
        .one()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.id, 7);

    let high = conn
        .filter::<team::Entity>("id > ?", vec![90.into()])
        .count()
        .await
        .unwrap();
    assert_eq!(high, 10);

    let picked = conn
        .q::<team::Entity>()
        .filter("id in (?, ?, ?)", vec![1.into(), 2.into(), 3.into()])
        .all()
        .await
        .unwrap();
    assert_eq!(picked.len(), 3);
}

#[tokio::test]
async fn test_order_limit_offset() {
    let conn = connect().await;
    seed_teams(&conn, 100).await;

    let top: Vec<i32> = conn
        .q::<team::Entity>()
        .order_by("id", Order::Desc)
        .limit(3)
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(top, vec![100, 99, 98]);

    let skipped = conn
        .q::<team::Entity>()
        .order_by("id", Order::Asc)
        .limit(2)
        .offset(10)
        .all()
        .await
        .unwrap();
    assert_eq!(skipped[0].id, 11);
}

#[tokio::test]
async fn test_pagination() {
    let conn = connect().await;
    seed_teams(&conn, 100).await;

    let page: Vec<i32> = conn
        .q::<team::Entity>()
        .order_by("id", Order::Asc)
        .paginate(2, 2)
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(page, vec![3, 4]);

    let params = PaginationParams::new(3, 2);
    let page: Vec<i32> = conn
        .q::<team::Entity>()
        .order_by("id", Order::Asc)
        .paginate_params(&params)
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(page, vec![5, 6]);

    // Page numbers below one clamp to the first page.
    let page = conn
        .q::<team::Entity>()
        .order_by("id", Order::Asc)
        .paginate(0, 2)
        .all()
        .await
        .unwrap();
    assert_eq!(page[0].id, 1);
}

#[tokio::test]
async fn test_last_and_find() {
    let conn = connect().await;
    seed_teams(&conn, 100).await;

    let last = conn.q::<team::Entity>().last().await.unwrap().unwrap();
    assert_eq!(last.id, 100);

    // `find` respects clauses already on the query. Team 7 has size 7.
    let hit = conn
        .q::<team::Entity>()
        .filter("size = ?", vec![7.into()])
        .find(7)
        .await
        .unwrap();
    assert!(hit.is_some());

    let miss = conn
        .q::<team::Entity>()
        .filter("size = ?", vec![8.into()])
        .find(7)
        .await
        .unwrap();
    assert!(miss.is_none());
}

#[tokio::test]
async fn test_count_variants_and_exists() {
    let conn = connect().await;
    seed_teams(&conn, 100).await;

    assert_eq!(conn.q::<team::Entity>().count().await.unwrap(), 100);
    assert_eq!(
        conn.q::<team::Entity>()
            .count_by_field("id")
            .await
            .unwrap(),
        100
    );
    assert!(conn
        .q::<team::Entity>()
        .filter("id = ?", vec![50.into()])
        .exists()
        .await
        .unwrap());
    assert!(!conn
        .q::<team::Entity>()
        .filter("id = ?", vec![500.into()])
        .exists()
        .await
        .unwrap());
}

#[tokio::test]
async fn test_raw_queries() {
    let conn = connect().await;
    seed_teams(&conn, 10).await;

    let rows = conn
        .raw::<team::Entity>("SELECT * FROM teams WHERE id = ?", vec![5.into()])
        .all()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Team 5");

    let row = conn
        .raw::<team::Entity>("SELECT * FROM teams WHERE id > ? ORDER BY id", vec![8.into()])
        .one()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.id, 9);

    let n = conn
        .raw::<team::Entity>("SELECT * FROM teams WHERE id <= ?", vec![3.into()])
        .count()
        .await
        .unwrap();
    assert_eq!(n, 3);
}

#[tokio::test]
async fn test_exec_with_count() {
    let conn = connect().await;
    seed_teams(&conn, 10).await;

    let affected = conn
        .raw::<team::Entity>(
            "UPDATE teams SET size = ? WHERE id <= ?",
            vec![0.into(), 4.into()],
        )
        .exec_with_count()
        .await
        .unwrap();
    assert_eq!(affected, 4);

    let zeroed = conn
        .filter::<team::Entity>("size = ?", vec![0.into()])
        .count()
        .await
        .unwrap();
    // Team 10 already had size 0 from the seed cycle.
    assert_eq!(zeroed, 5);

    conn.raw::<team::Entity>("DELETE FROM teams WHERE id = ?", vec![1.into()])
        .exec()
        .await
        .unwrap();
    assert_eq!(conn.count::<team::Entity>().await.unwrap(), 9);
}

#[tokio::test]
async fn test_statement_rendering() {
    let conn = connect().await;

    let stmt = conn
        .q::<team::Entity>()
        .select_only(&["name"])
        .group_by(&["name"])
        .having("COUNT(id) > ?", vec![1.into()])
        .to_statement();
    assert!(stmt.sql.contains("GROUP BY"));
    assert!(stmt.sql.contains("HAVING"));

    let stmt = conn
        .q::<team::Entity>()
        .join(
            JoinType::InnerJoin,
            "players",
            "players.team_id = teams.id",
            vec![],
        )
        .to_statement();
    assert!(stmt.sql.contains("INNER JOIN"));

    let stmt = conn
        .q::<team::Entity>()
        .left_join("players", "players.team_id = teams.id", vec![])
        .to_statement();
    assert!(stmt.sql.contains("LEFT JOIN"));
}

#[tokio::test]
async fn test_join_execution() {
    let conn = connect().await;
    seed_teams(&conn, 3).await;
    conn.create(player_active(1, "Ann", 1)).await.unwrap();
    conn.create(player_active(2, "Ben", 1)).await.unwrap();

    let staffed = conn
        .q::<team::Entity>()
        .inner_join("players", "players.team_id = teams.id", vec![])
        .group_by(&["teams.id"])
        .all()
        .await
        .unwrap();
    assert_eq!(staffed.len(), 1);
    assert_eq!(staffed[0].id, 1);
}

#[tokio::test]
async fn test_scope_composition() {
    let conn = connect().await;
    seed_teams(&conn, 20).await;

    fn small<Q: Query<team::Entity>>(q: Q) -> Q {
        q.filter("size < ?", vec![3.into()])
    }

    let rows = conn
        .q::<team::Entity>()
        .scope(small)
        .order_by("id", Order::Asc)
        .all()
        .await
        .unwrap();
    // Sizes cycle id % 10, so ids 1, 2, 10, 11, 12, 20 qualify.
    assert_eq!(rows.len(), 6);

    let same = conn.scoped::<team::Entity, _>(small).count().await.unwrap();
    assert_eq!(same, 6);
}
