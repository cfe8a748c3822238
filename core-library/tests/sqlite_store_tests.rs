//! The query engine and live queries over the SQLite record store.

mod common;

use bridge_desktop::SqliteRecordStore;
use common::{abc_songs, ids, Library};
use core_library::{LiveQuery, Song, SongId, SongQuery, SongSortKey};
use std::sync::Arc;

async fn sqlite_library() -> Library {
    Library::over(Arc::new(SqliteRecordStore::in_memory().await.unwrap()))
}

#[tokio::test]
async fn scenarios_hold_on_sqlite() {
    let library = sqlite_library().await;
    library.catalog.import_songs(abc_songs()).await.unwrap();

    let page = library
        .queries
        .query_page(&SongQuery::all().window(0, 2))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec!["1", "2"]);

    library.catalog.toggle_favorite(&SongId::from("2")).await.unwrap();
    let favorites = library
        .queries
        .query_page(&SongQuery::favorites())
        .await
        .unwrap();
    assert_eq!(ids(&favorites), vec!["2"]);

    let mix = library
        .catalog
        .create_playlist_and_add(&[SongId::from("3"), SongId::from("1")], "mix")
        .await
        .unwrap();
    let members = library
        .queries
        .query_page(&SongQuery::playlist(mix.id))
        .await
        .unwrap();
    assert_eq!(ids(&members), vec!["1", "3"]);
}

#[tokio::test]
async fn numeric_sort_uses_values() {
    let library = sqlite_library().await;
    library
        .catalog
        .import_songs(vec![
            Song::new("a").with_seconds(300.0),
            Song::new("b").with_seconds(30.0),
            Song::new("c"),
        ])
        .await
        .unwrap();

    let page = library
        .queries
        .query_page(&SongQuery::all().sorted_by(SongSortKey::Seconds))
        .await
        .unwrap();
    // songs without a duration sort first
    assert_eq!(ids(&page), vec!["c", "b", "a"]);
}

#[tokio::test]
async fn live_query_refreshes_on_sqlite_commit() {
    let library = sqlite_library().await;
    let (_handle, mut rx) = library
        .registry
        .subscribe_channel(LiveQuery::Songs(SongQuery::all()))
        .await
        .unwrap();
    assert!(rx.try_recv().unwrap().unwrap().into_songs().is_empty());

    library.catalog.import_songs(abc_songs()).await.unwrap();
    assert_eq!(rx.try_recv().unwrap().unwrap().into_songs().len(), 3);
}
