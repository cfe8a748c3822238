//! Live query behaviour against real catalog mutations.

mod common;

use common::{abc_songs, ids, FlakyStore, Library};
use core_library::{LibraryError, LiveQuery, LiveResult, SongId, SongQuery};
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn initial_result_is_delivered_before_subscribe_returns() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();

    let (_handle, mut rx) = library
        .registry
        .subscribe_channel(LiveQuery::Songs(SongQuery::all().window(0, 2)))
        .await
        .unwrap();

    let first = rx.try_recv().unwrap().unwrap().into_songs();
    assert_eq!(ids(&first), vec!["1", "2"]);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn favorites_view_tracks_toggles() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();

    let (_handle, mut rx) = library
        .registry
        .subscribe_channel(LiveQuery::Songs(SongQuery::favorites().window(0, 10)))
        .await
        .unwrap();
    assert!(rx.try_recv().unwrap().unwrap().into_songs().is_empty());

    library.catalog.toggle_favorite(&SongId::from("2")).await.unwrap();
    let after_add = rx.try_recv().unwrap().unwrap().into_songs();
    assert_eq!(ids(&after_add), vec!["2"]);

    library.catalog.toggle_favorite(&SongId::from("2")).await.unwrap();
    let after_remove = rx.try_recv().unwrap().unwrap().into_songs();
    assert!(after_remove.is_empty());
}

#[tokio::test]
async fn playlist_membership_is_fresh_when_mutation_returns() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();
    let playlist = library
        .catalog
        .create_playlist_and_add(&[], "mix")
        .await
        .unwrap();

    let (_handle, mut rx) = library
        .registry
        .subscribe_channel(LiveQuery::Songs(SongQuery::playlist(playlist.id)))
        .await
        .unwrap();
    assert!(rx.try_recv().unwrap().unwrap().into_songs().is_empty());

    library
        .catalog
        .add_songs_to_playlist(&[SongId::from("1")], &playlist.id)
        .await
        .unwrap();

    // No yielding between the mutation and this check.
    let delivered = rx.try_recv().unwrap().unwrap().into_songs();
    assert_eq!(ids(&delivered), vec!["1"]);
}

#[tokio::test]
async fn unrelated_tables_do_not_trigger_redelivery() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();

    let (_handle, mut rx) = library
        .registry
        .subscribe_channel(LiveQuery::Songs(SongQuery::all()))
        .await
        .unwrap();
    rx.try_recv().unwrap().unwrap();

    library.catalog.toggle_favorite(&SongId::from("1")).await.unwrap();
    library
        .catalog
        .create_playlist_and_add(&[SongId::from("1")], "x")
        .await
        .unwrap();

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn deliveries_follow_mutation_order() {
    let library = Library::in_memory();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    library
        .registry
        .subscribe_songs(SongQuery::all().window(0, 100), move |result| {
            sink.lock().unwrap().push(result.unwrap().len());
        })
        .await
        .unwrap();

    for id in 1..=5 {
        library
            .catalog
            .import_songs(vec![core_library::Song::new(id.to_string())])
            .await
            .unwrap();
    }

    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn one_mutation_refreshes_every_dependent_subscription() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();

    let (_all, mut all_rx) = library
        .registry
        .subscribe_channel(LiveQuery::Songs(SongQuery::all()))
        .await
        .unwrap();
    let (_favs, mut favs_rx) = library
        .registry
        .subscribe_channel(LiveQuery::Songs(SongQuery::favorites()))
        .await
        .unwrap();
    all_rx.try_recv().unwrap().unwrap();
    favs_rx.try_recv().unwrap().unwrap();

    library
        .catalog
        .import_songs(vec![core_library::Song::new("4").with_title("D")])
        .await
        .unwrap();

    assert_eq!(all_rx.try_recv().unwrap().unwrap().into_songs().len(), 4);
    assert!(favs_rx.try_recv().unwrap().unwrap().into_songs().is_empty());
}

#[tokio::test]
async fn unsubscribed_queries_stop_receiving() {
    let library = Library::in_memory();
    let (handle, mut rx) = library
        .registry
        .subscribe_channel(LiveQuery::Table("songs".into()))
        .await
        .unwrap();
    rx.try_recv().unwrap().unwrap();

    assert!(library.registry.unsubscribe(&handle));
    library.catalog.import_songs(abc_songs()).await.unwrap();

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn failed_evaluation_is_delivered_and_retried() {
    let store = Arc::new(FlakyStore::default());
    let library = Library::over(store.clone());
    library.catalog.import_songs(abc_songs()).await.unwrap();

    let (_handle, mut rx) = library
        .registry
        .subscribe_channel(LiveQuery::Songs(SongQuery::all()))
        .await
        .unwrap();
    assert_eq!(rx.try_recv().unwrap().unwrap().into_songs().len(), 3);

    store.set_failing(true);
    library
        .catalog
        .import_songs(vec![core_library::Song::new("4")])
        .await
        .unwrap();
    let failure = rx.try_recv().unwrap().unwrap_err();
    assert!(matches!(failure, LibraryError::StoreUnavailable(_)));
    assert!(failure.is_retryable());
    assert_eq!(library.registry.active_subscriptions(), 1);

    store.set_failing(false);
    library
        .catalog
        .import_songs(vec![core_library::Song::new("5")])
        .await
        .unwrap();
    assert_eq!(rx.try_recv().unwrap().unwrap().into_songs().len(), 5);
}

#[tokio::test]
async fn invalid_queries_fail_at_subscribe() {
    let library = Library::in_memory();
    let query = SongQuery {
        view: core_library::ViewMode::Playlist,
        playlist_id: None,
        ..SongQuery::default()
    };
    let result = library
        .registry
        .subscribe(LiveQuery::Songs(query), |_| {})
        .await;
    assert!(matches!(result, Err(LibraryError::InvalidQuery { .. })));
}

#[tokio::test]
async fn table_watch_delivers_rows() {
    let library = Library::in_memory();
    let (_handle, mut rx) = library
        .registry
        .subscribe_channel(LiveQuery::Table("playlists".into()))
        .await
        .unwrap();
    assert_eq!(rx.try_recv().unwrap().unwrap(), LiveResult::Rows(vec![]));

    library
        .catalog
        .create_playlist_and_add(&[], "road trip")
        .await
        .unwrap();
    let rows = rx.try_recv().unwrap().unwrap().into_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record["name"], "road trip");
}
