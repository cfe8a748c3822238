//! Catalog mutations and the queries that observe them.

mod common;

use bridge_traits::store::StoreAdapter;
use common::{abc_songs, ids, BatchRecorder, Library};
use core_library::{
    LibraryError, PlaylistId, PlaylistPatch, Song, SongId, SongQuery, SongSortKey,
};
use std::sync::Arc;

fn song_ids(raw: &[&str]) -> Vec<SongId> {
    raw.iter().map(|id| SongId::from(*id)).collect()
}

#[tokio::test]
async fn first_page_then_favorites_scenario() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();

    let page = library
        .queries
        .query_page(&SongQuery::all().sorted_by(SongSortKey::Title).window(0, 2))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec!["1", "2"]);

    assert!(library.catalog.toggle_favorite(&SongId::from("2")).await.unwrap());
    let favorites = library
        .queries
        .query_page(&SongQuery::favorites().window(0, 10))
        .await
        .unwrap();
    assert_eq!(ids(&favorites), vec!["2"]);
}

#[tokio::test]
async fn created_playlist_lists_songs_in_sort_order() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();

    let mix = library
        .catalog
        .create_playlist_and_add(&song_ids(&["3", "1"]), "mix")
        .await
        .unwrap();
    assert_eq!(mix.name, "mix");

    let songs = library
        .queries
        .query_page(&SongQuery::playlist(mix.id).window(0, 10))
        .await
        .unwrap();
    assert_eq!(ids(&songs), vec!["1", "3"]);
}

#[tokio::test]
async fn toggling_twice_restores_favorites() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();
    let before = library.queries.favorite_song_ids().await.unwrap();

    let id = SongId::from("3");
    assert!(library.catalog.toggle_favorite(&id).await.unwrap());
    assert!(library.queries.is_favorite(&id).await.unwrap());
    assert!(!library.catalog.toggle_favorite(&id).await.unwrap());

    assert_eq!(library.queries.favorite_song_ids().await.unwrap(), before);
    assert!(library.store.scan("favorites", Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_playlist_commits_one_batch() {
    let library = Library::in_memory();
    let recorder = Arc::new(BatchRecorder::default());
    library.store.on_mutation(recorder.clone());

    library
        .catalog
        .create_playlist_and_add(&song_ids(&["1", "2"]), "both")
        .await
        .unwrap();

    let batches = recorder.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert!(batches[0].touches("playlists"));
    assert!(batches[0].touches("playlist_songs"));
    assert_eq!(batches[0].len(), 3);
}

#[tokio::test]
async fn blank_name_gets_timestamped_default() {
    let library = Library::in_memory();
    let playlist = library
        .catalog
        .create_playlist_and_add(&[], "   ")
        .await
        .unwrap();
    assert_eq!(playlist.name, "new playlist 1700000000000");
    assert_eq!(playlist.created_at, 1_700_000_000_000);
}

#[tokio::test]
async fn re_adding_songs_is_absorbed() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();
    let playlist = library
        .catalog
        .create_playlist_and_add(&song_ids(&["1"]), "mix")
        .await
        .unwrap();

    let added = library
        .catalog
        .add_songs_to_playlist(&song_ids(&["1", "2", "2"]), &playlist.id)
        .await
        .unwrap();
    assert_eq!(added, 1);

    let memberships = library
        .queries
        .playlist_memberships(&playlist.id)
        .await
        .unwrap();
    let orders: Vec<(String, i64)> = memberships
        .iter()
        .map(|m| (m.song_id.to_string(), m.sort_order))
        .collect();
    assert_eq!(orders, vec![("1".into(), 0), ("2".into(), 1)]);

    let again = library
        .catalog
        .add_songs_to_playlist(&song_ids(&["2"]), &playlist.id)
        .await
        .unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
async fn adding_to_missing_playlist_is_not_found() {
    let library = Library::in_memory();
    let err = library
        .catalog
        .add_songs_to_playlist(&song_ids(&["1"]), &PlaylistId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::NotFound { ref entity_type, .. } if entity_type == "Playlist"));
}

#[tokio::test]
async fn update_playlist_merges_fields() {
    let library = Library::in_memory();
    let playlist = library
        .catalog
        .create_playlist_and_add(&[], "mix")
        .await
        .unwrap();
    let cover = library
        .catalog
        .store_blob(vec![1, 2, 3], "image/png")
        .await
        .unwrap();

    let updated = library
        .catalog
        .update_playlist(
            &playlist.id,
            PlaylistPatch::new()
                .description(Some("late night".into()))
                .cover(Some(cover.id)),
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "mix");
    assert_eq!(updated.description.as_deref(), Some("late night"));
    assert_eq!(updated.cover, Some(cover.id));

    let stored = library
        .queries
        .get_playlist(&playlist.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, updated);

    let blob = library.catalog.get_blob(&cover.id).await.unwrap().unwrap();
    assert_eq!(blob.data, vec![1, 2, 3]);
}

#[tokio::test]
async fn update_missing_playlist_is_not_found() {
    let library = Library::in_memory();
    let err = library
        .catalog
        .update_playlist(&PlaylistId::new(), PlaylistPatch::new().name("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::NotFound { .. }));
}

#[tokio::test]
async fn update_rejects_blank_name_without_writing() {
    let library = Library::in_memory();
    let playlist = library
        .catalog
        .create_playlist_and_add(&[], "keep")
        .await
        .unwrap();

    let err = library
        .catalog
        .update_playlist(&playlist.id, PlaylistPatch::new().name(" "))
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::InvalidInput { .. }));

    let stored = library.queries.get_playlist(&playlist.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "keep");
}

#[tokio::test]
async fn removing_and_deleting_playlists() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();
    let playlist = library
        .catalog
        .create_playlist_and_add(&song_ids(&["1", "2", "3"]), "all")
        .await
        .unwrap();

    let removed = library
        .catalog
        .remove_songs_from_playlist(&song_ids(&["2", "9"]), &playlist.id)
        .await
        .unwrap();
    assert_eq!(removed, 1);
    let remaining = library
        .queries
        .query_page(&SongQuery::playlist(playlist.id))
        .await
        .unwrap();
    assert_eq!(ids(&remaining), vec!["1", "3"]);

    library.catalog.delete_playlist(&playlist.id).await.unwrap();
    assert!(library.queries.get_playlist(&playlist.id).await.unwrap().is_none());
    assert!(library
        .store
        .scan("playlist_songs", Default::default())
        .await
        .unwrap()
        .is_empty());

    let err = library.catalog.delete_playlist(&playlist.id).await.unwrap_err();
    assert!(matches!(err, LibraryError::NotFound { .. }));
}

#[tokio::test]
async fn playlists_list_by_name() {
    let library = Library::in_memory();
    for name in ["zebra", "alpha", "mango"] {
        library
            .catalog
            .create_playlist_and_add(&[], name)
            .await
            .unwrap();
    }
    let names: Vec<String> = library
        .queries
        .list_playlists()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["alpha", "mango", "zebra"]);
}

#[tokio::test]
async fn invalid_import_writes_nothing() {
    let library = Library::in_memory();
    let err = library
        .catalog
        .import_songs(vec![
            Song::new("1").with_title("ok"),
            Song::new("2").with_seconds(-4.0),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::InvalidInput { ref field, .. } if field == "seconds"));
    assert_eq!(library.queries.count(&SongQuery::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_a_song_leaves_its_favorite() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();
    library.catalog.toggle_favorite(&SongId::from("1")).await.unwrap();

    library
        .store
        .delete("songs", &core_library::schema::song_key(&SongId::from("1")))
        .await
        .unwrap();

    assert!(library.queries.is_favorite(&SongId::from("1")).await.unwrap());
    let favorites = library
        .queries
        .query_page(&SongQuery::favorites())
        .await
        .unwrap();
    assert!(favorites.is_empty());
}

#[tokio::test]
async fn reset_clears_every_table() {
    let library = Library::in_memory();
    library.catalog.import_songs(abc_songs()).await.unwrap();
    library.catalog.toggle_favorite(&SongId::from("1")).await.unwrap();
    library
        .catalog
        .create_playlist_and_add(&song_ids(&["1"]), "p")
        .await
        .unwrap();

    let removed = library.catalog.reset_library().await.unwrap();
    assert_eq!(removed, 6);
    assert_eq!(library.queries.count(&SongQuery::all()).await.unwrap(), 0);
    assert!(library.queries.list_playlists().await.unwrap().is_empty());
    assert_eq!(library.catalog.reset_library().await.unwrap(), 0);
}
