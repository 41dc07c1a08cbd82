//! Indexed file catalog: idempotent upsert, search, paging.

mod common;

use porterocore::storage::files::{
    count_files, get_file_by_content_id, get_file_by_msg_id, search_files, upsert_file, IndexedFile,
};
use porterocore::storage::get_connection;
use pretty_assertions::assert_eq;

fn movie(content_id: &str, name: &str, msg_id: i64) -> IndexedFile {
    IndexedFile {
        content_id: content_id.to_string(),
        file_name: name.to_string(),
        file_size: 500_000_000,
        caption: String::new(),
        msg_id,
        chat_id: -1001234567890,
        mime_type: Some("video/x-matroska".to_string()),
    }
}

#[test]
fn upsert_is_idempotent_and_second_wins() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    upsert_file(&conn, &movie("bot:abc123", "movie.mkv", 10)).unwrap();
    upsert_file(
        &conn,
        &IndexedFile {
            file_size: 600_000_000,
            caption: "remux".to_string(),
            ..movie("bot:abc123", "movie.v2.mkv", 11)
        },
    )
    .unwrap();

    assert_eq!(count_files(&conn).unwrap(), 1);
    let row = get_file_by_content_id(&conn, "bot:abc123").unwrap().unwrap();
    assert_eq!(row.file_name, "movie.v2.mkv");
    assert_eq!(row.file_size, 600_000_000);
    assert_eq!(row.caption, "remux");
    assert_eq!(row.msg_id, 11);
}

#[test]
fn search_is_case_insensitive_substring() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    upsert_file(&conn, &movie("bot:1", "Avengers.Endgame.mkv", 1)).unwrap();
    upsert_file(&conn, &movie("bot:2", "avengers.age.of.ultron.mp4", 2)).unwrap();
    upsert_file(&conn, &movie("bot:3", "Inception.mkv", 3)).unwrap();

    let hits = search_files(&conn, "avengers", 50, 0).unwrap();
    assert_eq!(hits.len(), 2);

    let hits = search_files(&conn, "AVENGERS.END", 50, 0).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].file_name, "Avengers.Endgame.mkv");

    assert!(search_files(&conn, "batman", 50, 0).unwrap().is_empty());
}

#[test]
fn search_treats_wildcards_literally() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    upsert_file(&conn, &movie("bot:1", "100%_complete.mkv", 1)).unwrap();
    upsert_file(&conn, &movie("bot:2", "100x_complete.mkv", 2)).unwrap();

    // A literal % must not act as a LIKE wildcard
    let hits = search_files(&conn, "100%", 50, 0).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].file_name, "100%_complete.mkv");
}

#[test]
fn search_pages_with_limit_and_offset() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    for i in 0..25 {
        upsert_file(&conn, &movie(&format!("bot:{}", i), &format!("file{}.mkv", i), i)).unwrap();
    }

    let page1 = search_files(&conn, "file", 10, 0).unwrap();
    let page2 = search_files(&conn, "file", 10, 10).unwrap();
    let page3 = search_files(&conn, "file", 10, 20).unwrap();
    assert_eq!(page1.len(), 10);
    assert_eq!(page2.len(), 10);
    assert_eq!(page3.len(), 5);
    // Newest (highest msg_id) first
    assert_eq!(page1[0].file_name, "file24.mkv");
}

#[test]
fn msg_id_lookup_returns_the_row() {
    let (_dir, pool) = common::test_pool();
    let conn = get_connection(&pool).unwrap();

    upsert_file(&conn, &movie("bot:abc", "movie.mkv", 42)).unwrap();

    let row = get_file_by_msg_id(&conn, 42).unwrap().unwrap();
    assert_eq!(row.content_id, "bot:abc");
    assert!(get_file_by_msg_id(&conn, 43).unwrap().is_none());
}
