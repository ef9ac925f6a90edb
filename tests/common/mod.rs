//! Behavior every `NoteRepository` backend must share.
//!
//! Each check expects to start from an empty store.

#![allow(dead_code)]

use notes_store::{
    Cursor, ListParams, NewNote, Note, NoteChanges, NoteRepository, RepositoryError,
    pagination::{DEFAULT_PAGE_SIZE, listing_order},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn seed(repo: &dyn NoteRepository, count: usize) -> Vec<Note> {
    let cancel = CancellationToken::new();
    let mut notes = Vec::with_capacity(count);
    for i in 1..=count {
        let note = repo
            .create(&cancel, NewNote::new(format!("Note {i}"), format!("body {i}")))
            .await
            .unwrap();
        notes.push(note);
    }
    notes
}

pub fn ids(notes: &[Note]) -> Vec<i64> {
    notes.iter().map(|n| n.id).collect()
}

pub async fn walk(repo: &dyn NoteRepository, page_size: i64) -> Vec<Vec<Note>> {
    let cancel = CancellationToken::new();
    let mut pages = Vec::new();
    let mut params = ListParams::first_page(page_size);

    loop {
        let page = repo.list(&cancel, params).await.unwrap();
        let next = page.next_cursor;
        pages.push(page.notes);
        match next {
            Some(cursor) => params.cursor = Some(cursor),
            None => break,
        }
    }
    pages
}

pub async fn walk_returns_every_note_once(repo: &dyn NoteRepository) {
    let mut expected = seed(repo, 23).await;
    expected.sort_by(listing_order);

    let pages = walk(repo, 5).await;
    assert_eq!(pages.len(), 5);
    assert!(pages.iter().all(|page| page.len() <= 5));

    let seen: Vec<Note> = pages.into_iter().flatten().collect();
    assert_eq!(ids(&seen), ids(&expected));
}

pub async fn five_notes_in_pages_of_two(repo: &dyn NoteRepository) {
    let notes = seed(repo, 5).await;
    let id = |n: usize| notes[n - 1].id;
    let cancel = CancellationToken::new();

    let first = repo.list(&cancel, ListParams::first_page(2)).await.unwrap();
    assert_eq!(ids(&first.notes), vec![id(5), id(4)]);
    assert_eq!(first.next_cursor, Some(notes[3].sort_key()));

    let second = repo
        .list(&cancel, ListParams::new(2, first.next_cursor))
        .await
        .unwrap();
    assert_eq!(ids(&second.notes), vec![id(3), id(2)]);

    let third = repo
        .list(&cancel, ListParams::new(2, second.next_cursor))
        .await
        .unwrap();
    assert_eq!(ids(&third.notes), vec![id(1)]);
    assert_eq!(third.next_cursor, None);
}

pub async fn exact_multiple_has_no_trailing_cursor(repo: &dyn NoteRepository) {
    seed(repo, 4).await;
    let cancel = CancellationToken::new();

    let first = repo.list(&cancel, ListParams::first_page(2)).await.unwrap();
    assert!(first.has_more());

    let second = repo
        .list(&cancel, ListParams::new(2, first.next_cursor))
        .await
        .unwrap();
    assert_eq!(second.notes.len(), 2);
    assert!(!second.has_more());
}

pub async fn non_positive_page_size_uses_default(repo: &dyn NoteRepository) {
    seed(repo, DEFAULT_PAGE_SIZE + 3).await;
    let cancel = CancellationToken::new();

    for page_size in [0, -1] {
        let page = repo
            .list(&cancel, ListParams::first_page(page_size))
            .await
            .unwrap();
        assert_eq!(page.notes.len(), DEFAULT_PAGE_SIZE);
        assert!(page.has_more());
    }
}

pub async fn cursor_survives_encoding(repo: &dyn NoteRepository) {
    let notes = seed(repo, 3).await;
    let cancel = CancellationToken::new();

    let first = repo.list(&cancel, ListParams::first_page(1)).await.unwrap();
    let token = first.next_cursor.unwrap().encode();

    let cursor = Cursor::decode(&token).unwrap();
    let second = repo
        .list(&cancel, ListParams::new(1, Some(cursor)))
        .await
        .unwrap();
    assert_eq!(ids(&second.notes), vec![notes[1].id]);
}

pub async fn empty_store_lists_nothing(repo: &dyn NoteRepository) {
    let cancel = CancellationToken::new();
    let page = repo.list(&cancel, ListParams::default()).await.unwrap();
    assert!(page.notes.is_empty());
    assert!(!page.has_more());
}

pub async fn get_round_trips_created_note(repo: &dyn NoteRepository) {
    let cancel = CancellationToken::new();
    let created = repo
        .create(&cancel, NewNote::new("Groceries", "milk, eggs"))
        .await
        .unwrap();

    assert_eq!(created.title, "Groceries");
    assert_eq!(created.content, "milk, eggs");
    assert_eq!(created.created_at, created.updated_at);

    let fetched = repo.get(&cancel, created.id).await.unwrap();
    assert_eq!(fetched, created);
}

pub async fn get_many_skips_missing_ids(repo: &dyn NoteRepository) {
    let notes = seed(repo, 3).await;
    let cancel = CancellationToken::new();
    let missing = notes[2].id + 1000;

    let found = repo
        .get_many(&cancel, &[notes[2].id, missing, notes[0].id, notes[0].id])
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![notes[0].id, notes[2].id]);

    let none = repo.get_many(&cancel, &[missing]).await.unwrap();
    assert!(none.is_empty());

    let empty = repo.get_many(&cancel, &[]).await.unwrap();
    assert!(empty.is_empty());
}

pub async fn search_matches_title_or_content(repo: &dyn NoteRepository) {
    let cancel = CancellationToken::new();
    let meeting = repo
        .create(&cancel, NewNote::new("Team Meeting", "agenda"))
        .await
        .unwrap();
    let lunch = repo
        .create(&cancel, NewNote::new("Lunch", "after the MEETING"))
        .await
        .unwrap();
    repo.create(&cancel, NewNote::new("Gym", "legs"))
        .await
        .unwrap();

    let found = repo.search(&cancel, "meeting").await.unwrap();
    assert_eq!(ids(&found), vec![lunch.id, meeting.id]);

    let found = repo.search(&cancel, "eam mee").await.unwrap();
    assert_eq!(ids(&found), vec![meeting.id]);

    assert!(repo.search(&cancel, "nothing here").await.unwrap().is_empty());
}

pub async fn search_treats_wildcards_literally(repo: &dyn NoteRepository) {
    let cancel = CancellationToken::new();
    let percent = repo
        .create(&cancel, NewNote::new("Progress", "100% done"))
        .await
        .unwrap();
    repo.create(&cancel, NewNote::new("Count", "1000 items"))
        .await
        .unwrap();

    let found = repo.search(&cancel, "100%").await.unwrap();
    assert_eq!(ids(&found), vec![percent.id]);

    assert!(repo.search(&cancel, "_").await.unwrap().is_empty());
}

pub async fn search_rejects_empty_query(repo: &dyn NoteRepository) {
    let cancel = CancellationToken::new();
    let err = repo.search(&cancel, "").await.unwrap_err();
    assert!(matches!(err, RepositoryError::EmptyQuery));

    // Rejected before the cancellation check, so before any storage access.
    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = repo.search(&cancelled, "").await.unwrap_err();
    assert!(matches!(err, RepositoryError::EmptyQuery));
}

pub async fn update_keeps_identity(repo: &dyn NoteRepository) {
    let cancel = CancellationToken::new();
    let created = repo
        .create(&cancel, NewNote::new("Draft", "v1"))
        .await
        .unwrap();

    let updated = repo
        .update(&cancel, created.id, NoteChanges::new("Final", "v2"))
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.content, "v2");

    let again = repo
        .update(&cancel, created.id, NoteChanges::new("Final", "v3"))
        .await
        .unwrap();
    assert!(again.updated_at > updated.updated_at);

    let fetched = repo.get(&cancel, created.id).await.unwrap();
    assert_eq!(fetched, again);
}

pub async fn missing_ids_are_not_found(repo: &dyn NoteRepository) {
    let cancel = CancellationToken::new();
    let note = repo.create(&cancel, NewNote::new("Gone", "")).await.unwrap();
    let missing = note.id + 1000;

    let err = repo.delete(&cancel, missing).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(id) if id == missing));
    let err = repo.get(&cancel, missing).await.unwrap_err();
    assert!(err.is_not_found());
    let err = repo
        .update(&cancel, missing, NoteChanges::new("x", "y"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

pub async fn delete_removes_note(repo: &dyn NoteRepository) {
    let notes = seed(repo, 2).await;
    let cancel = CancellationToken::new();

    repo.delete(&cancel, notes[0].id).await.unwrap();

    assert!(repo.get(&cancel, notes[0].id).await.unwrap_err().is_not_found());
    assert!(repo.delete(&cancel, notes[0].id).await.unwrap_err().is_not_found());

    let page = repo.list(&cancel, ListParams::default()).await.unwrap();
    assert_eq!(ids(&page.notes), vec![notes[1].id]);

    let next = repo.create(&cancel, NewNote::new("new", "")).await.unwrap();
    assert!(next.id > notes[1].id);
}

pub async fn cancelled_operations_fail(repo: &dyn NoteRepository) {
    let notes = seed(repo, 1).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let is_cancelled = |err: RepositoryError| matches!(err, RepositoryError::Cancelled);

    assert!(is_cancelled(
        repo.create(&cancel, NewNote::new("x", "")).await.unwrap_err()
    ));
    assert!(is_cancelled(repo.get(&cancel, notes[0].id).await.unwrap_err()));
    assert!(is_cancelled(
        repo.get_many(&cancel, &[notes[0].id]).await.unwrap_err()
    ));
    assert!(is_cancelled(
        repo.list(&cancel, ListParams::default()).await.unwrap_err()
    ));
    assert!(is_cancelled(repo.search(&cancel, "x").await.unwrap_err()));
    assert!(is_cancelled(
        repo.update(&cancel, notes[0].id, NoteChanges::new("x", ""))
            .await
            .unwrap_err()
    ));
    assert!(is_cancelled(repo.delete(&cancel, notes[0].id).await.unwrap_err()));

    // An empty lookup needs no storage access, so it succeeds either way.
    assert!(repo.get_many(&cancel, &[]).await.unwrap().is_empty());

    // Nothing was changed.
    let live = CancellationToken::new();
    assert_eq!(repo.get(&live, notes[0].id).await.unwrap(), notes[0]);
}
