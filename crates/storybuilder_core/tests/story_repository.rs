use chrono::{Duration, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use storybuilder_core::{
    KeyValueStore, KvError, KvResult, MemoryKeyValueStore, RepoError, Story, StoryRepository,
    DEFAULT_STORAGE_KEY, DEFAULT_STORY_TITLE,
};

/// Store whose writes always fail, reads return whatever was seeded.
#[derive(Default)]
struct FailingWriteStore {
    seeded: Option<Vec<u8>>,
    write_attempts: usize,
}

impl KeyValueStore for FailingWriteStore {
    fn get(&self, _key: &str) -> KvResult<Option<Vec<u8>>> {
        Ok(self.seeded.clone())
    }

    fn set(&mut self, _key: &str, _value: &[u8]) -> KvResult<()> {
        self.write_attempts += 1;
        Err(KvError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            Some("database or disk is full".to_string()),
        )))
    }

    fn remove(&mut self, _key: &str) -> KvResult<()> {
        Ok(())
    }
}

fn ids(stories: &[Story]) -> Vec<uuid::Uuid> {
    stories.iter().map(|story| story.id).collect()
}

fn persisted(repo: &StoryRepository<MemoryKeyValueStore>) -> Vec<Story> {
    let bytes = repo
        .store()
        .get(DEFAULT_STORAGE_KEY)
        .unwrap()
        .expect("collection should be persisted");
    serde_json::from_slice(&bytes).unwrap()
}

fn story_at(title: &str, seconds: i64) -> Story {
    let mut story = Story::with_title(title);
    story.last_edited =
        Utc.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap() + Duration::seconds(seconds);
    story
}

#[test]
fn add_update_delete_scenario_keeps_expected_order() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());

    let mut a = Story::new();
    assert_eq!(a.title, DEFAULT_STORY_TITLE);
    assert!(a.content.is_empty());
    let mut b = Story::new();
    // Pin both creation times in the past so the edit below is strictly newer.
    a.last_edited = Utc::now() - Duration::minutes(2);
    b.last_edited = Utc::now() - Duration::minutes(1);

    assert_eq!(ids(repo.add(a.clone())), vec![a.id]);
    assert_eq!(ids(repo.add(b.clone())), vec![b.id, a.id]);

    a.set_content("hello");
    assert!(a.last_edited > b.last_edited);
    assert_eq!(ids(repo.update(a.clone())), vec![a.id, b.id]);
    assert_eq!(repo.get(a.id).unwrap().content, "hello");

    assert_eq!(ids(repo.delete(&b)), vec![a.id]);
    assert_eq!(ids(&persisted(&repo)), vec![a.id]);
}

#[test]
fn add_always_inserts_at_head_regardless_of_timestamp() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());
    let newest = story_at("newest", 100);
    let ancient = story_at("ancient", -100);

    repo.add(newest.clone());
    let stories = repo.add(ancient.clone());
    assert_eq!(stories[0].id, ancient.id);
    assert_eq!(stories[1].id, newest.id);
}

#[test]
fn add_with_existing_id_replaces_record_and_keeps_ids_unique() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());
    let original = story_at("first", 0);
    repo.add(original.clone());
    repo.add(story_at("other", 10));

    let mut duplicate = original.clone();
    duplicate.title = "replacement".to_string();
    let stories = repo.add(duplicate);

    assert_eq!(stories.len(), 2);
    assert_eq!(stories[0].id, original.id);
    assert_eq!(stories[0].title, "replacement");
}

#[test]
fn update_resorts_by_last_edited_descending() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());
    for (title, offset) in [("a", 10), ("b", 20), ("c", 30)] {
        repo.add(story_at(title, offset));
    }
    let mut oldest = repo.stories().iter().find(|s| s.title == "a").unwrap().clone();
    let previous = oldest.last_edited;
    oldest.set_title("a-renamed");

    let stories = repo.update(oldest.clone());
    assert!(stories
        .windows(2)
        .all(|pair| pair[0].last_edited >= pair[1].last_edited));
    assert_eq!(stories[0].id, oldest.id);
    assert!(stories[0].last_edited >= previous);
}

#[test]
fn update_with_stale_copy_never_moves_last_edited_backwards() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());
    let mut current = story_at("current", 60);
    repo.add(current.clone());
    repo.add(story_at("middle", 30));

    let mut stale = current.clone();
    stale.content = "typed into an old copy".to_string();
    stale.last_edited -= Duration::days(1);
    let stories = repo.update(stale);

    assert_eq!(stories[0].id, current.id);
    assert_eq!(stories[0].content, "typed into an old copy");
    assert_eq!(stories[0].last_edited, current.last_edited);

    current.set_title("fresh");
    let stories = repo.update(current.clone());
    assert_eq!(stories[0].last_edited, current.last_edited);
    assert_eq!(persisted(&repo)[0].last_edited, current.last_edited);
}

#[test]
fn update_and_delete_of_unknown_id_leave_collection_unchanged() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());
    repo.add(story_at("kept", 0));
    let before = repo.stories().to_vec();
    let stranger = Story::with_title("stranger");

    assert_eq!(repo.update(stranger.clone()), before.as_slice());
    assert_eq!(repo.delete(&stranger), before.as_slice());
    assert_eq!(persisted(&repo), before);
}

#[test]
fn collection_matches_added_minus_deleted_with_unique_ids() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());
    let mut expected = HashSet::new();
    let mut added = Vec::new();
    for idx in 0..12 {
        let story = story_at(&format!("story {idx}"), idx);
        expected.insert(story.id);
        added.push(story.clone());
        repo.add(story);
    }
    for story in added.iter().step_by(3) {
        repo.delete(story);
        expected.remove(&story.id);
    }
    let mut edited = added[1].clone();
    edited.set_content("edited");
    repo.update(edited);

    let actual: HashSet<_> = repo.stories().iter().map(|story| story.id).collect();
    assert_eq!(actual, expected);
    assert_eq!(actual.len(), repo.len());
}

#[test]
fn persist_then_load_round_trips_records_in_sorted_order() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());
    let mut first = story_at("first", 5);
    first.content = "once upon a time".to_string();
    first.last_edited += Duration::nanoseconds(123_456_789);
    let second = story_at("second", 50);
    let third = story_at("third", 25);
    for story in [first.clone(), second.clone(), third.clone()] {
        repo.add(story);
    }
    repo.persist();

    let mut reloaded = StoryRepository::new(repo.into_store());
    assert!(reloaded.is_empty());
    let stories = reloaded.load().to_vec();

    assert_eq!(stories, vec![second, third, first]);
}

#[test]
fn load_without_persisted_blob_yields_empty_collection() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());
    assert!(repo.load().is_empty());
    assert!(repo.try_load().unwrap().is_empty());
}

#[test]
fn corrupted_blob_falls_back_to_empty_collection() {
    let mut store = MemoryKeyValueStore::new();
    store.set(DEFAULT_STORAGE_KEY, br#"{"not": "a list"#).unwrap();
    let mut repo = StoryRepository::new(store);

    assert!(repo.load().is_empty());
}

#[test]
fn load_fallback_discards_in_memory_state() {
    let store = FailingWriteStore {
        seeded: Some(b"garbage".to_vec()),
        ..FailingWriteStore::default()
    };
    let mut repo = StoryRepository::new(store);
    repo.add(story_at("in memory", 0));
    assert_eq!(repo.len(), 1);

    assert!(repo.load().is_empty());
}

#[test]
fn try_load_surfaces_decode_errors_and_keeps_state() {
    let store = FailingWriteStore {
        seeded: Some(b"garbage".to_vec()),
        ..FailingWriteStore::default()
    };
    let mut repo = StoryRepository::new(store);
    let kept = story_at("kept", 0);
    repo.add(kept.clone());

    let err = repo.try_load().unwrap_err();
    assert!(matches!(err, RepoError::Decode(_)));
    assert_eq!(repo.stories(), &[kept]);
}

#[test]
fn persist_failure_is_swallowed_and_memory_stays_authoritative() {
    let mut repo = StoryRepository::new(FailingWriteStore::default());
    let story = story_at("unsaved", 0);

    let stories = repo.add(story.clone());
    assert_eq!(ids(stories), vec![story.id]);
    repo.persist();
    assert!(matches!(repo.try_persist(), Err(RepoError::Storage(_))));
    assert_eq!(repo.store().write_attempts, 3);
    assert_eq!(repo.get(story.id), Some(&story));
}

#[test]
fn load_uses_configured_storage_key() {
    let mut store = MemoryKeyValueStore::new();
    let story = story_at("keyed", 0);
    store
        .set("Drafts", &serde_json::to_vec(&vec![story.clone()]).unwrap())
        .unwrap();

    let mut default_key = StoryRepository::new(store.clone());
    assert!(default_key.load().is_empty());

    let mut custom_key = StoryRepository::with_storage_key(store, "Drafts");
    assert_eq!(custom_key.storage_key(), "Drafts");
    assert_eq!(custom_key.load(), &[story]);
}

#[test]
fn subscribers_see_every_mutation_until_unsubscribed() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());
    let seen: Rc<RefCell<Vec<usize>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let subscription = repo.subscribe(move |stories| sink.borrow_mut().push(stories.len()));

    let a = story_at("a", 0);
    repo.add(a.clone());
    repo.add(story_at("b", 1));
    repo.update(a.clone());
    repo.delete(&a);
    assert_eq!(*seen.borrow(), vec![1, 2, 2, 1]);

    assert!(repo.unsubscribe(subscription));
    assert!(!repo.unsubscribe(subscription));
    repo.add(story_at("c", 2));
    assert_eq!(seen.borrow().len(), 4);
}

#[test]
fn persisted_blob_uses_wire_field_names() {
    let mut repo = StoryRepository::new(MemoryKeyValueStore::new());
    let story = story_at("wire", 0);
    repo.add(story.clone());

    let bytes = repo.store().get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let entry = &value.as_array().expect("blob should be a JSON array")[0];
    assert_eq!(entry["id"], story.id.to_string());
    assert_eq!(entry["title"], "wire");
    assert_eq!(entry["content"], "");
    assert_eq!(entry["lastEdited"], "2025-03-12T09:00:00Z");
}
