use std::{
    collections::BTreeSet,
    sync::{mpsc, Arc, Mutex},
    thread,
    time::Duration,
};

use presale_reserve::{
    services::{
        KeyValuePersistence, KeyValueStorage, MemoryStorage, ShortlistPersistence, StaticCatalog,
        UnitCatalog, STORAGE_KEY,
    },
    state::{ShortlistState, ShortlistStore, Subscription, UnitRecord},
    utils::{parse_share_link, Diagnostics},
};

const BASE: &str = "https://presale.example/shortlist";

type Seen = Arc<Mutex<Vec<Vec<String>>>>;

fn record_into(seen: &Seen) -> impl Fn(&ShortlistState) + Send + Sync + 'static {
    let seen = Arc::clone(seen);
    move |state: &ShortlistState| seen.lock().unwrap().push(state.unit_ids.clone())
}

fn memory_backed(storage: MemoryStorage) -> (Arc<KeyValuePersistence<MemoryStorage>>, ShortlistStore, Diagnostics) {
    let persistence = Arc::new(KeyValuePersistence::new(storage));
    let diagnostics = Diagnostics::new();
    let store = ShortlistStore::init(
        Some(Arc::clone(&persistence) as Arc<dyn ShortlistPersistence>),
        None,
        diagnostics.clone(),
    );
    (persistence, store, diagnostics)
}

#[test]
fn operation_sequences_match_plain_set_semantics() {
    let store = ShortlistStore::in_memory();
    let mut model = BTreeSet::new();
    let ids = ["a", "b", "c", "d", "e"];

    // Small deterministic LCG so the sequence is stable across runs
    let mut seed: u64 = 0x5eed;
    for _ in 0..500 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let id = ids[(seed >> 33) as usize % ids.len()];
        match (seed >> 40) % 3 {
            0 => {
                store.add_unit(id);
                model.insert(id.to_string());
            }
            1 => {
                store.remove_unit(id);
                model.remove(id);
            }
            _ => {
                store.toggle_unit(id);
                if !model.remove(id) {
                    model.insert(id.to_string());
                }
            }
        }

        let actual: BTreeSet<String> = store.get_shortlist().unit_ids.into_iter().collect();
        assert_eq!(actual, model);
    }
}

#[test]
fn duplicate_add_keeps_one_entry_and_notifies_once() {
    let store = ShortlistStore::in_memory();
    let seen = Seen::default();
    let _sub = store.subscribe(record_into(&seen));

    assert!(store.add_unit("u1"));
    assert!(!store.add_unit("u1"));

    assert_eq!(store.get_shortlist().unit_ids, vec!["u1"]);
    assert_eq!(*seen.lock().unwrap(), vec![vec!["u1".to_string()]]);
}

#[test]
fn removing_an_absent_unit_does_not_notify() {
    let store = ShortlistStore::in_memory();
    let seen = Seen::default();
    let _sub = store.subscribe(record_into(&seen));

    assert!(!store.remove_unit("ghost"));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn double_toggle_restores_state_with_two_notifications() {
    let store = ShortlistStore::in_memory();
    store.add_unit("keep");
    let seen = Seen::default();
    let _sub = store.subscribe(record_into(&seen));

    store.toggle_unit("x");
    store.toggle_unit("x");

    assert_eq!(store.get_shortlist().unit_ids, vec!["keep"]);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            vec!["keep".to_string(), "x".to_string()],
            vec!["keep".to_string()],
        ]
    );
}

#[test]
fn clear_always_notifies() {
    let store = ShortlistStore::in_memory();
    let seen = Seen::default();
    let _sub = store.subscribe(record_into(&seen));

    store.clear();
    store.add_unit("u1");
    store.clear();

    assert!(store.is_empty());
    assert_eq!(seen.lock().unwrap().len(), 3);
    assert!(seen.lock().unwrap()[2].is_empty());
}

#[test]
fn share_link_is_independent_of_insertion_order() {
    let first = ShortlistStore::in_memory();
    first.add_unit("A");
    first.add_unit("B");

    let second = ShortlistStore::in_memory();
    second.toggle_unit("B");
    second.add_unit("A");

    let link = first.generate_share_link(Some(BASE));
    assert_eq!(link, second.generate_share_link(Some(BASE)));
    assert_eq!(link, format!("{BASE}?units=A,B"));
    assert_eq!(parse_share_link(&link), vec!["A", "B"]);

    first.clear();
    assert_eq!(first.generate_share_link(Some(BASE)), BASE);
}

#[test]
fn listeners_run_in_registration_order() {
    let store = ShortlistStore::in_memory();
    let order = Arc::new(Mutex::new(Vec::new()));

    let subs: Vec<Subscription> = (0..4)
        .map(|n| {
            let order = Arc::clone(&order);
            store.subscribe(move |_| order.lock().unwrap().push(n))
        })
        .collect();

    store.add_unit("u1");
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    drop(subs);
}

#[test]
fn listener_can_unsubscribe_a_later_listener_mid_pass() {
    let store = ShortlistStore::in_memory();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let victim: Arc<Mutex<Option<Subscription>>> = Arc::default();

    let first = {
        let calls = Arc::clone(&calls);
        let victim = Arc::clone(&victim);
        store.subscribe(move |_| {
            calls.lock().unwrap().push("first");
            if let Some(sub) = victim.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        })
    };
    let second = {
        let calls = Arc::clone(&calls);
        store.subscribe(move |_| calls.lock().unwrap().push("second"))
    };
    let third = {
        let calls = Arc::clone(&calls);
        store.subscribe(move |_| calls.lock().unwrap().push("third"))
    };
    *victim.lock().unwrap() = Some(second);

    store.add_unit("u1");
    assert_eq!(*calls.lock().unwrap(), vec!["first", "third"]);
    assert_eq!(store.listener_count(), 2);

    store.add_unit("u2");
    assert_eq!(*calls.lock().unwrap(), vec!["first", "third", "first", "third"]);
    drop((first, third));
}

#[test]
fn listener_can_unsubscribe_itself_mid_pass() {
    let store = ShortlistStore::in_memory();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let own: Arc<Mutex<Option<Subscription>>> = Arc::default();

    let once = {
        let calls = Arc::clone(&calls);
        let own = Arc::clone(&own);
        store.subscribe(move |_| {
            calls.lock().unwrap().push("once");
            if let Some(sub) = own.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        })
    };
    *own.lock().unwrap() = Some(once);
    let _always = {
        let calls = Arc::clone(&calls);
        store.subscribe(move |_| calls.lock().unwrap().push("always"))
    };

    store.add_unit("u1");
    store.add_unit("u2");

    assert_eq!(*calls.lock().unwrap(), vec!["once", "always", "always"]);
    assert!(!own.lock().unwrap().as_ref().unwrap().is_active());
}

#[test]
fn listeners_observe_the_committed_state() {
    let store = Arc::new(ShortlistStore::in_memory());
    let lengths = Arc::new(Mutex::new(Vec::new()));
    let _sub = {
        let reader = Arc::clone(&store);
        let lengths = Arc::clone(&lengths);
        store.subscribe(move |state| {
            lengths.lock().unwrap().push((state.len(), reader.len()));
        })
    };

    store.add_unit("u1");
    store.add_unit("u2");
    assert_eq!(*lengths.lock().unwrap(), vec![(1, 1), (2, 2)]);
}

#[test]
fn concurrent_mutations_end_on_the_committed_state() {
    let store = Arc::new(ShortlistStore::in_memory());
    let count = Arc::new(Mutex::new(0usize));
    let last_len = Arc::new(Mutex::new(0usize));
    let _sub = {
        let count = Arc::clone(&count);
        let last_len = Arc::clone(&last_len);
        store.subscribe(move |state| {
            *count.lock().unwrap() += 1;
            *last_len.lock().unwrap() = state.len();
        })
    };

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for n in 0..25 {
                    store.add_unit(&format!("w{worker}-{n}"));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(store.len(), 100);
    // Passes overtaken by a newer revision are skipped, never replayed
    let count = *count.lock().unwrap();
    assert!((1..=100).contains(&count), "{count} notifications");
    assert_eq!(*last_len.lock().unwrap(), 100);
}

#[test]
fn slow_listener_on_another_thread_ends_on_the_latest_state() {
    let store = Arc::new(ShortlistStore::in_memory());
    let last_seen = Arc::new(Mutex::new(Vec::new()));
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let _sub = {
        let last_seen = Arc::clone(&last_seen);
        store.subscribe(move |state| {
            if state.unit_ids == ["x"] {
                entered_tx.send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
            }
            *last_seen.lock().unwrap() = state.unit_ids.clone();
        })
    };

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.add_unit("x"))
    };
    entered_rx.recv().unwrap();
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();
    });

    // Runs while the listener is still parked inside the writer's pass
    assert!(store.add_unit("y"));
    assert!(writer.join().unwrap());
    releaser.join().unwrap();

    assert_eq!(store.get_shortlist().unit_ids, ["x", "y"]);
    assert_eq!(*last_seen.lock().unwrap(), ["x", "y"]);
}

#[test]
fn listener_mutation_mid_pass_supersedes_the_outer_pass() {
    let store = Arc::new(ShortlistStore::in_memory());
    let seen: Seen = Arc::default();
    let _adder = {
        let handle = Arc::downgrade(&store);
        store.subscribe(move |state| {
            if let Some(store) = handle.upgrade() {
                if state.unit_ids == ["a"] {
                    store.add_unit("a-parking");
                }
            }
        })
    };
    let _recorder = store.subscribe(record_into(&seen));

    store.add_unit("a");

    assert_eq!(store.get_shortlist().unit_ids, ["a", "a-parking"]);
    // The recorder only ever sees the newer state
    assert_eq!(*seen.lock().unwrap(), vec![vec!["a", "a-parking"]]);
}

#[test]
fn blank_ids_are_ignored_without_notifying() {
    let store = ShortlistStore::in_memory();
    let seen: Seen = Arc::default();
    let _sub = store.subscribe(record_into(&seen));

    assert!(!store.add_unit(""));
    assert!(!store.toggle_unit(""));
    assert!(!store.toggle_unit("   "));

    assert!(store.is_empty());
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(store.generate_share_link(Some(BASE)), BASE);
}

#[test]
fn shortlist_survives_a_reload() {
    let (persistence, store, diagnostics) = memory_backed(MemoryStorage::new());
    store.add_unit("b");
    store.add_unit("a");
    store.remove_unit("b");
    store.add_unit("c");
    assert_eq!(persistence.storage().raw(STORAGE_KEY).as_deref(), Some(r#"["a","c"]"#));

    let reloaded = ShortlistStore::init(
        Some(Arc::clone(&persistence) as Arc<dyn ShortlistPersistence>),
        None,
        Diagnostics::new(),
    );
    assert_eq!(reloaded.get_shortlist().unit_ids, vec!["a", "c"]);
    assert!(!reloaded.is_degraded());
    assert!(diagnostics.is_empty());
}

#[test]
fn unavailable_storage_degrades_to_memory_only() {
    let (_persistence, store, diagnostics) = memory_backed(MemoryStorage::unavailable());

    assert!(store.is_degraded());
    assert_eq!(diagnostics.count("storage_unavailable"), 1);

    store.add_unit("u1");
    store.toggle_unit("u2");
    assert_eq!(store.get_shortlist().unit_ids, vec!["u1", "u2"]);
    // Degraded stores stop trying, so no further reports
    assert_eq!(diagnostics.count("storage_unavailable"), 1);
}

#[test]
fn storage_failing_mid_session_stops_persisting() {
    let (persistence, store, diagnostics) = memory_backed(MemoryStorage::new());
    store.add_unit("u1");

    persistence.storage().set_available(false);
    store.add_unit("u2");
    assert!(store.is_degraded());
    assert_eq!(diagnostics.count("storage_unavailable"), 1);

    persistence.storage().set_available(true);
    store.add_unit("u3");
    assert_eq!(persistence.storage().raw(STORAGE_KEY).as_deref(), Some(r#"["u1"]"#));
    assert_eq!(store.len(), 3);
}

#[test]
fn corrupt_payload_starts_empty_and_is_overwritten() {
    let storage = MemoryStorage::new();
    storage.set(STORAGE_KEY, "not json").unwrap();
    let (persistence, store, diagnostics) = memory_backed(storage);

    assert!(store.is_empty());
    assert!(!store.is_degraded());
    assert_eq!(diagnostics.count("json"), 1);

    store.add_unit("u1");
    assert_eq!(persistence.storage().raw(STORAGE_KEY).as_deref(), Some(r#"["u1"]"#));
}

#[test]
fn items_follow_ids_through_the_catalog() {
    let catalog: Arc<dyn UnitCatalog> = Arc::new(StaticCatalog::new([
        UnitRecord {
            id: "a-101".into(),
            name: "Residence A-101".into(),
            floor: Some(1),
            price: Some(689_000),
        },
        UnitRecord {
            id: "b-704".into(),
            name: "Penthouse B-704".into(),
            floor: Some(7),
            price: None,
        },
    ]));
    let store = ShortlistStore::init(None, Some(catalog), Diagnostics::new());

    store.add_unit("b-704");
    store.add_unit("missing");
    store.add_unit("a-101");

    let snapshot = store.get_shortlist();
    assert_eq!(snapshot.unit_ids, vec!["b-704", "missing", "a-101"]);
    let names: Vec<&str> = snapshot.items.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["Penthouse B-704", "Residence A-101"]);

    store.toggle_unit("b-704");
    assert_eq!(store.get_shortlist().items.len(), 1);
    store.clear();
    assert!(store.get_shortlist().items.is_empty());
}
