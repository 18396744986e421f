use gpreg_store::{HostInfo, RegistryStore};
use gpreg_types::{Principal, RegistryKey, RegistryValue, ResolvedEntry, ResolvedSnapshot, Sid};
use pretty_assertions::assert_eq;

fn entry(path: &str, name: &str, value: u32, origin: &str) -> ResolvedEntry {
    ResolvedEntry {
        key: RegistryKey::new(path).unwrap(),
        value_name: name.into(),
        value: RegistryValue::Dword(value),
        origin_policy: origin.into(),
    }
}

fn user(sid: &str) -> Principal {
    Principal::User(Sid::parse(sid).unwrap())
}

fn keys(entries: &[&ResolvedEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| format!("{}\\{}", e.key, e.value_name))
        .collect()
}

const ALICE: &str = "S-1-5-21-1-2-3-1001";
const BOB: &str = "S-1-5-21-1-2-3-1002";

// ── Upsert & lookup ──────────────────────────────────────────────

#[test]
fn upsert_and_get() {
    let mut store = RegistryStore::open_in_memory().unwrap();
    store
        .upsert(&Principal::Machine, &entry("Control\\X", "V", 1, "Default"))
        .unwrap();

    let found = store.get_entry(&Principal::Machine, "Control\\X", "V").unwrap();
    assert_eq!(found.value, RegistryValue::Dword(1));
    assert_eq!(found.origin_policy, "Default");
}

#[test]
fn lookup_is_case_insensitive() {
    let mut store = RegistryStore::open_in_memory().unwrap();
    store
        .upsert(&Principal::Machine, &entry("Control\\X", "Value", 1, "Default"))
        .unwrap();
    assert!(store.get_entry(&Principal::Machine, "control/x", "VALUE").is_some());
}

#[test]
fn non_ascii_lookup_is_case_insensitive() {
    let mut store = RegistryStore::open_in_memory().unwrap();
    store
        .upsert(&Principal::Machine, &entry("Software\\Политика", "Значение", 1, "Default"))
        .unwrap();

    assert!(store.get_entry(&Principal::Machine, "software\\политика", "значение").is_some());
    assert_eq!(store.filter_entries(&Principal::Machine, "SOFTWARE\\ПОЛИТИКА").len(), 1);
    assert_eq!(store.filter_exact(&Principal::Machine, "software/политика").len(), 1);
}

#[test]
fn repeated_upsert_keeps_last_write() {
    let mut store = RegistryStore::open_in_memory().unwrap();
    let mut writer = store.begin(Principal::Machine).unwrap();
    writer.upsert(&entry("K", "V", 1, "A")).unwrap();
    writer.upsert(&entry("k", "v", 2, "B")).unwrap();
    assert_eq!(writer.staged_len(), 1);
    writer.commit().unwrap();

    let all = store.filter_entries(&Principal::Machine, "");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].value, RegistryValue::Dword(2));
    assert_eq!(all[0].origin_policy, "B");
}

#[test]
fn missing_entries() {
    let store = RegistryStore::open_in_memory().unwrap();
    assert!(store.get_entry(&Principal::Machine, "Nope", "V").is_none());
    assert!(store.get_entry(&user(ALICE), "Nope", "V").is_none());
    assert!(store.get_entry(&Principal::Machine, "", "V").is_none());
    assert!(store.filter_entries(&user(ALICE), "").is_empty());
}

// ── Wipe ─────────────────────────────────────────────────────────

#[test]
fn wipe_machine_empties_machine_hive() {
    let mut store = RegistryStore::open_in_memory().unwrap();
    store.upsert(&Principal::Machine, &entry("A", "V", 1, "p")).unwrap();
    store.upsert(&Principal::Machine, &entry("B", "V", 2, "p")).unwrap();
    store.upsert(&user(ALICE), &entry("A", "V", 3, "p")).unwrap();

    store.wipe_machine().unwrap();

    assert!(store.filter_entries(&Principal::Machine, "").is_empty());
    assert_eq!(store.filter_entries(&user(ALICE), "").len(), 1);
}

#[test]
fn wipe_user_only_touches_that_sid() {
    let mut store = RegistryStore::open_in_memory().unwrap();
    store.upsert(&user(ALICE), &entry("A", "V", 1, "p")).unwrap();
    store.upsert(&user(BOB), &entry("A", "V", 2, "p")).unwrap();
    store.upsert(&Principal::Machine, &entry("A", "V", 3, "p")).unwrap();

    store.wipe_user(&Sid::parse(ALICE).unwrap()).unwrap();

    assert!(store.filter_entries(&user(ALICE), "").is_empty());
    assert_eq!(store.filter_entries(&user(BOB), "").len(), 1);
    assert_eq!(store.filter_entries(&Principal::Machine, "").len(), 1);
    let users: Vec<_> = store.users().map(Sid::to_string).collect();
    assert_eq!(users, [BOB]);
}

// ── Filtering ────────────────────────────────────────────────────

#[test]
fn filter_is_ordered_by_key_then_value() {
    let mut store = RegistryStore::open_in_memory().unwrap();
    for (path, name) in [
        ("Software\\Policies\\b", "z"),
        ("Software\\Policies\\A", "y"),
        ("Software\\Policies\\a", "x"),
        ("Software\\Other", "w"),
    ] {
        store.upsert(&Principal::Machine, &entry(path, name, 0, "p")).unwrap();
    }

    assert_eq!(
        keys(&store.filter_entries(&Principal::Machine, "Software\\Policies")),
        [
            "Software\\Policies\\a\\x",
            "Software\\Policies\\A\\y",
            "Software\\Policies\\b\\z",
        ]
    );
    assert_eq!(store.filter_entries(&Principal::Machine, "").len(), 4);
}

#[test]
fn filter_exact_excludes_subkeys() {
    let mut store = RegistryStore::open_in_memory().unwrap();
    store.upsert(&Principal::Machine, &entry("Control", "a", 1, "p")).unwrap();
    store.upsert(&Principal::Machine, &entry("Control\\Sub", "b", 2, "p")).unwrap();
    store.upsert(&Principal::Machine, &entry("ControlPanel", "c", 3, "p")).unwrap();

    assert_eq!(keys(&store.filter_exact(&Principal::Machine, "control")), ["Control\\a"]);
    assert_eq!(store.filter_entries(&Principal::Machine, "Control").len(), 3);
}

// ── Transactions ─────────────────────────────────────────────────

#[test]
fn dropped_writer_rolls_back() {
    let mut store = RegistryStore::open_in_memory().unwrap();
    store.upsert(&Principal::Machine, &entry("Control\\Y", "V", 5, "Old")).unwrap();

    {
        let mut writer = store.begin(Principal::Machine).unwrap();
        writer.wipe().unwrap();
        writer.upsert(&entry("Control\\X", "V", 1, "New")).unwrap();
    }

    let all = store.filter_entries(&Principal::Machine, "");
    assert_eq!(keys(&all), ["Control\\Y\\V"]);
}

#[test]
fn replace_snapshot_swaps_whole_hive() {
    let mut store = RegistryStore::open_in_memory().unwrap();
    store.upsert(&Principal::Machine, &entry("Control\\Y", "V", 5, "Old")).unwrap();

    let snapshot: ResolvedSnapshot = [entry("Control\\X", "V", 2, "Finance")].into_iter().collect();
    store.replace_snapshot(&Principal::Machine, &snapshot).unwrap();

    assert_eq!(store.snapshot(&Principal::Machine), snapshot);
    assert!(store.get_entry(&Principal::Machine, "Control\\Y", "V").is_none());
}

#[test]
fn failed_replace_keeps_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.sqlite");

    let mut store = RegistryStore::open(&path).unwrap();
    let previous: ResolvedSnapshot = [entry("Control\\Y", "V", 5, "Old")].into_iter().collect();
    store.replace_snapshot(&Principal::Machine, &previous).unwrap();

    let saboteur = rusqlite::Connection::open(&path).unwrap();
    saboteur
        .execute_batch(
            "CREATE TRIGGER fail_poison BEFORE INSERT ON hklm
             WHEN NEW.value_fold = 'poison'
             BEGIN SELECT RAISE(ABORT, 'simulated disk failure'); END;",
        )
        .unwrap();
    drop(saboteur);

    let next: ResolvedSnapshot = [
        entry("Control\\A", "V", 1, "New"),
        entry("Control\\Z", "poison", 2, "New"),
    ]
    .into_iter()
    .collect();
    assert!(store.replace_snapshot(&Principal::Machine, &next).is_err());

    assert_eq!(store.snapshot(&Principal::Machine), previous);
    drop(store);
    let reopened = RegistryStore::open(&path).unwrap();
    assert_eq!(reopened.snapshot(&Principal::Machine), previous);
}

// ── Persistence ──────────────────────────────────────────────────

#[test]
fn entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.sqlite");

    {
        let mut store = RegistryStore::open(&path).unwrap();
        store.upsert(&Principal::Machine, &entry("Control\\X", "V", 2, "Finance")).unwrap();
        store
            .upsert(
                &user(ALICE),
                &ResolvedEntry {
                    key: RegistryKey::new("Software\\Policies\\Browser").unwrap(),
                    value_name: "Homepage".into(),
                    value: RegistryValue::MultiString(vec!["a".into(), "b".into()]),
                    origin_policy: "Users".into(),
                },
            )
            .unwrap();
    }

    let store = RegistryStore::open(&path).unwrap();
    assert_eq!(
        store.get_entry(&Principal::Machine, "Control\\X", "V").unwrap().value,
        RegistryValue::Dword(2)
    );
    let homepage = store
        .get_entry(&user(ALICE), "software\\policies\\browser", "homepage")
        .unwrap();
    assert_eq!(homepage.key.as_str(), "Software\\Policies\\Browser");
    assert_eq!(
        homepage.value,
        RegistryValue::MultiString(vec!["a".into(), "b".into()])
    );
    assert_eq!(store.users().count(), 1);
}

#[test]
fn host_info_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.sqlite");
    let info = HostInfo {
        machine_sid: Some(Sid::parse("S-1-5-21-100-200-300").unwrap()),
        machine_name: Some("ws01".into()),
        domain: Some("example.test".into()),
        cache_dir: Some(dir.path().join("cache")),
        last_update: None,
    };

    {
        let mut store = RegistryStore::open(&path).unwrap();
        let mut writer = store.begin(Principal::Machine).unwrap();
        writer.set_host_info(&info).unwrap();
        writer.commit().unwrap();
        assert_eq!(store.host_info(), &info);
    }

    let store = RegistryStore::open(&path).unwrap();
    assert_eq!(store.host_info(), &info);
    assert_eq!(store.domain(), Some("example.test"));
    assert_eq!(store.machine_sid().unwrap().as_str(), "S-1-5-21-100-200-300");
    assert_eq!(store.cache_dir(), Some(dir.path().join("cache").as_path()));
}

#[test]
fn corrupt_user_row_leaves_other_hives_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.sqlite");
    {
        let mut store = RegistryStore::open(&path).unwrap();
        store.upsert(&Principal::Machine, &entry("Control\\X", "V", 1, "Default")).unwrap();
        store.upsert(&user(ALICE), &entry("Desktop", "Wallpaper", 1, "Users")).unwrap();
        store.upsert(&user(BOB), &entry("Desktop", "Wallpaper", 2, "Users")).unwrap();
    }

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute(
        "INSERT INTO hkcu VALUES (?1, 'k', 'v', 'K', 'v', 4, 'oops', 'p')",
        [ALICE],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO hkcu VALUES ('not-a-sid', 'k', 'v', 'K', 'v', 4, '1', 'p')",
        [],
    )
    .unwrap();
    drop(conn);

    let mut store = RegistryStore::open(&path).unwrap();
    assert!(store.get_entry(&Principal::Machine, "Control\\X", "V").is_some());
    assert!(store.get_entry(&user(BOB), "Desktop", "Wallpaper").is_some());
    assert!(store.get_entry(&user(ALICE), "Desktop", "Wallpaper").is_some());
    assert!(store.get_entry(&user(ALICE), "K", "v").is_none());
    assert_eq!(store.users().count(), 2);

    // A rewrite of the damaged hive drops the bad row for good.
    let next: ResolvedSnapshot = [entry("Desktop", "Wallpaper", 3, "Users")].into_iter().collect();
    store.replace_snapshot(&user(ALICE), &next).unwrap();
    drop(store);

    let conn = rusqlite::Connection::open(&path).unwrap();
    let bad: i64 = conn
        .query_row("SELECT COUNT(*) FROM hkcu WHERE data = 'oops'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(bad, 0);
}

#[test]
fn corrupt_machine_row_and_info_value_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.sqlite");
    {
        let mut store = RegistryStore::open(&path).unwrap();
        store.upsert(&Principal::Machine, &entry("Control\\X", "V", 1, "Default")).unwrap();
    }

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute(
        "INSERT INTO hklm VALUES ('k', 'v', 'K', 'v', 99, '1', 'p')",
        [],
    )
    .unwrap();
    conn.execute_batch(
        "INSERT INTO info VALUES ('domain', 'example.test');
         INSERT INTO info VALUES ('last_update', 'yesterday');",
    )
    .unwrap();
    drop(conn);

    let store = RegistryStore::open(&path).unwrap();
    assert_eq!(store.filter_entries(&Principal::Machine, "").len(), 1);
    assert_eq!(store.domain(), Some("example.test"));
    assert!(store.host_info().last_update.is_none());
}
