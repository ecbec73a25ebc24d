// Roster reconciliation invariants: one entry per human user id, one entry
// per automated display name, stable display ordering.

use parley::room::{Participant, Roster};

#[test]
fn repeated_user_joined_events_keep_a_single_entry() {
    let mut roster = Roster::new();

    // Reconnect race: the same user id arrives on three connections
    roster.user_joined(Participant::human("s1", "u1", "Alice"));
    roster.user_joined(Participant::human("s2", "u1", "Alice"));
    roster.user_joined(Participant::human("s3", "u1", "Alice"));

    assert_eq!(roster.len(), 1);
    let entries: Vec<_> = roster.iter().collect();
    assert_eq!(entries[0].user_id(), "u1");
}

#[test]
fn user_left_removes_by_connection_id_only() {
    let mut roster = Roster::new();
    roster.user_joined(Participant::human("s1", "u1", "Alice"));
    roster.user_joined(Participant::human("s2", "u2", "Bob"));

    roster.user_left("s1");

    assert_eq!(roster.len(), 1);
    assert_eq!(roster.iter().next().unwrap().name(), "Bob");

    // Departure of an unknown connection is not an error
    roster.user_left("s1");
    assert_eq!(roster.len(), 1);
}

#[test]
fn snapshot_replaces_humans_and_preserves_personas() {
    let mut roster = Roster::new();
    roster.set_automated(vec![
        Participant::automated("ai-0", "AI Participant 1"),
        Participant::automated("ai-1", "AI Participant 2"),
    ]);
    roster.user_joined(Participant::human("s1", "u1", "Alice"));

    roster.apply_snapshot(vec![
        Participant::human("s2", "u2", "Bob"),
        Participant::human("s3", "u3", "Carol"),
    ]);

    let names: Vec<_> = roster.iter().map(|p| p.name().to_string()).collect();
    assert!(!names.contains(&"Alice".to_string()));
    assert!(names.contains(&"Bob".to_string()));
    assert!(names.contains(&"Carol".to_string()));
    assert!(names.contains(&"AI Participant 1".to_string()));
    assert!(names.contains(&"AI Participant 2".to_string()));
}

#[test]
fn empty_snapshot_clears_humans_but_keeps_personas() {
    let mut roster = Roster::new();
    roster.set_automated(vec![
        Participant::automated("ai-0", "AI Participant 1"),
        Participant::automated("ai-1", "AI Participant 2"),
    ]);
    roster.user_joined(Participant::human("s1", "u1", "Alice"));

    roster.apply_snapshot(Vec::new());

    assert_eq!(roster.len(), 2);
    assert!(roster.iter().all(|p| p.is_automated()));
}

#[test]
fn automated_name_reconciliation_overwrites_placeholders() {
    let mut roster = Roster::new();
    roster.set_automated(vec![
        Participant::generic_automated(0),
        Participant::generic_automated(1),
    ]);

    // The backend assigned a real persona name; every later event carries it
    roster.reconcile_automated_name("ai-0", "Morgan");
    roster.reconcile_automated_name("ai-0", "Morgan");

    let names: Vec<_> = roster.iter().map(|p| p.name().to_string()).collect();
    assert!(names.contains(&"Morgan".to_string()));
    assert!(names.contains(&"AI Participant 2".to_string()));
    assert_eq!(roster.len(), 2);
}

#[test]
fn reconciling_to_an_existing_name_collapses_duplicates() {
    let mut roster = Roster::new();
    roster.set_automated(vec![
        Participant::automated("ai-0", "Morgan"),
        Participant::automated("ai-1", "AI Participant 2"),
    ]);

    // Both ids now answer to the same persona name; the name key dedupes
    roster.reconcile_automated_name("ai-1", "Morgan");

    assert_eq!(roster.len(), 1);
    assert_eq!(roster.iter().next().unwrap().name(), "Morgan");
}

#[test]
fn display_sort_puts_humans_first_then_personas_by_number() {
    let mut roster = Roster::new();
    roster.set_automated(vec![
        Participant::automated("ai-1", "AI Participant 2"),
        Participant::automated("ai-0", "AI Participant 1"),
    ]);
    roster.user_joined(Participant::human("s1", "u1", "Bob"));
    roster.user_joined(Participant::human("s2", "u2", "Alice"));

    let names: Vec<_> = roster.sorted().iter().map(|p| p.name().to_string()).collect();
    assert_eq!(
        names,
        vec!["Alice", "Bob", "AI Participant 1", "AI Participant 2"]
    );
}

#[test]
fn latest_human_entry_wins_after_rejoin_with_new_name() {
    let mut roster = Roster::new();
    roster.user_joined(Participant::human("s1", "u1", "Alice"));

    // A snapshot carries the same user id on a fresh connection with an
    // updated display name
    roster.apply_snapshot(vec![
        Participant::human("s9", "u1", "Alice B."),
        Participant::human("s2", "u2", "Bob"),
    ]);

    assert_eq!(roster.len(), 2);
    let alice = roster
        .iter()
        .find(|p| p.user_id() == "u1")
        .expect("u1 present");
    assert_eq!(alice.name(), "Alice B.");
}
