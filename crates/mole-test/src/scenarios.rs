//! End-to-end table scenarios

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use mole_core::{MoleError, PlayerId, Role, SessionId, Status};
use mole_game::{RoleView, RosterView, WatchEvent};
use mole_store::{MemoryStore, SessionStore, StorePath};

use crate::{FlakyStore, Table};

const HOUR: Duration = Duration::from_secs(60 * 60);

fn updated(event: Option<mole_core::MoleResult<WatchEvent>>) -> RosterView {
    match event {
        Some(Ok(WatchEvent::Updated(view))) => view,
        other => panic!("expected a roster update, got {other:?}"),
    }
}

#[tokio::test]
async fn submarine_round_with_two_spies() {
    let mut table = Table::new(1);
    let seating = table.seat(5).await.unwrap();
    let id = &seating.session_id;

    assert_eq!(seating.host.set_spy_count(id, 2).await.unwrap(), 2);
    seating.host.set_location(id, "Submarine").await.unwrap();

    let mut watches: Vec<_> = seating.everyone().map(|c| c.watch(id).unwrap()).collect();
    for watch in &mut watches {
        let view = updated(watch.next().await);
        assert_eq!(view.status, Status::Waiting);
        assert_eq!(view.player_count(), 6);
    }

    seating.host.start_game(id).await.unwrap();

    let session = seating.host.fetch_session(id).await.unwrap();
    assert_eq!(session.status, Status::InProgress);
    assert_eq!(session.location, "Submarine");
    assert_eq!(session.count_role(Role::Spy), 2);
    assert_eq!(session.count_role(Role::Player), 4);

    // One aggregate update: every client gets exactly one complete snapshot
    let mut spies = 0;
    for watch in &mut watches {
        let view = updated(watch.next().await);
        assert!(!view.is_assigning_roles());
        match view.role {
            RoleView::Spy => {
                spies += 1;
                assert_eq!(view.location, None);
            }
            RoleView::Player => assert_eq!(view.location.as_deref(), Some("Submarine")),
            other => panic!("unexpected role {other:?}"),
        }
        assert!(watch.try_next().is_none());
    }
    assert_eq!(spies, 2);
}

#[tokio::test]
async fn many_rounds_keep_invariants() {
    let mut table = Table::new(2);
    let seating = table.seat(7).await.unwrap();
    let id = &seating.session_id;
    let host = &seating.host;
    host.set_spy_count(id, 3).await.unwrap();

    let mut times_spy: std::collections::BTreeMap<PlayerId, u32> = Default::default();
    for round in 0..30 {
        host.set_location(id, &format!("Location {round}")).await.unwrap();
        let deal = host.start_game(id).await.unwrap();

        let session = host.fetch_session(id).await.unwrap();
        assert!(session.roles_match_status());
        assert_eq!(session.count_role(Role::Spy), 3);
        for (player, role) in deal {
            if role == Role::Spy {
                *times_spy.entry(player).or_default() += 1;
            }
        }

        host.new_round(id).await.unwrap();
        let session = host.fetch_session(id).await.unwrap();
        assert_eq!(session.status, Status::Waiting);
        assert_eq!(session.location, "");
        assert!(session.roles_match_status());
    }

    // 90 spy seats over 8 players: nobody should be left out entirely
    assert_eq!(times_spy.values().sum::<u32>(), 90);
    assert_eq!(times_spy.len(), 8);
}

#[tokio::test]
async fn mid_round_joiner_waits_for_next_round() {
    let mut table = Table::new(3);
    let seating = table.seat(3).await.unwrap();
    let id = &seating.session_id;
    seating.host.set_location(id, "Hospital").await.unwrap();
    seating.host.start_game(id).await.unwrap();

    let late = table.client();
    late.join_game(id, "Late").await.unwrap();
    let mut watch = late.watch(id).unwrap();
    let view = updated(watch.next().await);
    assert!(view.is_assigning_roles());
    assert_eq!(view.location, None);

    seating.host.new_round(id).await.unwrap();
    seating.host.set_location(id, "Hospital").await.unwrap();
    seating.host.start_game(id).await.unwrap();

    let session = seating.host.fetch_session(id).await.unwrap();
    assert!(session.player(late.player_id()).unwrap().role.is_assigned());
}

#[tokio::test]
async fn kick_and_join_last_write_wins() {
    let mut table = Table::new(4);
    let seating = table.seat(2).await.unwrap();
    let id = &seating.session_id;
    let target = &seating.guests[0];

    seating.host.kick_player(id, target.player_id()).await.unwrap();
    target.join_game(id, "Back again").await.unwrap();
    let session = seating.host.fetch_session(id).await.unwrap();
    assert_eq!(session.player(target.player_id()).unwrap().name, "Back again");

    target.join_game(id, "Once more").await.unwrap();
    seating.host.kick_player(id, target.player_id()).await.unwrap();
    let session = seating.host.fetch_session(id).await.unwrap();
    assert!(session.player(target.player_id()).is_none());
    assert_eq!(session.players.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_all_land() {
    let mut table = Table::new(5);
    let seating = table.seat(0).await.unwrap();
    let id = seating.session_id.clone();

    let mut tasks = Vec::new();
    let mut expected = vec![seating.host.player_id().clone()];
    for i in 0..16 {
        let guest = Arc::new(table.client());
        expected.push(guest.player_id().clone());
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            guest.join_game(&id, &format!("Guest {i}")).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let session = seating.host.fetch_session(&id).await.unwrap();
    expected.sort();
    assert_eq!(session.player_ids(), expected);
}

#[tokio::test]
async fn reaper_ttl_scenario() {
    let mut table = Table::new(6);

    let old = table.seat(2).await.unwrap();
    let busy = table.seat(2).await.unwrap();
    busy.host.set_location(&busy.session_id, "Casino").await.unwrap();
    busy.host.start_game(&busy.session_id).await.unwrap();

    table.clock().advance(2 * HOUR);
    let fresh = table.seat(1).await.unwrap();

    // old and busy are now 6h old, fresh is 4h old
    table.clock().advance(4 * HOUR);

    let mut watch = busy.guests[0].watch(&busy.session_id).unwrap();
    updated(watch.next().await);

    let report = table.reaper().sweep().await.unwrap();
    assert_eq!(report.scanned, 3);
    let mut deleted = report.deleted.clone();
    deleted.sort();
    let mut expected = vec![old.session_id.clone(), busy.session_id.clone()];
    expected.sort();
    assert_eq!(deleted, expected);

    assert!(fresh.host.fetch_session(&fresh.session_id).await.is_ok());
    assert_eq!(watch.next().await.unwrap().unwrap(), WatchEvent::Gone);

    let gone = MoleError::GameNotFound(busy.session_id.clone());
    assert_eq!(busy.host.new_round(&busy.session_id).await.unwrap_err(), gone);
    assert_eq!(busy.guests[1].join_game(&busy.session_id, "Again").await.unwrap_err(), gone);
}

#[tokio::test]
async fn transport_failures_propagate_unchanged() {
    let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
    let mut table = Table::with_store(Arc::clone(&flaky), 7);
    let seating = table.seat(3).await.unwrap();
    let id = &seating.session_id;
    seating.host.set_location(id, "Library").await.unwrap();

    flaky.set_fail_mutations(true);
    let err = seating.host.start_game(id).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(flaky.injected_failures(), 1);

    flaky.set_fail_mutations(false);
    let session = seating.host.fetch_session(id).await.unwrap();
    assert_eq!(session.status, Status::Waiting);
    assert_eq!(session.count_role(Role::Unassigned), 4);

    flaky.set_fail_reads(true);
    let err = seating.guests[0].join_game(id, "Again").await.unwrap_err();
    assert!(matches!(err, MoleError::StoreUnavailable(_)));
    assert!(table.reaper().sweep().await.unwrap_err().is_transport());
}

#[tokio::test]
async fn guest_cannot_act_as_host() {
    let mut table = Table::new(8);
    let seating = table.seat(2).await.unwrap();
    let id = &seating.session_id;
    let guest = &seating.guests[0];
    seating.host.set_location(id, "Theatre").await.unwrap();
    let before = table.store().mutation_count();

    let err = guest.start_game(id).await.unwrap_err();
    assert!(matches!(err, MoleError::PermissionDenied { .. }));
    assert_eq!(table.store().mutation_count(), before);

    // Claiming the host id is enough: authority is asserted, not verified
    let impostor = table.client().with_player_id(seating.host.player_id().clone());
    assert_eq!(impostor.start_game(id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn late_role_write_after_kick_leaves_nameless_entry() {
    let mut table = Table::new(9);
    let seating = table.seat(1).await.unwrap();
    let id: &SessionId = &seating.session_id;
    let guest = seating.guests[0].player_id().clone();

    seating.host.kick_player(id, &guest).await.unwrap();
    // A stale role write from another client lands after the kick
    let role_path = StorePath::parse(&format!("games/{id}/players/{guest}/role")).unwrap();
    table.store().write(&role_path, json!("spy")).await.unwrap();

    let mut watch = seating.host.watch(id).unwrap();
    let view = updated(watch.next().await);
    let entry = view.players.iter().find(|e| e.player_id == guest).unwrap();
    assert_eq!(entry.name, "");

    seating.host.kick_player(id, &guest).await.unwrap();
    assert!(seating.host.fetch_session(id).await.unwrap().player(&guest).is_none());
}

#[tokio::test]
async fn start_racing_reaper_leaves_nothing_behind() {
    let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
    let mut table = Table::with_store(Arc::clone(&flaky), 10);
    let seating = table.seat(2).await.unwrap();
    let id = &seating.session_id;
    seating.host.set_location(id, "Airport").await.unwrap();

    // The session is deleted between start_game's read and its update,
    // so the update recreates a subtree holding only roles and status
    let session_path = StorePath::parse(&format!("games/{id}")).unwrap();
    flaky.delete_before_next_mutation(session_path.clone());
    assert_eq!(seating.host.start_game(id).await.unwrap().len(), 3);
    assert!(flaky.inner().read(&session_path).await.unwrap().is_some());

    let gone = MoleError::GameNotFound(id.clone());
    assert_eq!(seating.host.fetch_session(id).await.unwrap_err(), gone);
    assert_eq!(seating.host.new_round(id).await.unwrap_err(), gone);
    assert_eq!(seating.guests[0].join_game(id, "Again").await.unwrap_err(), gone);

    let mut watch = seating.guests[1].watch(id).unwrap();
    assert_eq!(watch.next().await.unwrap().unwrap(), WatchEvent::Gone);

    // Young by the clock, but not a session: the first sweep removes it
    let report = table.reaper().sweep().await.unwrap();
    assert_eq!(report.deleted, vec![id.clone()]);
    assert_eq!(report.remnants, 1);
    assert_eq!(flaky.inner().read(&session_path).await.unwrap(), None);
    assert_eq!(watch.next().await.unwrap().unwrap(), WatchEvent::Gone);
}

#[tokio::test]
async fn sweep_keeps_going_past_failed_deletes() {
    let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
    let mut table = Table::with_store(Arc::clone(&flaky), 11);
    let first = table.seat(1).await.unwrap();
    let second = table.seat(1).await.unwrap();
    table.clock().advance(6 * HOUR);

    flaky.set_fail_mutations(true);
    let report = table.reaper().sweep().await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.failed, 2);
    assert!(report.deleted.is_empty());

    flaky.set_fail_mutations(false);
    let report = table.reaper().sweep().await.unwrap();
    assert_eq!(report.failed, 0);
    let mut deleted = report.deleted;
    deleted.sort();
    let mut expected = vec![first.session_id, second.session_id];
    expected.sort();
    assert_eq!(deleted, expected);
}
