//! End-to-end ordering scenarios against the in-memory store.

mod support;

use lms_backend::domain::sequencing::{SequenceError, SequenceList, ScopeKey};
use rstest::rstest;
use uuid::Uuid;

use support::{fresh_scope, item, listed, memory_sequencer, order, seed};

const LIST: SequenceList = SequenceList::CourseModules;

#[tokio::test]
async fn moving_last_item_to_second_shifts_the_middle_down() {
    let (sequencer, _) = memory_sequencer();
    let scope = fresh_scope(LIST);
    let ids = seed(&sequencer, scope, 4).await;

    let moved = sequencer
        .move_within_scope(item(LIST, ids[3]), 2)
        .await
        .expect("move succeeds");

    assert_eq!(moved.sequence.get(), 2);
    assert_eq!(order(&sequencer, scope).await, vec![ids[0], ids[3], ids[1], ids[2]]);
}

#[tokio::test]
async fn deactivating_closes_the_gap() {
    let (sequencer, _) = memory_sequencer();
    let scope = fresh_scope(LIST);
    let ids = seed(&sequencer, scope, 3).await;

    let hidden = sequencer
        .deactivate(item(LIST, ids[1]))
        .await
        .expect("deactivate succeeds");

    assert!(hidden.sequence.is_sentinel());
    assert!(!hidden.active);
    let items = listed(&sequencer, scope).await;
    assert_eq!(
        items.iter().map(|entry| (entry.id, entry.sequence.get())).collect::<Vec<_>>(),
        vec![(ids[0], 1), (ids[2], 2)]
    );
}

#[tokio::test]
async fn appending_to_an_empty_scope_starts_at_one() {
    let (sequencer, _) = memory_sequencer();
    let scope = fresh_scope(LIST);

    let appended = sequencer
        .append(scope, Uuid::new_v4())
        .await
        .expect("append succeeds");

    assert_eq!(appended.sequence.get(), 1);
    assert!(appended.active);
}

#[tokio::test]
async fn moving_across_scopes_keeps_both_dense() {
    let (sequencer, _) = memory_sequencer();
    let list = SequenceList::ModuleSubmodules;
    let (a, b) = (fresh_scope(list), fresh_scope(list));
    let a_ids = seed(&sequencer, a, 2).await;
    let b_ids = seed(&sequencer, b, 3).await;

    let moved = sequencer
        .move_across_scopes(item(list, a_ids[0]), b, Some(2))
        .await
        .expect("transfer succeeds");

    assert_eq!(moved.scope, b);
    assert_eq!(moved.sequence.get(), 2);
    assert_eq!(order(&sequencer, a).await, vec![a_ids[1]]);
    assert_eq!(
        order(&sequencer, b).await,
        vec![b_ids[0], a_ids[0], b_ids[1], b_ids[2]]
    );
}

#[tokio::test]
async fn position_below_one_clamps_in_place_but_appends_across_scopes() {
    let (sequencer, _) = memory_sequencer();
    let list = SequenceList::ModuleSubmodules;
    let (a, b) = (fresh_scope(list), fresh_scope(list));
    let a_ids = seed(&sequencer, a, 3).await;
    let b_ids = seed(&sequencer, b, 2).await;

    let stayed = sequencer
        .move_across_scopes(item(list, a_ids[2]), a, Some(-3))
        .await
        .expect("in-place transfer succeeds");
    let moved = sequencer
        .move_across_scopes(item(list, a_ids[0]), b, Some(-3))
        .await
        .expect("transfer succeeds");

    assert_eq!(stayed.sequence.get(), 1);
    assert_eq!(moved.sequence.get(), 3);
    assert_eq!(order(&sequencer, a).await, vec![a_ids[2], a_ids[1]]);
    assert_eq!(order(&sequencer, b).await, vec![b_ids[0], b_ids[1], a_ids[0]]);
}

#[rstest]
#[case::negative(-5, 1)]
#[case::zero(0, 1)]
#[case::past_the_end(9, 4)]
#[case::far_past_i32(i64::MAX, 4)]
#[tokio::test]
async fn requested_positions_are_clamped(#[case] requested: i64, #[case] landed: i32) {
    let (sequencer, _) = memory_sequencer();
    let scope = fresh_scope(LIST);
    let ids = seed(&sequencer, scope, 4).await;

    let moved = sequencer
        .move_within_scope(item(LIST, ids[2]), requested)
        .await
        .expect("move succeeds");

    assert_eq!(moved.sequence.get(), landed);
    listed(&sequencer, scope).await;
}

#[tokio::test]
async fn clamped_moves_match_their_boundary_moves() {
    let (low, _) = memory_sequencer();
    let (high, _) = memory_sequencer();
    let (first, _) = memory_sequencer();
    let (last, _) = memory_sequencer();
    let scope = ScopeKey::new(SequenceList::DashboardCarousel, None).expect("global scope");
    let mut orders = Vec::new();

    for (sequencer, requested) in [(&low, 0), (&first, 1), (&high, 9), (&last, 4)] {
        let ids = seed(sequencer, scope, 4).await;
        sequencer
            .move_within_scope(item(SequenceList::DashboardCarousel, ids[2]), requested)
            .await
            .expect("move succeeds");
        let positions: Vec<usize> = order(sequencer, scope)
            .await
            .iter()
            .map(|id| ids.iter().position(|seeded| seeded == id).expect("seeded id"))
            .collect();
        orders.push(positions);
    }

    assert_eq!(orders[0], orders[1]);
    assert_eq!(orders[2], orders[3]);
}

#[tokio::test]
async fn moving_to_the_current_position_changes_nothing() {
    let (sequencer, store) = memory_sequencer();
    let scope = fresh_scope(LIST);
    let ids = seed(&sequencer, scope, 3).await;
    let before = store.snapshot().await;

    sequencer
        .move_within_scope(item(LIST, ids[1]), 2)
        .await
        .expect("no-op move succeeds");

    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn reactivation_appends_after_current_items() {
    let (sequencer, _) = memory_sequencer();
    let scope = fresh_scope(LIST);
    let ids = seed(&sequencer, scope, 3).await;

    sequencer
        .deactivate(item(LIST, ids[0]))
        .await
        .expect("deactivate succeeds");
    let extra = seed(&sequencer, scope, 1).await;
    let restored = sequencer
        .reactivate(item(LIST, ids[0]))
        .await
        .expect("reactivate succeeds");

    assert_eq!(restored.sequence.get(), 4);
    assert!(restored.active);
    assert_eq!(
        order(&sequencer, scope).await,
        vec![ids[1], ids[2], extra[0], ids[0]]
    );
}

#[tokio::test]
async fn removal_closes_the_gap_and_forgets_the_item() {
    let (sequencer, _) = memory_sequencer();
    let scope = fresh_scope(LIST);
    let ids = seed(&sequencer, scope, 3).await;

    sequencer
        .remove(item(LIST, ids[0]))
        .await
        .expect("remove succeeds");

    assert_eq!(order(&sequencer, scope).await, vec![ids[1], ids[2]]);
    let missing = sequencer.find_item(item(LIST, ids[0])).await;
    assert!(matches!(missing, Err(SequenceError::NotFound { .. })));
}

#[tokio::test]
async fn removing_a_hidden_item_leaves_positions_alone() {
    let (sequencer, _) = memory_sequencer();
    let scope = fresh_scope(LIST);
    let ids = seed(&sequencer, scope, 3).await;
    sequencer
        .deactivate(item(LIST, ids[2]))
        .await
        .expect("deactivate succeeds");

    sequencer
        .remove(item(LIST, ids[2]))
        .await
        .expect("remove succeeds");

    assert_eq!(order(&sequencer, scope).await, vec![ids[0], ids[1]]);
}

#[tokio::test]
async fn mixed_operations_keep_every_scope_dense() {
    let (sequencer, _) = memory_sequencer();
    let list = SequenceList::SubmoduleVideos;
    let (a, b) = (fresh_scope(list), fresh_scope(list));
    let mut a_ids = seed(&sequencer, a, 5).await;
    seed(&sequencer, b, 2).await;

    let steps: Vec<Box<dyn Fn(&[Uuid]) -> (Uuid, i64)>> = vec![
        Box::new(|ids| (ids[4], 1)),
        Box::new(|ids| (ids[0], 3)),
        Box::new(|ids| (ids[2], -1)),
        Box::new(|ids| (ids[1], 100)),
    ];
    for step in steps {
        let (id, requested) = step(&a_ids);
        sequencer
            .move_within_scope(item(list, id), requested)
            .await
            .expect("move succeeds");
        a_ids = order(&sequencer, a).await;
    }

    sequencer
        .deactivate(item(list, a_ids[1]))
        .await
        .expect("deactivate succeeds");
    listed(&sequencer, a).await;
    sequencer
        .move_across_scopes(item(list, a_ids[3]), b, None)
        .await
        .expect("transfer succeeds");
    sequencer
        .reactivate(item(list, a_ids[1]))
        .await
        .expect("reactivate succeeds");
    sequencer
        .remove(item(list, a_ids[0]))
        .await
        .expect("remove succeeds");

    assert_eq!(listed(&sequencer, a).await.len(), 3);
    assert_eq!(listed(&sequencer, b).await.len(), 3);
}

#[tokio::test]
async fn scope_shape_is_enforced() {
    let (sequencer, _) = memory_sequencer();
    let carousel = ScopeKey::new(SequenceList::DashboardCarousel, None).expect("global scope");
    let ids = seed(&sequencer, carousel, 2).await;
    let elsewhere = fresh_scope(SequenceList::CourseModules);

    let wrong_list = sequencer
        .move_across_scopes(item(SequenceList::DashboardCarousel, ids[0]), elsewhere, None)
        .await;

    assert!(matches!(wrong_list, Err(SequenceError::InvalidRequest { .. })));
    assert_eq!(order(&sequencer, carousel).await, ids);
}
