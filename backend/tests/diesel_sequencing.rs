//! Sequencing against PostgreSQL through `DieselSequenceStore`.
//!
//! Runs the ordering scenarios and the concurrency guarantees on a real
//! database: advisory scope locks, row locks, range shifts and the
//! statement-level uniqueness constraint. Each test uses its own database on
//! the shared embedded cluster.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use lms_backend::domain::ports::SequenceStore;
use lms_backend::domain::sequencing::{
    ItemRef, ScopeKey, Sequence, SequenceError, SequenceList, SequenceWrite, SequencedItem,
    Sequencer,
};
use lms_backend::outbound::persistence::{DbPool, DieselSequenceStore, PoolConfig};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use uuid::Uuid;

mod support;

use support::embedded_postgres::{
    handle_cluster_setup_failure, provision_template_database, shared_cluster,
};
use support::{fresh_scope, item, listed, order, seed};

const LIST: SequenceList = SequenceList::SubmoduleVideos;

struct PgContext {
    runtime: Runtime,
    store: DieselSequenceStore,
    sequencer: Sequencer<DieselSequenceStore>,
    _database: TemporaryDatabase,
}

fn setup_context() -> Result<PgContext, String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| err.to_string())?;
    let cluster = shared_cluster()?;
    let database = provision_template_database(cluster, &runtime)?;

    let config = PoolConfig::new(database.url())
        .with_max_size(8)
        .with_min_idle(Some(1))
        .with_connection_timeout(Duration::from_secs(10));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;
    let store = DieselSequenceStore::new(pool).with_lock_timeout(Duration::from_secs(10));
    let sequencer = Sequencer::new(Arc::new(store.clone()));

    Ok(PgContext {
        runtime,
        store,
        sequencer,
        _database: database,
    })
}

#[fixture]
fn pg() -> Option<PgContext> {
    match setup_context() {
        Ok(context) => Some(context),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn moving_last_item_to_second_shifts_the_middle_down(pg: Option<PgContext>) {
    let Some(context) = pg else {
        eprintln!("SKIP-TEST-CLUSTER: moving_last_item_to_second_shifts_the_middle_down skipped");
        return;
    };
    let sequencer = &context.sequencer;
    context.runtime.block_on(async {
        let scope = fresh_scope(LIST);
        let ids = seed(sequencer, scope, 4).await;

        let moved = sequencer
            .move_within_scope(item(LIST, ids[3]), 2)
            .await
            .expect("move succeeds");

        assert_eq!(moved.sequence.get(), 2);
        assert_eq!(order(sequencer, scope).await, vec![ids[0], ids[3], ids[1], ids[2]]);
    });
}

#[rstest]
#[case::down(0, 3)]
#[case::up(3, 0)]
#[case::clamped_low(4, -7)]
#[case::clamped_high(1, i64::MAX)]
fn single_moves_keep_the_scope_dense(
    pg: Option<PgContext>,
    #[case] from: usize,
    #[case] requested: i64,
) {
    let Some(context) = pg else {
        eprintln!("SKIP-TEST-CLUSTER: single_moves_keep_the_scope_dense skipped");
        return;
    };
    let sequencer = &context.sequencer;
    context.runtime.block_on(async {
        let scope = fresh_scope(LIST);
        let ids = seed(sequencer, scope, 5).await;

        sequencer
            .move_within_scope(item(LIST, ids[from]), requested)
            .await
            .expect("move succeeds");

        assert_eq!(listed(sequencer, scope).await.len(), 5);
    });
}

#[rstest]
fn deactivate_reactivate_and_remove_close_their_gaps(pg: Option<PgContext>) {
    let Some(context) = pg else {
        eprintln!("SKIP-TEST-CLUSTER: deactivate_reactivate_and_remove_close_their_gaps skipped");
        return;
    };
    let sequencer = &context.sequencer;
    context.runtime.block_on(async {
        let scope = fresh_scope(LIST);
        let ids = seed(sequencer, scope, 4).await;

        let hidden = sequencer
            .deactivate(item(LIST, ids[1]))
            .await
            .expect("deactivate succeeds");
        assert!(hidden.sequence.is_sentinel());
        assert_eq!(order(sequencer, scope).await, vec![ids[0], ids[2], ids[3]]);

        sequencer
            .remove(item(LIST, ids[0]))
            .await
            .expect("remove succeeds");
        let restored = sequencer
            .reactivate(item(LIST, ids[1]))
            .await
            .expect("reactivate succeeds");

        assert_eq!(restored.sequence.get(), 3);
        assert_eq!(order(sequencer, scope).await, vec![ids[2], ids[3], ids[1]]);
    });
}

#[rstest]
fn moving_across_scopes_keeps_both_dense(pg: Option<PgContext>) {
    let Some(context) = pg else {
        eprintln!("SKIP-TEST-CLUSTER: moving_across_scopes_keeps_both_dense skipped");
        return;
    };
    let sequencer = &context.sequencer;
    context.runtime.block_on(async {
        let list = SequenceList::ModuleSubmodules;
        let (a, b) = (fresh_scope(list), fresh_scope(list));
        let a_ids = seed(sequencer, a, 2).await;
        let b_ids = seed(sequencer, b, 3).await;

        let moved = sequencer
            .move_across_scopes(item(list, a_ids[0]), b, Some(2))
            .await
            .expect("transfer succeeds");

        assert_eq!(moved.scope, b);
        assert_eq!(order(sequencer, a).await, vec![a_ids[1]]);
        assert_eq!(
            order(sequencer, b).await,
            vec![b_ids[0], a_ids[0], b_ids[1], b_ids[2]]
        );
    });
}

#[rstest]
fn concurrent_moves_in_one_scope_are_serialized(pg: Option<PgContext>) {
    let Some(context) = pg else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_moves_in_one_scope_are_serialized skipped");
        return;
    };
    let sequencer = &context.sequencer;
    context.runtime.block_on(async {
        let scope = fresh_scope(LIST);
        let ids = seed(sequencer, scope, 8).await;

        for round in 0..20_i64 {
            let first = sequencer.clone();
            let second = sequencer.clone();
            let (a, b) = (ids[0], ids[7]);
            let left = tokio::spawn(async move {
                first.move_within_scope(item(LIST, a), 8 - round % 8).await
            });
            let right = tokio::spawn(async move {
                second.move_within_scope(item(LIST, b), 1 + round % 8).await
            });

            left.await.expect("task joins").expect("move is not aborted");
            right.await.expect("task joins").expect("move is not aborted");
            assert_eq!(listed(sequencer, scope).await.len(), 8);
        }
    });
}

#[rstest]
fn concurrent_transfers_between_two_scopes_are_serialized(pg: Option<PgContext>) {
    let Some(context) = pg else {
        eprintln!(
            "SKIP-TEST-CLUSTER: concurrent_transfers_between_two_scopes_are_serialized skipped"
        );
        return;
    };
    let sequencer = &context.sequencer;
    context.runtime.block_on(async {
        let list = SequenceList::ModuleSubmodules;
        let (a, b) = (fresh_scope(list), fresh_scope(list));
        let a_ids = seed(sequencer, a, 4).await;
        let b_ids = seed(sequencer, b, 4).await;

        let transfers = a_ids
            .iter()
            .map(|id| (*id, b))
            .chain(b_ids.iter().map(|id| (*id, a)))
            .map(|(id, target)| {
                let sequencer = sequencer.clone();
                tokio::spawn(async move {
                    sequencer
                        .move_across_scopes(item(list, id), target, Some(1))
                        .await
                })
            });
        for outcome in join_all(transfers).await {
            outcome.expect("task joins").expect("transfer is not aborted");
        }

        let total = listed(sequencer, a).await.len() + listed(sequencer, b).await.len();
        assert_eq!(total, 8);
    });
}

#[rstest]
fn concurrent_appends_get_distinct_positions(pg: Option<PgContext>) {
    let Some(context) = pg else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_appends_get_distinct_positions skipped");
        return;
    };
    let sequencer = &context.sequencer;
    context.runtime.block_on(async {
        let scope = fresh_scope(LIST);
        let appends = (0..12).map(|_| {
            let sequencer = sequencer.clone();
            tokio::spawn(async move { sequencer.append(scope, Uuid::new_v4()).await })
        });
        for outcome in join_all(appends).await {
            outcome.expect("task joins").expect("append succeeds");
        }

        assert_eq!(listed(sequencer, scope).await.len(), 12);
    });
}

#[rstest]
fn racing_appends_of_one_item_never_report_a_storage_failure(pg: Option<PgContext>) {
    let Some(context) = pg else {
        eprintln!(
            "SKIP-TEST-CLUSTER: racing_appends_of_one_item_never_report_a_storage_failure skipped"
        );
        return;
    };
    let sequencer = &context.sequencer;
    context.runtime.block_on(async {
        let id = Uuid::new_v4();
        let scopes = [fresh_scope(LIST), fresh_scope(LIST)];
        let appends = scopes.map(|scope| {
            let sequencer = sequencer.clone();
            tokio::spawn(async move { sequencer.append(scope, id).await })
        });

        let outcomes: Vec<Result<SequencedItem, SequenceError>> = join_all(appends)
            .await
            .into_iter()
            .map(|joined| joined.expect("task joins"))
            .collect();

        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        assert!(outcomes.iter().all(|outcome| matches!(
            outcome,
            Ok(_) | Err(SequenceError::Conflict { .. } | SequenceError::InvalidRequest { .. })
        )));
        let stored = sequencer
            .find_item(item(LIST, id))
            .await
            .expect("the winner is stored");
        assert!(scopes.contains(&stored.scope));
    });
}

#[rstest]
fn plans_that_collide_roll_back_every_write(pg: Option<PgContext>) {
    let Some(context) = pg else {
        eprintln!("SKIP-TEST-CLUSTER: plans_that_collide_roll_back_every_write skipped");
        return;
    };
    let sequencer = &context.sequencer;
    let store = context.store.clone();
    context.runtime.block_on(async {
        let scope = fresh_scope(LIST);
        let ids = seed(sequencer, scope, 3).await;
        let (first, last) = (item(LIST, ids[0]), item(LIST, ids[2]));

        let outcome: Result<(), SequenceError> = store
            .with_transaction(move |tx| {
                Box::pin(async move {
                    tx.lock_scope(&scope).await?;
                    tx.apply(&SequenceWrite::Assign {
                        item: first,
                        scope,
                        sequence: Sequence::SENTINEL,
                        active: true,
                    })
                    .await?;
                    tx.apply(&clash(last, scope)).await?;
                    Ok::<_, SequenceError>(())
                })
            })
            .await;

        assert!(matches!(outcome, Err(SequenceError::StorageFailure { .. })));
        assert_eq!(order(sequencer, scope).await, ids);
    });
}

/// Put `item` on position 2, which another item of `scope` already holds.
fn clash(item: ItemRef, scope: ScopeKey) -> SequenceWrite {
    SequenceWrite::Assign {
        item,
        scope,
        sequence: Sequence::position(2).expect("position"),
        active: true,
    }
}

#[rstest]
fn contended_scope_times_out_as_a_retryable_conflict(pg: Option<PgContext>) {
    let Some(context) = pg else {
        eprintln!("SKIP-TEST-CLUSTER: contended_scope_times_out_as_a_retryable_conflict skipped");
        return;
    };
    let holder = context.store.clone();
    let impatient = Sequencer::new(Arc::new(
        context
            .store
            .clone()
            .with_lock_timeout(Duration::from_millis(100)),
    ));
    let sequencer = &context.sequencer;
    context.runtime.block_on(async {
        let (busy, idle) = (fresh_scope(LIST), fresh_scope(LIST));
        let (locked_tx, locked_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let held = tokio::spawn(async move {
            holder
                .with_transaction(move |tx| {
                    Box::pin(async move {
                        tx.lock_scope(&busy).await?;
                        locked_tx.send(()).ok();
                        release_rx.await.ok();
                        Ok::<_, SequenceError>(())
                    })
                })
                .await
        });
        locked_rx.await.expect("holder acquired the lock");

        let blocked = impatient.append(busy, Uuid::new_v4()).await;
        assert!(matches!(&blocked, Err(error) if error.is_retryable()));
        let free = impatient
            .append(idle, Uuid::new_v4())
            .await
            .expect("other scopes are not blocked");
        assert_eq!(free.sequence, Sequence::FIRST);

        release_tx.send(()).ok();
        held.await.expect("task joins").expect("holder commits");
        assert!(listed(sequencer, busy).await.is_empty());
    });
}
