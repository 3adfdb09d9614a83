mod common;

use std::time::Duration;

use pixgrid_engine::{CellPos, CommitErrorKind, CommitOutcome, EngineError, EngineEvent, PendingCell};
use pretty_assertions::assert_eq;

use common::{setup, signed_in};

const A: CellPos = CellPos { x: 1, y: 1 };
const B: CellPos = CellPos { x: 2, y: 2 };

#[tokio::test]
async fn failed_items_go_back_into_the_overlay() {
    let (store, engine, account) = signed_in(10, 10, 10).await;
    engine.set_pixel(A, 3).unwrap();
    engine.set_pixel(B, 4).unwrap();
    store.fail_cell(B, CommitErrorKind::InsufficientAllowance { allowance: 5 });
    assert_eq!(engine.balance_after_commit(), Some(8));

    let report = engine.commit().await.unwrap();

    assert_eq!(report.submitted, 2);
    assert_eq!(report.outcome.saved(), 1);
    assert_eq!(report.outcome.failed(), 1);
    assert_eq!(report.restore.restored, vec![B]);
    assert_eq!(engine.pending_cells(), vec![PendingCell::new(B, 4)]);

    // The resync after the commit already shows the saved cell.
    assert!(report.resync.as_ref().unwrap().is_complete());
    assert_eq!(store.cell(A), Some(3));
    assert_eq!(engine.committed_color(A), Some(3));
    assert_eq!(engine.committed_color(B), Some(0));
    assert_eq!(engine.visible_color(B), Some(4));
    assert_eq!(store.credits(&account), 9);
    assert_eq!(engine.credits(), 9);
}

#[tokio::test]
async fn transport_failure_restores_the_whole_batch() {
    let (store, engine, _account) = signed_in(10, 10, 10).await;
    engine.set_pixel(A, 3).unwrap();
    engine.set_pixel(B, 4).unwrap();
    store.fail_next_commit("connection reset");

    let report = engine.commit().await.unwrap();

    match &report.outcome {
        CommitOutcome::TransportFailed(EngineError::CommitTransport { message, unsaved }) => {
            assert_eq!(message, "transport error: connection reset");
            assert_eq!(*unsaved, 2);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(engine.pending_cells(), vec![PendingCell::new(A, 3), PendingCell::new(B, 4)]);
    assert_eq!(store.cell(A), Some(0));
    // The resync runs regardless.
    assert_eq!(engine.grid_version(), 2);
    assert_eq!(engine.credits(), 10);
}

#[tokio::test]
async fn edits_made_during_a_commit_win_over_restores() {
    let (store, engine, _account) = signed_in(10, 10, 10).await;
    engine.set_pixel(A, 3).unwrap();
    store.fail_cell(A, CommitErrorKind::Locked);
    store.set_commit_delay(Some(Duration::from_millis(50)));

    let (report, ()) = tokio::join!(engine.commit(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        // Overlay was cleared optimistically, drawing goes on.
        assert_eq!(engine.pending_count(), 0);
        engine.set_pixel(A, 9).unwrap();
        engine.set_pixel(B, 6).unwrap();
    });
    let report = report.unwrap();

    assert_eq!(report.outcome.failed(), 1);
    assert_eq!(report.restore.superseded, vec![A]);
    assert!(report.restore.restored.is_empty());
    assert_eq!(engine.pending_cells(), vec![PendingCell::new(A, 9), PendingCell::new(B, 6)]);
}

#[tokio::test]
async fn commit_is_refused_without_enough_credits() {
    let (store, engine, _account) = signed_in(10, 10, 1).await;
    engine.set_pixel(A, 3).unwrap();
    engine.set_pixel(B, 4).unwrap();

    let err = engine.commit().await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientCredits {
            needed: 2,
            available: 1,
            deficit: 1
        }
    );
    assert!(err.is_advisory());
    assert_eq!(engine.balance_after_commit(), None);
    assert_eq!(engine.check_commit(), Err(err));
    assert_eq!(engine.pending_count(), 2);
    assert_eq!(store.commit_calls(), 0);
}

#[tokio::test]
async fn commit_requires_an_account() {
    let (store, engine) = setup(10, 10);
    engine.resync().await.unwrap();
    engine.set_pixel(A, 3).unwrap();

    assert_eq!(engine.commit().await.unwrap_err(), EngineError::NotSignedIn);
    assert_eq!(engine.pending_count(), 1);
    assert_eq!(store.commit_calls(), 0);
}

#[tokio::test]
async fn empty_overlay_is_not_committed() {
    let (store, engine, _account) = signed_in(10, 10, 10).await;
    assert_eq!(engine.commit().await.unwrap_err(), EngineError::NothingToCommit);
    assert_eq!(store.commit_calls(), 0);
}

#[tokio::test]
async fn commits_queue_behind_each_other() {
    let (store, engine, _account) = signed_in(10, 10, 10).await;
    engine.set_pixel(A, 3).unwrap();
    store.set_commit_delay(Some(Duration::from_millis(20)));

    let (first, second) = tokio::join!(engine.commit(), engine.commit());

    assert_eq!(first.unwrap().outcome.saved(), 1);
    // The second commit only ran after the first had cleared the overlay.
    assert_eq!(second.unwrap_err(), EngineError::NothingToCommit);
    assert_eq!(store.commit_calls(), 1);
}

#[tokio::test]
async fn unanswered_items_count_as_failed() {
    let (store, engine, _account) = signed_in(10, 10, 10).await;
    engine.set_pixel(A, 3).unwrap();
    engine.set_pixel(B, 4).unwrap();
    store.drop_results_of_next_commit(1);

    let report = engine.commit().await.unwrap();
    match &report.outcome {
        CommitOutcome::Completed { saved, failures } => {
            assert_eq!(*saved, 1);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].pos, B);
            assert!(matches!(failures[0].kind, CommitErrorKind::GenericError { .. }));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(engine.pending_cells(), vec![PendingCell::new(B, 4)]);
}

#[tokio::test]
async fn commit_reports_through_events() {
    let (store, engine, _account) = signed_in(10, 10, 10).await;
    engine.set_pixel(A, 3).unwrap();
    engine.set_pixel(B, 4).unwrap();
    store.fail_cell(B, CommitErrorKind::Unproxied);

    let mut events = engine.subscribe();
    engine.commit().await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(
        received,
        vec![
            EngineEvent::OverlayCleared,
            EngineEvent::CellChanged(B),
            EngineEvent::CommitFinished { saved: 1, failed: 1 },
            EngineEvent::CreditsUpdated { credits: 9 },
            EngineEvent::GridRefreshed { version: 2 },
        ]
    );
}

#[tokio::test]
async fn dropped_commit_still_completes() {
    let (store, engine, _account) = signed_in(10, 10, 10).await;
    engine.set_pixel(A, 3).unwrap();
    engine.set_pixel(B, 4).unwrap();
    store.fail_cell(B, CommitErrorKind::Locked);
    store.set_commit_delay(Some(Duration::from_millis(200)));
    let mut events = engine.subscribe();

    let dropped = tokio::time::timeout(Duration::from_millis(20), engine.commit()).await;
    assert!(dropped.is_err());

    // The abandoned commit still ends with its resync.
    while !matches!(events.recv().await.unwrap(), EngineEvent::GridRefreshed { .. }) {}
    assert_eq!(store.commit_calls(), 1);
    assert_eq!(store.cell(A), Some(3));
    assert_eq!(engine.committed_color(A), Some(3));
    assert_eq!(engine.pending_cells(), vec![PendingCell::new(B, 4)]);
    assert_eq!(engine.grid_version(), 2);
}

#[tokio::test]
async fn restored_edit_cannot_be_redone_away() {
    let (store, engine, _account) = signed_in(10, 10, 10).await;
    engine.set_pixel(A, 3).unwrap();
    store.fail_cell(A, CommitErrorKind::Locked);
    store.set_commit_delay(Some(Duration::from_millis(50)));

    let (report, ()) = tokio::join!(engine.commit(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.set_pixel(A, 9).unwrap();
        engine.undo().unwrap();
    });
    assert_eq!(report.unwrap().restore.restored, vec![A]);
    assert_eq!(engine.pending_color(A), Some(3));

    assert!(!engine.can_redo());
    assert_eq!(engine.redo().unwrap(), None);
    assert_eq!(engine.undo().unwrap(), None);
    assert_eq!(engine.pending_color(A), Some(3));
}
