//! Unit tests for the VisibilityReconciler.
//!
//! Each test builds a small tab set in the in-memory TabManager, applies a
//! classification and checks both the host and the session bookkeeping.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tabsearch::managers::tab_manager::{HostCall, HostCallKind, TabManager, TabManagerTrait};
use tabsearch::managers::visibility_reconciler::{PassResult, VisibilityReconciler};
use tabsearch::services::badge::RecordingBadge;
use tabsearch::services::progress_reporter::ProgressReporter;
use tabsearch::types::search::Classification;
use tabsearch::types::session::SessionState;

const PERIOD: Duration = Duration::from_millis(10);

struct Fixture {
    host: Arc<TabManager>,
    badge: Arc<RecordingBadge>,
    reconciler: VisibilityReconciler<TabManager, RecordingBadge>,
    session: SessionState,
}

/// Six tabs in window 1; tab 1 is active.
fn setup() -> Fixture {
    let host = Arc::new(TabManager::new());
    for n in 1..=6 {
        host.open_tab(1, &format!("https://site{}.example", n), &format!("Site {}", n));
    }
    let badge = Arc::new(RecordingBadge::new());
    let reconciler = VisibilityReconciler::new(
        Arc::clone(&host),
        ProgressReporter::with_period(Arc::clone(&badge), PERIOD),
    );
    let mut session = SessionState::new();
    session.begin_search();
    Fixture {
        host,
        badge,
        reconciler,
        session,
    }
}

fn classification(hide: &[i64], show: &[i64]) -> Classification {
    Classification {
        matched: Vec::new(),
        to_hide: hide.iter().copied().collect(),
        to_show: show.iter().copied().collect(),
    }
}

#[tokio::test]
async fn test_pass_hides_and_shows() {
    let mut f = setup();
    f.host.set_hidden(5, true).unwrap();

    let result = f
        .reconciler
        .reconcile(&classification(&[2, 3], &[5]), &mut f.session)
        .await;

    assert_eq!(result, PassResult { hidden: 2, shown: 1 });
    assert_eq!(f.host.hidden_ids(), BTreeSet::from([2, 3]));
    assert_eq!(f.session.hidden_by_us, BTreeSet::from([2, 3]));
}

#[tokio::test]
async fn test_hidden_set_accumulates_and_drops_reshown() {
    let mut f = setup();
    f.reconciler
        .reconcile(&classification(&[2, 3, 4], &[]), &mut f.session)
        .await;
    f.reconciler
        .reconcile(&classification(&[5], &[3]), &mut f.session)
        .await;

    assert_eq!(f.session.hidden_by_us, BTreeSet::from([2, 4, 5]));
    assert_eq!(f.host.hidden_ids(), BTreeSet::from([2, 4, 5]));
}

#[tokio::test]
async fn test_one_batch_per_direction() {
    let mut f = setup();
    f.host.set_hidden(6, true).unwrap();
    f.reconciler
        .reconcile(&classification(&[2, 3, 4], &[6]), &mut f.session)
        .await;

    let calls = f.host.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.contains(&HostCall::Hide(vec![2, 3, 4])));
    assert!(calls.contains(&HostCall::Show(vec![6])));
}

#[tokio::test]
async fn test_rejected_hide_does_not_block_show() {
    let mut f = setup();
    f.host.set_hidden(6, true).unwrap();
    f.host.reject(HostCallKind::Hide);

    let result = f
        .reconciler
        .reconcile(&classification(&[2, 3], &[6]), &mut f.session)
        .await;

    assert_eq!(result, PassResult { hidden: 0, shown: 1 });
    assert!(f.host.hidden_ids().is_empty());
    assert!(f.session.hidden_by_us.is_empty());
}

#[tokio::test]
async fn test_rejected_show_keeps_tab_in_hidden_set() {
    let mut f = setup();
    f.reconciler
        .reconcile(&classification(&[2, 3], &[]), &mut f.session)
        .await;
    f.host.reject(HostCallKind::Show);
    f.reconciler
        .reconcile(&classification(&[4], &[2]), &mut f.session)
        .await;

    assert_eq!(f.session.hidden_by_us, BTreeSet::from([2, 3, 4]));
}

#[tokio::test]
async fn test_noop_pass_clears_badge_without_host_calls() {
    let mut f = setup();
    let result = f
        .reconciler
        .reconcile(&classification(&[], &[]), &mut f.session)
        .await;

    assert_eq!(result, PassResult::default());
    assert!(f.host.calls().is_empty());
    assert_eq!(f.badge.current(), "");
    assert!(!f.reconciler.progress().is_tracking());
}

#[tokio::test]
async fn test_badge_counts_down_to_empty() {
    let mut f = setup();
    f.reconciler
        .reconcile(&classification(&[2, 3, 4], &[]), &mut f.session)
        .await;

    assert_eq!(f.badge.history().first().map(String::as_str), Some("3"));
    tokio::time::sleep(PERIOD * 10).await;
    assert_eq!(f.badge.current(), "");
    assert!(!f.reconciler.progress().is_tracking());
}

#[tokio::test]
async fn test_rejected_batch_is_not_polled() {
    let mut f = setup();
    f.host.reject(HostCallKind::Hide);
    f.reconciler
        .reconcile(&classification(&[2], &[]), &mut f.session)
        .await;

    // Tab 2 never gets hidden, so nothing is left to wait for.
    assert!(!f.reconciler.progress().is_tracking());
    assert_eq!(f.badge.current(), "");
}

#[tokio::test]
async fn test_rejected_show_all_stops_polling() {
    let mut f = setup();
    f.reconciler
        .reconcile(&classification(&[2, 3], &[]), &mut f.session)
        .await;
    f.host.reject(HostCallKind::Show);

    assert_eq!(f.reconciler.end_session(&mut f.session).await, 0);
    assert!(!f.reconciler.progress().is_tracking());

    let published = f.badge.history().len();
    tokio::time::sleep(PERIOD * 10).await;
    assert_eq!(f.badge.history().len(), published);
    assert_eq!(f.host.hidden_ids(), BTreeSet::from([2, 3]));
}

#[tokio::test]
async fn test_show_all_hidden_unhides_foreign_hides_too() {
    let mut f = setup();
    f.reconciler
        .reconcile(&classification(&[2, 3], &[]), &mut f.session)
        .await;
    // Hidden by another extension, not this engine.
    f.host.set_hidden(6, true).unwrap();

    let shown = f.reconciler.show_all_hidden().await;
    assert_eq!(shown, 3);
    assert!(f.host.hidden_ids().is_empty());
}

#[tokio::test]
async fn test_show_all_with_nothing_hidden_issues_no_show() {
    let mut f = setup();
    let shown = f.reconciler.show_all_hidden().await;
    assert_eq!(shown, 0);
    assert!(f.host.calls().is_empty());
    assert_eq!(f.badge.current(), "");
}

#[tokio::test]
async fn test_end_session_leaves_nothing_hidden() {
    let mut f = setup();
    f.reconciler
        .reconcile(&classification(&[2, 3, 4], &[]), &mut f.session)
        .await;

    let shown = f.reconciler.end_session(&mut f.session).await;
    assert_eq!(shown, 3);
    assert!(f.session.hidden_by_us.is_empty());
    assert!(f.host.hidden_ids().is_empty());
}

#[tokio::test]
async fn test_failed_query_during_show_all_shows_nothing() {
    let mut f = setup();
    f.host.set_hidden(3, true).unwrap();
    f.host.reject(HostCallKind::Query);

    assert_eq!(f.reconciler.show_all_hidden().await, 0);
    f.host.accept(HostCallKind::Query);
    assert_eq!(f.host.hidden_ids(), BTreeSet::from([3]));
}
