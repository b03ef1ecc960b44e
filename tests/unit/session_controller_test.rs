//! Unit tests for the SessionController.
//!
//! Drives whole sessions (search, refine, close) against the in-memory tab
//! host, tree model, option store and badge, then checks what the host and
//! the tree extension ended up with.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tabsearch::managers::session_controller::SessionController;
use tabsearch::managers::tab_manager::{HostCall, HostCallKind, TabManager, TabManagerTrait};
use tabsearch::managers::tree_model::TreeModel;
use tabsearch::services::badge::RecordingBadge;
use tabsearch::services::option_store::MemoryOptionStore;
use tabsearch::services::tree_view::NoopTreeView;
use tabsearch::types::events::{AudibleOutcome, EventOutcome, InboundEvent, SearchOutcome};
use tabsearch::types::options::{
    DISABLE_EMPTY_TAB, SELECT_MATCHING_TABS, TST_AUTO_EXPAND, TST_SUPPORT,
};
use tabsearch::types::search::SearchCriteria;
use tabsearch::types::session::SessionPhase;

type Controller = SessionController<TabManager, TreeModel, MemoryOptionStore, RecordingBadge>;

struct Fixture {
    host: Arc<TabManager>,
    tree: Arc<TreeModel>,
    badge: Arc<RecordingBadge>,
    controller: Controller,
}

fn host_with_tabs() -> TabManager {
    let host = TabManager::new();
    host.open_tab(1, "https://mail.example.com", "Inbox");
    host.open_tab(1, "https://github.com/rust-lang/rust", "rust-lang/rust");
    host.open_tab(1, "https://github.com/rust-lang/rust/issues", "Issues · rust-lang/rust");
    host.open_tab(1, "https://news.ycombinator.com", "Hacker News");
    host.open_tab(1, "https://doc.rust-lang.org/book", "The Rust Book");
    host.open_tab(1, "https://weather.example.com", "Weather");
    host.open_tab(2, "https://play.rust-lang.org", "Rust Playground");
    host.open_tab(2, "https://radio.example.org", "Music");
    host
}

fn options(flags: &[(&str, bool)]) -> MemoryOptionStore {
    let items: Map<String, Value> = flags
        .iter()
        .map(|(key, value)| (key.to_string(), Value::Bool(*value)))
        .collect();
    MemoryOptionStore::with_items(items)
}

/// Window 1: tabs 1-6 (1 active). Window 2: tabs 7-8 (7 active).
fn setup(flags: &[(&str, bool)]) -> Fixture {
    let host = Arc::new(host_with_tabs());
    let tree = Arc::new(TreeModel::new());
    let badge = Arc::new(RecordingBadge::new());
    let controller = SessionController::new(
        Arc::clone(&host),
        Arc::clone(&tree),
        Arc::new(options(flags)),
        Arc::clone(&badge),
    )
    .with_poll_period(Duration::from_millis(10));
    Fixture {
        host,
        tree,
        badge,
        controller,
    }
}

fn titles(term: &str) -> SearchCriteria {
    SearchCriteria::new(term, true, false, false)
}

async fn search(f: &mut Fixture, criteria: SearchCriteria) -> SearchOutcome {
    match f.controller.search(&criteria).await {
        EventOutcome::Search(outcome) => outcome,
        other => panic!("expected a search outcome, got {:?}", other),
    }
}

// ─── Searching ───

#[tokio::test]
async fn test_search_hides_non_matching_tabs() {
    let mut f = setup(&[]);
    let outcome = search(&mut f, titles("rust")).await;

    assert_eq!(outcome.matched, 4);
    assert_eq!(outcome.hidden, 3);
    assert_eq!(f.host.hidden_ids(), BTreeSet::from([4, 6, 8]));
    assert_eq!(f.controller.session().hidden_by_us, BTreeSet::from([4, 6, 8]));
    assert_eq!(f.controller.session().last_matched, vec![2, 3, 5, 7]);
    assert_eq!(f.controller.phase(), SessionPhase::Searching);
    assert!(f.controller.session().session_id.is_some());
}

#[tokio::test]
async fn test_refining_and_widening_the_term() {
    let mut f = setup(&[]);
    search(&mut f, titles("rust")).await;

    let narrower = search(&mut f, titles("rust-lang")).await;
    assert_eq!(narrower.hidden, 1);
    assert_eq!(f.host.hidden_ids(), BTreeSet::from([4, 5, 6, 8]));

    let wider = search(&mut f, titles("rust")).await;
    assert_eq!(wider.shown, 1);
    assert_eq!(f.host.hidden_ids(), BTreeSet::from([4, 6, 8]));
    assert_eq!(f.controller.session().hidden_by_us, BTreeSet::from([4, 6, 8]));
    assert_eq!(f.controller.phase(), SessionPhase::Searching);
}

#[tokio::test]
async fn test_session_id_is_kept_across_keystrokes() {
    let mut f = setup(&[]);
    search(&mut f, titles("r")).await;
    let first = f.controller.session().session_id;
    search(&mut f, titles("ru")).await;
    assert_eq!(f.controller.session().session_id, first);
}

#[tokio::test]
async fn test_empty_term_shows_everything() {
    let mut f = setup(&[]);
    search(&mut f, titles("rust")).await;
    f.host.set_hidden(1, true).unwrap();

    let outcome = search(&mut f, titles("")).await;
    assert!(outcome.show_all);
    assert_eq!(outcome.shown, 4);
    assert!(f.host.hidden_ids().is_empty());
    assert!(f.controller.session().hidden_by_us.is_empty());
    assert_eq!(f.controller.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn test_short_content_only_term_shows_everything() {
    let mut f = setup(&[]);
    search(&mut f, titles("rust")).await;

    let outcome = search(&mut f, SearchCriteria::new("ru", false, false, true)).await;
    assert!(outcome.show_all);
    assert!(f.host.hidden_ids().is_empty());
    assert_eq!(f.host.find_in_page_count(), 0);
}

#[tokio::test]
async fn test_request_without_criteria_is_ignored() {
    let mut f = setup(&[]);
    let outcome = f.controller.search(&SearchCriteria::new("rust", false, false, false)).await;

    assert_eq!(outcome, EventOutcome::Ignored);
    assert!(f.host.calls().is_empty());
    assert_eq!(f.controller.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn test_rejected_hide_leaves_nothing_recorded() {
    let mut f = setup(&[]);
    f.host.reject(HostCallKind::Hide);

    let outcome = search(&mut f, titles("rust")).await;
    assert_eq!(outcome.hidden, 0);
    assert!(f.controller.session().hidden_by_us.is_empty());
    assert!(f.host.hidden_ids().is_empty());
    assert!(!f.controller.progress().is_tracking());
    assert_eq!(f.badge.current(), "");
}

#[tokio::test]
async fn test_failed_query_yields_empty_outcome() {
    let mut f = setup(&[]);
    f.host.reject(HostCallKind::Query);
    let outcome = search(&mut f, titles("rust")).await;
    assert_eq!(outcome, SearchOutcome::default());
    assert_eq!(f.controller.phase(), SessionPhase::Idle);
    assert!(f.controller.session().session_id.is_none());
}

#[tokio::test]
async fn test_badge_settles_after_search() {
    let mut f = setup(&[]);
    search(&mut f, titles("rust")).await;
    assert_eq!(f.badge.history().first().map(String::as_str), Some("3"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.badge.current(), "");
}

// ─── Closing ───

#[tokio::test]
async fn test_popup_closed_unhides_everything_and_resets() {
    let mut f = setup(&[]);
    search(&mut f, titles("rust")).await;
    // Hidden by someone else; session end shows it too.
    f.host.set_hidden(1, true).unwrap();

    let outcome = f.controller.popup_closed(Some(1)).await;
    assert_eq!(outcome.shown, 4);
    assert!(outcome.selected.is_empty());
    assert!(f.host.hidden_ids().is_empty());

    let session = f.controller.session();
    assert_eq!(session.phase, SessionPhase::Idle);
    assert!(session.hidden_by_us.is_empty());
    assert!(session.last_matched.is_empty());
    assert!(session.session_id.is_none());
}

#[tokio::test]
async fn test_rejected_unhide_at_close_stops_progress() {
    let mut f = setup(&[]);
    search(&mut f, titles("rust")).await;
    f.host.reject(HostCallKind::Show);

    let outcome = f.controller.popup_closed(Some(1)).await;
    assert_eq!(outcome.shown, 0);
    assert_eq!(f.controller.phase(), SessionPhase::Idle);
    assert!(!f.controller.progress().is_tracking());

    let published = f.badge.history().len();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(f.badge.history().len(), published);
    assert_eq!(f.badge.current(), "");
}

#[tokio::test]
async fn test_popup_closed_without_search_is_harmless() {
    let mut f = setup(&[]);
    let outcome = f.controller.popup_closed(None).await;
    assert_eq!(outcome.shown, 0);
    assert_eq!(f.controller.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn test_select_matching_tabs_activates_first_match() {
    let mut f = setup(&[(SELECT_MATCHING_TABS, true)]);
    search(&mut f, SearchCriteria::new("rust-lang", false, true, false)).await;

    let outcome = f.controller.popup_closed(Some(1)).await;
    assert_eq!(outcome.selected, vec![2, 3, 5]);
    assert_eq!(f.host.active_tab(1).map(|t| t.id), Some(2));
    assert_eq!(f.host.highlighted_ids(), BTreeSet::from([2, 3, 5, 7]));
    assert!(f.host.calls().contains(&HostCall::Activate(2)));
}

#[tokio::test]
async fn test_select_matching_tabs_keeps_active_match() {
    let mut f = setup(&[(SELECT_MATCHING_TABS, true)]);
    search(&mut f, SearchCriteria::new("rust-lang", false, true, false)).await;
    f.host.switch_tab(5).unwrap();
    f.controller.tab_activated(5, 1).await;

    let outcome = f.controller.popup_closed(Some(1)).await;
    assert_eq!(outcome.selected, vec![2, 3, 5]);
    assert_eq!(f.host.active_tab(1).map(|t| t.id), Some(5));
    assert!(!f.host.calls().contains(&HostCall::Activate(2)));
    assert!(f.host.calls().contains(&HostCall::Highlight {
        window_id: 1,
        indices: vec![4, 1, 2],
    }));
}

#[tokio::test]
async fn test_select_matching_ignores_active_match_in_other_window() {
    let mut f = setup(&[(SELECT_MATCHING_TABS, true)]);
    // Tab 7 is active in window 2 and matches; window 1 stays current.
    search(&mut f, titles("rust")).await;

    let outcome = f.controller.popup_closed(Some(1)).await;
    assert_eq!(outcome.selected, vec![2, 3, 5]);
    assert!(f.host.calls().contains(&HostCall::Activate(2)));
    assert_eq!(f.host.active_tab(1).map(|t| t.id), Some(2));
    assert_eq!(f.host.active_tab(2).map(|t| t.id), Some(7));
    assert!(f.host.calls().contains(&HostCall::Highlight {
        window_id: 1,
        indices: vec![1, 2, 4],
    }));
}

#[tokio::test]
async fn test_single_match_is_not_highlighted() {
    let mut f = setup(&[(SELECT_MATCHING_TABS, true)]);
    search(&mut f, titles("hacker")).await;

    let outcome = f.controller.popup_closed(Some(1)).await;
    assert_eq!(outcome.selected, vec![4]);
    assert_eq!(f.host.active_tab(1).map(|t| t.id), Some(4));
    assert!(!f
        .host
        .calls()
        .iter()
        .any(|c| matches!(c, HostCall::Highlight { .. })));
}

#[tokio::test]
async fn test_clear_matched_tabs_disables_selection() {
    let mut f = setup(&[(SELECT_MATCHING_TABS, true)]);
    search(&mut f, titles("rust")).await;
    f.controller.handle(InboundEvent::ClearMatchedTabs).await;

    let outcome = f.controller.popup_closed(None).await;
    assert!(outcome.selected.is_empty());
    assert_eq!(f.host.active_tab(1).map(|t| t.id), Some(1));
}

// ─── Tab activation ───

#[tokio::test]
async fn test_activation_during_search_keeps_tabs_hidden() {
    let mut f = setup(&[]);
    search(&mut f, titles("rust")).await;

    let outcome = f.controller.tab_activated(2, 1).await;
    assert_eq!(outcome, EventOutcome::Done);
    assert_eq!(f.host.hidden_ids(), BTreeSet::from([4, 6, 8]));
    assert_eq!(f.controller.last_activation().map(|a| a.tab_id), Some(2));
}

#[tokio::test]
async fn test_activation_after_settled_search_recovers_hidden_tabs() {
    let mut f = setup(&[]);
    search(&mut f, titles("rust")).await;
    // Same term again: nothing to apply, the search settles.
    let repeat = search(&mut f, titles("rust")).await;
    assert_eq!((repeat.hidden, repeat.shown), (0, 0));
    assert_eq!(f.controller.phase(), SessionPhase::Idle);

    let outcome = f.controller.tab_activated(2, 1).await;
    assert_eq!(outcome, EventOutcome::Recovered { shown: 3 });
    assert!(f.host.hidden_ids().is_empty());
    assert!(f.controller.session().hidden_by_us.is_empty());
}

#[tokio::test]
async fn test_activation_with_nothing_hidden_is_a_no_op() {
    let mut f = setup(&[]);
    let outcome = f.controller.tab_activated(3, 1).await;
    assert_eq!(outcome, EventOutcome::Done);
    assert!(f.host.calls().is_empty());
}

// ─── Tree view ───

fn nest(f: &Fixture) {
    f.tree.attach(3, 2);
    f.tree.set_collapsed(2, true);
}

#[tokio::test]
async fn test_tree_untouched_without_tree_support() {
    let mut f = setup(&[]);
    nest(&f);
    search(&mut f, titles("issues")).await;
    f.controller.popup_closed(None).await;
    assert!(f.tree.calls().is_empty());
}

#[tokio::test]
async fn test_tree_prepared_once_and_restored() {
    let mut f = setup(&[(TST_SUPPORT, true)]);
    nest(&f);

    search(&mut f, titles("issue")).await;
    search(&mut f, titles("issues")).await;
    assert_eq!(f.tree.registrations(), 1);
    assert!(!f.tree.is_collapsed(2));

    f.controller.popup_closed(None).await;
    assert!(f.tree.is_collapsed(2));
    assert!(!f.controller.tree().is_registered());
}

#[tokio::test]
async fn test_recent_activation_keeps_ancestors_expanded() {
    let mut f = setup(&[(TST_SUPPORT, true)]);
    nest(&f);
    search(&mut f, titles("issues")).await;

    f.host.switch_tab(3).unwrap();
    f.controller.tab_activated(3, 1).await;
    f.controller.popup_closed(Some(1)).await;

    assert!(!f.tree.is_collapsed(2));
}

#[tokio::test]
async fn test_auto_expand_reveals_matches() {
    let mut f = setup(&[(TST_SUPPORT, true), (TST_AUTO_EXPAND, true)]);
    nest(&f);
    search(&mut f, titles("issues")).await;

    f.controller.popup_closed(None).await;
    assert!(!f.tree.is_collapsed(2));
}

#[tokio::test]
async fn test_show_all_pass_skips_tree_preparation() {
    let mut f = setup(&[(TST_SUPPORT, true)]);
    nest(&f);
    search(&mut f, titles("")).await;
    assert!(f.tree.calls().is_empty());
}

#[tokio::test]
async fn test_noop_tree_bridge_session() {
    let host = Arc::new(host_with_tabs());
    let mut controller = SessionController::new(
        Arc::clone(&host),
        Arc::new(NoopTreeView),
        Arc::new(options(&[(TST_SUPPORT, true)])),
        Arc::new(RecordingBadge::new()),
    );
    controller.search(&titles("weather")).await;
    assert_eq!(host.hidden_ids(), BTreeSet::from([2, 3, 4, 5, 8]));
    controller.popup_closed(None).await;
    assert!(host.hidden_ids().is_empty());
}

// ─── Options, audible tabs, startup ───

#[tokio::test]
async fn test_options_changed_resets_selection() {
    let mut f = setup(&[]);
    search(&mut f, titles("rust")).await;

    let outcome = f.controller.handle(InboundEvent::OptionsChanged).await;
    assert_eq!(outcome, EventOutcome::Done);
    assert!(f.controller.session().last_matched.is_empty());
    assert!(f.host.calls().contains(&HostCall::Highlight {
        window_id: 1,
        indices: vec![0],
    }));
}

#[tokio::test]
async fn test_search_audible_without_audio() {
    let mut f = setup(&[]);
    let outcome = f.controller.search_audible().await;
    assert_eq!(outcome, AudibleOutcome::NoAudibleTabs);
    assert!(f.host.calls().is_empty());
}

#[tokio::test]
async fn test_search_audible_single_tab_is_activated() {
    let mut f = setup(&[]);
    f.host.set_audible(8, true).unwrap();

    let outcome = f.controller.search_audible().await;
    assert_eq!(outcome, AudibleOutcome::Activated { tab_id: 8 });
    assert_eq!(f.host.active_tab(2).map(|t| t.id), Some(8));
}

#[tokio::test]
async fn test_search_audible_filters_current_window() {
    let mut f = setup(&[]);
    f.host.set_audible(4, true).unwrap();
    f.host.set_audible(8, true).unwrap();

    let outcome = f.controller.search_audible().await;
    assert_eq!(outcome, AudibleOutcome::Filtered { hidden: 4 });
    assert_eq!(f.host.hidden_ids(), BTreeSet::from([2, 3, 5, 6]));
    assert_eq!(f.controller.phase(), SessionPhase::Searching);

    f.controller.popup_closed(None).await;
    assert!(f.host.hidden_ids().is_empty());
}

#[tokio::test]
async fn test_search_audible_with_nothing_to_hide_stays_idle() {
    let mut f = setup(&[]);
    f.host.focus_window(2);
    f.host.set_audible(7, true).unwrap();
    f.host.set_audible(8, true).unwrap();

    let outcome = f.controller.search_audible().await;
    assert_eq!(outcome, AudibleOutcome::Filtered { hidden: 0 });
    assert_eq!(f.controller.phase(), SessionPhase::Idle);
    assert!(f.controller.session().session_id.is_none());
    assert!(f.host.hidden_ids().is_empty());
}

#[tokio::test]
async fn test_startup_nudges_last_tab() {
    let f = setup(&[]);
    let handle = f.controller.startup().await.expect("nudge scheduled");
    assert!(f.host.hidden_ids().contains(&6));

    handle.await.unwrap();
    assert!(f.host.hidden_ids().is_empty());
    assert_eq!(
        f.host.calls(),
        vec![HostCall::Hide(vec![6]), HostCall::Show(vec![6])]
    );
}

#[tokio::test]
async fn test_startup_nudge_can_be_disabled() {
    let f = setup(&[(DISABLE_EMPTY_TAB, true)]);
    assert!(f.controller.startup().await.is_none());
    assert!(f.host.calls().is_empty());
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let mut f = setup(&[]);
    search(&mut f, titles("rust")).await;
    f.controller.tab_activated(2, 1).await;

    f.controller.reset();
    assert_eq!(f.controller.phase(), SessionPhase::Idle);
    assert!(f.controller.session().hidden_by_us.is_empty());
    assert!(f.controller.last_activation().is_none());
    assert!(!f.controller.progress().is_tracking());
    assert_eq!(f.badge.current(), "");
}
