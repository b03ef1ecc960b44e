//! TabSearch demo: narrows the browser's tab strip to tabs matching a search term.
//!
//! Entry point: runs a console demo of one search session against the
//! in-memory tab host and tree model.

use std::sync::Arc;

use tabsearch::managers::session_controller::SessionController;
use tabsearch::managers::tab_manager::{TabManager, TabManagerTrait};
use tabsearch::managers::tree_model::TreeModel;
use tabsearch::services::badge::RecordingBadge;
use tabsearch::services::option_store::{MemoryOptionStore, OptionStore};
use tabsearch::types::events::{EventOutcome, InboundEvent};
use tabsearch::types::options::{SELECT_MATCHING_TABS, TST_SUPPORT};

type DemoController = SessionController<TabManager, TreeModel, MemoryOptionStore, RecordingBadge>;

#[tokio::main]
async fn main() {
    tabsearch::logging::init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 TabSearch v{} — Demo Mode                ║", env!("CARGO_PKG_VERSION"));
    println!("║        Hide every tab that does not match a search         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let host = Arc::new(TabManager::new());
    let tree = Arc::new(TreeModel::new());
    let options = Arc::new(MemoryOptionStore::new());
    let badge = Arc::new(RecordingBadge::new());

    let parent = demo_tabs(&host, &tree);
    demo_options(&options).await;

    let mut controller = SessionController::new(
        Arc::clone(&host),
        Arc::clone(&tree),
        Arc::clone(&options),
        Arc::clone(&badge),
    );

    demo_search(&mut controller, &host).await;
    demo_close(&mut controller, &host, &tree, parent).await;
    demo_audible(&mut controller, &host).await;

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ Search session demonstrated, badge history: {:?}", badge.history());
    println!("═══════════════════════════════════════════════════════════════");
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn print_visible(host: &TabManager) {
    for tab in host.get_all_tabs() {
        let marker = if tab.hidden { "  " } else if tab.active { "▶ " } else { "· " };
        if !tab.hidden {
            println!("  {}[{}] {} — {}", marker, tab.id, tab.title, tab.url);
        }
    }
    println!("  ({} hidden)", host.hidden_ids().len());
}

/// Returns the id of the collapsed parent tab.
fn demo_tabs(host: &TabManager, tree: &TreeModel) -> i64 {
    section("Tabs");

    host.open_tab(1, "https://docs.rs/tokio", "tokio - Rust");
    let parent = host.open_tab(1, "https://github.com/rust-lang/rust", "rust-lang/rust");
    let child = host.open_tab(1, "https://github.com/rust-lang/rust/issues", "Issues · rust-lang/rust");
    host.open_tab(1, "https://news.ycombinator.com", "Hacker News");
    let music = host.open_tab(1, "https://radio.example.org", "Radio");
    let _ = host.set_audible(music, true);
    let _ = host.set_page_text(child, "Tracking issue for async fn in traits");

    tree.attach(child, parent);
    tree.set_collapsed(parent, true);

    println!("  Opened {} tabs, tab {} nests under collapsed tab {}", host.tab_count(), child, parent);
    println!("  ✓ TabManager OK");
    println!();
    parent
}

async fn demo_options(options: &MemoryOptionStore) {
    section("Options");

    let mut items = serde_json::Map::new();
    items.insert(TST_SUPPORT.to_string(), serde_json::json!(true));
    items.insert(SELECT_MATCHING_TABS.to_string(), serde_json::json!(true));
    if let Err(e) = options.set(items).await {
        println!("  ✗ could not store options: {}", e);
    }
    println!("  Stored: {:?}", options.snapshot());
    println!("  ✓ MemoryOptionStore OK");
    println!();
}

async fn demo_search(controller: &mut DemoController, host: &TabManager) {
    section("Search");

    for term in ["r", "rust", "rust-lang"] {
        let event = InboundEvent::SearchTabs {
            term: term.to_string(),
            match_title: true,
            match_url: true,
            match_content: true,
        };
        if let EventOutcome::Search(outcome) = controller.handle(event).await {
            println!(
                "  {:>10}: {} matched, {} hidden, {} shown",
                format!("{:?}", term),
                outcome.matched,
                outcome.hidden,
                outcome.shown
            );
        }
    }
    print_visible(host);
    println!("  ✓ SessionController search OK");
    println!();
}

async fn demo_close(
    controller: &mut DemoController,
    host: &TabManager,
    tree: &TreeModel,
    parent: i64,
) {
    section("Popup closed");

    if let EventOutcome::Closed(outcome) = controller
        .handle(InboundEvent::PopupClosed { window_id: Some(1) })
        .await
    {
        println!("  Unhid {} tabs, selected {:?}", outcome.shown, outcome.selected);
    }
    println!("  Tree {} collapsed again: {}", parent, tree.is_collapsed(parent));
    println!("  Highlighted: {:?}", host.highlighted_ids());
    println!("  ✓ Session end OK");
    println!();
}

async fn demo_audible(controller: &mut DemoController, host: &TabManager) {
    section("Audible tabs");

    if let EventOutcome::Audible(outcome) = controller.handle(InboundEvent::SearchAudible).await {
        println!("  {:?}", outcome);
    }
    println!("  Active tab: {:?}", host.active_tab(1).map(|t| t.title));
    controller.reset();
    println!("  ✓ Audible search OK");
    println!();
}
