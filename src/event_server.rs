//! TabSearch event server: drives the engine from newline-delimited JSON on stdin.
//!
//! Usage: `tabsearch-events [FIXTURE.json] [--options PATH]`
//!
//! The fixture is either an array of tab records or an object with `tabs`,
//! optional `tree` links (`{"child":2,"parent":1}`) and optional `collapsed`
//! parent ids. Without `--options` the options live in memory.
//!
//! Request:  {"id":1, "action":"search-tabs", "term":"docs", "searchTitles":true}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use tabsearch::event_handler::handle_event;
use tabsearch::managers::session_controller::SessionController;
use tabsearch::managers::tab_manager::TabManager;
use tabsearch::managers::tree_model::TreeModel;
use tabsearch::services::badge::LogBadge;
use tabsearch::services::option_store::{JsonFileOptionStore, MemoryOptionStore, OptionStore};
use tabsearch::types::tab::{TabId, TabRecord};

#[derive(Debug, Deserialize)]
struct TreeLink {
    child: TabId,
    parent: TabId,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Fixture {
    Tabs(Vec<TabRecord>),
    Session {
        tabs: Vec<TabRecord>,
        #[serde(default)]
        tree: Vec<TreeLink>,
        #[serde(default)]
        collapsed: Vec<TabId>,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "tabsearch-events",
    version,
    about = "Drive the tab search engine from newline-delimited JSON events"
)]
/// Command-line arguments accepted by `tabsearch-events`.
struct Args {
    #[arg(value_name = "FIXTURE", help = "Tab set to load: an array of tabs or {tabs, tree, collapsed}")]
    fixture: Option<PathBuf>,
    #[arg(
        long,
        value_name = "PATH",
        help = "Persist options in this JSON file (default: in memory)"
    )]
    options: Option<PathBuf>,
}

async fn load_fixture(path: Option<&PathBuf>) -> Result<(TabManager, TreeModel), String> {
    let tree = TreeModel::new();
    let Some(path) = path else {
        return Ok((TabManager::new(), tree));
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("reading {}: {}", path.display(), e))?;
    let fixture: Fixture =
        serde_json::from_str(&content).map_err(|e| format!("parsing {}: {}", path.display(), e))?;
    let tabs = match fixture {
        Fixture::Tabs(tabs) => tabs,
        Fixture::Session {
            tabs,
            tree: links,
            collapsed,
        } => {
            for link in links {
                tree.attach(link.child, link.parent);
            }
            for id in collapsed {
                tree.set_collapsed(id, true);
            }
            tabs
        }
    };
    log::info!("loaded {} tabs from {}", tabs.len(), path.display());
    Ok((TabManager::from_records(tabs), tree))
}

async fn write_line(stdout: &mut tokio::io::Stdout, value: &Value) {
    let line = format!("{}\n", value);
    if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
        log::error!("stdout closed");
    }
}

async fn serve<O: OptionStore>(options: O, host: TabManager, tree: TreeModel) {
    let mut controller = SessionController::new(
        Arc::new(host),
        Arc::new(tree),
        Arc::new(options),
        Arc::new(LogBadge),
    );
    let mut stdout = tokio::io::stdout();

    let ready = json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")});
    write_line(&mut stdout, &ready).await;

    let nudge = controller.startup().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("reading stdin failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                write_line(&mut stdout, &json!({"id": null, "error": format!("parse error: {}", e)})).await;
                continue;
            }
        };
        let id = payload.get("id").cloned().unwrap_or(Value::Null);

        let response = match handle_event(&mut controller, &payload).await {
            Ok(result) => json!({"id": id, "result": result}),
            Err(err) => json!({"id": id, "error": err.to_string()}),
        };
        write_line(&mut stdout, &response).await;
    }

    if let Some(handle) = nudge {
        let _ = handle.await;
    }
    controller.reset();
}

#[tokio::main]
async fn main() -> ExitCode {
    tabsearch::logging::init();

    let args = Args::parse();
    let (host, tree) = match load_fixture(args.fixture.as_ref()).await {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("tabsearch-events: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.options {
        Some(path) => serve(JsonFileOptionStore::new(Some(path)), host, tree).await,
        None => serve(MemoryOptionStore::new(), host, tree).await,
    }
    ExitCode::SUCCESS
}
