//! Demo application for the git status cache.
//!
//! Plays the part of an editor's file browser:
//! 1. The root directory (first argument, or the current directory) is
//!    announced to a status window
//! 2. Every top-level entry is tracked with its own display id
//! 3. Markup updates are printed as they arrive
//! 4. Ctrl+C tears everything down cleanly

use anyhow::{Context, Result};
use git_status_cache::{prelude::*, run_pump_loop};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("git_status_cache=debug".parse()?),
        )
        .init();

    let root = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => std::env::current_dir().context("no current directory")?,
    };

    println!("=== Git Status Cache Demo ===\n");
    println!("Root: {}\n", root.display());

    let config = StatusConfig::default();
    let mut registry = StatusRegistry::new(Box::new(GitBackend::new()), config.clone());

    let watcher = NotifyDirectoryWatcher::new(config.watcher_debounce)?;
    let (sink, browser_rx) = BroadcastMarkupSink::new(config.channel_capacity);

    let entries = list_entries(&root)?;
    let names: Vec<(DisplayId, String)> = entries
        .iter()
        .map(|(id, _, name, _)| (*id, name.clone()))
        .collect();

    // The pane prints whatever markup changed
    let mut browser = FileBrowserPaneBuilder::new()
        .on_refresh(Box::new(|| println!("[Browser] Refresh requested")))
        .build();
    browser.setup_listener(browser_rx);

    let mut printer = sink.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = printer.recv().await {
            if let BrowserEvent::SetMarkup { id, markup } = event {
                let name = names
                    .iter()
                    .find(|(entry_id, _)| *entry_id == id)
                    .map(|(_, name)| name.as_str())
                    .unwrap_or("?");
                println!("[Browser] {:<30} {}", name, markup);
            }
        }
    });

    let window = registry.open_window(WindowId(1), Box::new(watcher), Box::new(sink))?;
    window.on_root_changed(Location::from(root.clone()));

    match window.state() {
        CoordinatorState::RepositoryBound => println!("Root is inside a repository\n"),
        _ => println!("Root is not inside a repository, nothing will be marked\n"),
    }

    for (id, path, name, is_dir) in entries {
        window.on_file_tracked(Location::from(path), id, name, is_dir);
    }

    println!("Press Ctrl+C to exit\n");
    println!("Try editing, staging or committing files in the root directory.\n");
    println!("---\n");

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        println!("\nShutting down...");
        let _ = shutdown_tx.send(());
    });

    run_pump_loop(&mut registry, 50, shutdown_rx).await;

    // Cleanup
    registry.shutdown();
    browser.stop().await;
    println!("Done!");

    Ok(())
}

/// Top-level entries of `root`, as a file browser would announce them.
fn list_entries(root: &Path) -> Result<Vec<(DisplayId, PathBuf, String, bool)>> {
    let mut entries: Vec<_> = std::fs::read_dir(root)
        .with_context(|| format!("failed to list {}", root.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = path.is_dir();
            (path, name, is_dir)
        })
        .filter(|(_, name, _)| name != ".git")
        .collect();
    entries.sort_by(|a, b| a.1.cmp(&b.1));

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(i, (path, name, is_dir))| (DisplayId(i as u64), path, name, is_dir))
        .collect())
}
