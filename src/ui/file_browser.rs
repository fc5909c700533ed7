//! File browser presentation for status markup.
//!
//! `BroadcastMarkupSink` is the coordinator's side: it turns markup updates
//! into `BrowserEvent`s on a broadcast channel. `FileBrowserPane` is the
//! UI's side: a listener task that applies those events to the browser
//! state and triggers redraws.

use crate::repo_status::{DisplayId, MarkupSink};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Callback type for entry invalidation.
pub type InvalidateCallback = Box<dyn Fn(&[DisplayId]) + Send + Sync>;

/// Callback type for requesting a redraw.
pub type RedrawCallback = Box<dyn Fn() + Send + Sync>;

/// Callback type for asking the host to re-announce its entries.
pub type RefreshCallback = Box<dyn Fn() + Send + Sync>;

/// Event sent from the coordinator to the file browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    /// Replace the markup of one entry.
    SetMarkup {
        /// Entry to update.
        id: DisplayId,
        /// Pango-style markup for its name.
        markup: String,
    },
    /// Re-list entries; any markup shown so far is stale.
    Refresh,
}

/// A [`MarkupSink`] that forwards to a broadcast channel.
#[derive(Clone)]
pub struct BroadcastMarkupSink {
    sender: broadcast::Sender<BrowserEvent>,
}

impl BroadcastMarkupSink {
    /// Creates a sink with the given channel buffer size.
    ///
    /// # Returns
    /// A tuple of (sink, receiver) where receiver gets every browser event.
    pub fn new(buffer_size: usize) -> (Self, broadcast::Receiver<BrowserEvent>) {
        let (sender, receiver) = broadcast::channel(buffer_size);
        (Self { sender }, receiver)
    }

    /// Get another receiver for browser events.
    pub fn subscribe(&self) -> broadcast::Receiver<BrowserEvent> {
        self.sender.subscribe()
    }

    fn send(&self, event: BrowserEvent) {
        // No receivers just means no browser is showing yet
        if let Err(e) = self.sender.send(event) {
            tracing::trace!("No file browser listening: {}", e);
        }
    }
}

impl MarkupSink for BroadcastMarkupSink {
    fn set_markup(&mut self, id: DisplayId, markup: &str) {
        self.send(BrowserEvent::SetMarkup {
            id,
            markup: markup.to_string(),
        });
    }

    fn request_refresh(&mut self) {
        self.send(BrowserEvent::Refresh);
    }
}

/// State of the file browser view.
#[derive(Debug, Clone, Default)]
pub struct FileBrowserState {
    /// Latest markup per entry.
    pub markup: HashMap<DisplayId, String>,
    /// Entries that need to be redrawn.
    pub dirty: HashSet<DisplayId>,
    /// Whether a full redraw is needed.
    pub needs_full_redraw: bool,
}

/// A reference to the file browser view for use in async contexts.
#[derive(Clone, Default)]
pub struct FileBrowserHandle {
    state: Arc<RwLock<FileBrowserState>>,
    invalidate_cb: Option<Arc<InvalidateCallback>>,
    redraw_cb: Option<Arc<RedrawCallback>>,
    refresh_cb: Option<Arc<RefreshCallback>>,
}

impl FileBrowserHandle {
    /// Create a handle with empty state and no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callback for entries whose markup changed.
    pub fn set_invalidate_callback(&mut self, cb: InvalidateCallback) {
        self.invalidate_cb = Some(Arc::new(cb));
    }

    /// Set the callback for full redraws.
    pub fn set_redraw_callback(&mut self, cb: RedrawCallback) {
        self.redraw_cb = Some(Arc::new(cb));
    }

    /// Set the callback asking the host to re-list entries.
    pub fn set_refresh_callback(&mut self, cb: RefreshCallback) {
        self.refresh_cb = Some(Arc::new(cb));
    }

    /// Store new markup for an entry and mark it dirty.
    pub async fn apply_markup(&self, id: DisplayId, markup: String) {
        {
            let mut state = self.state.write().await;
            state.markup.insert(id, markup);
            state.dirty.insert(id);
        }

        if let Some(ref cb) = self.invalidate_cb {
            cb(&[id]);
        }
    }

    /// Forget all markup and ask the host to list its entries again.
    pub async fn reset(&self) {
        {
            let mut state = self.state.write().await;
            state.markup.clear();
            state.dirty.clear();
        }

        if let Some(ref cb) = self.refresh_cb {
            cb();
        }
        self.request_redraw().await;
    }

    /// Request a full redraw.
    pub async fn request_redraw(&self) {
        self.state.write().await.needs_full_redraw = true;

        if let Some(ref cb) = self.redraw_cb {
            cb();
        }
    }

    /// Clear the dirty state after redraw.
    pub async fn clear_dirty(&self) {
        let mut state = self.state.write().await;
        state.dirty.clear();
        state.needs_full_redraw = false;
    }

    /// Markup currently shown for an entry.
    pub async fn markup(&self, id: DisplayId) -> Option<String> {
        self.state.read().await.markup.get(&id).cloned()
    }

    /// Whether an entry changed since the last redraw.
    pub async fn is_dirty(&self, id: DisplayId) -> bool {
        self.state.read().await.dirty.contains(&id)
    }

    /// Whether a full redraw is pending.
    pub async fn needs_full_redraw(&self) -> bool {
        self.state.read().await.needs_full_redraw
    }
}

/// File browser pane listening for status markup.
pub struct FileBrowserPane {
    browser: FileBrowserHandle,
    listener_handle: Option<tokio::task::JoinHandle<()>>,
}

impl FileBrowserPane {
    /// Create a pane that is not listening yet.
    pub fn new() -> Self {
        Self {
            browser: FileBrowserHandle::new(),
            listener_handle: None,
        }
    }

    /// Get a reference to the browser handle.
    pub fn browser(&self) -> &FileBrowserHandle {
        &self.browser
    }

    /// Get a mutable reference to the browser handle.
    pub fn browser_mut(&mut self) -> &mut FileBrowserHandle {
        &mut self.browser
    }

    /// Spawn the task that applies browser events as they arrive.
    pub fn setup_listener(&mut self, rx: broadcast::Receiver<BrowserEvent>) {
        let browser = self.browser.clone();

        let handle = tokio::spawn(async move {
            Self::listener_loop(browser, rx).await;
        });

        self.listener_handle = Some(handle);
    }

    async fn listener_loop(browser: FileBrowserHandle, mut rx: broadcast::Receiver<BrowserEvent>) {
        loop {
            match rx.recv().await {
                Ok(BrowserEvent::SetMarkup { id, markup }) => {
                    tracing::trace!("FileBrowser markup for {:?}: {}", id, markup);
                    browser.apply_markup(id, markup).await;
                }
                Ok(BrowserEvent::Refresh) => {
                    browser.reset().await;
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    tracing::warn!(
                        "FileBrowser lagged behind by {} updates, requesting full refresh",
                        count
                    );
                    // Missed markup can only be recovered by re-listing
                    browser.reset().await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Browser event channel closed, stopping listener");
                    break;
                }
            }
        }
    }

    /// Stop the listener task.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.listener_handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    /// Check if the listener is running.
    pub fn is_listening(&self) -> bool {
        self.listener_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Default for FileBrowserPane {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for FileBrowserPane with callbacks.
#[derive(Default)]
pub struct FileBrowserPaneBuilder {
    invalidate_cb: Option<InvalidateCallback>,
    redraw_cb: Option<RedrawCallback>,
    refresh_cb: Option<RefreshCallback>,
}

impl FileBrowserPaneBuilder {
    /// Create a builder with no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the invalidate callback.
    pub fn on_invalidate(mut self, cb: InvalidateCallback) -> Self {
        self.invalidate_cb = Some(cb);
        self
    }

    /// Set the redraw callback.
    pub fn on_redraw(mut self, cb: RedrawCallback) -> Self {
        self.redraw_cb = Some(cb);
        self
    }

    /// Set the refresh callback.
    pub fn on_refresh(mut self, cb: RefreshCallback) -> Self {
        self.refresh_cb = Some(cb);
        self
    }

    /// Build the pane.
    pub fn build(self) -> FileBrowserPane {
        let mut pane = FileBrowserPane::new();

        if let Some(cb) = self.invalidate_cb {
            pane.browser_mut().set_invalidate_callback(cb);
        }
        if let Some(cb) = self.redraw_cb {
            pane.browser_mut().set_redraw_callback(cb);
        }
        if let Some(cb) = self.refresh_cb {
            pane.browser_mut().set_refresh_callback(cb);
        }

        pane
    }
}
