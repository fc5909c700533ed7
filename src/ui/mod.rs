//! UI components module.
//!
//! This module provides the file browser side of status presentation.

pub mod file_browser;

pub use file_browser::{
    BroadcastMarkupSink, BrowserEvent, FileBrowserHandle, FileBrowserPane, FileBrowserPaneBuilder,
    FileBrowserState, InvalidateCallback, RedrawCallback, RefreshCallback,
};
