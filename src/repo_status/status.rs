//! Status flags and their presentation as file browser markup.

use std::path::PathBuf;

bitflags::bitflags! {
    /// Version-control status of a single path.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatusFlags: u32 {
        /// Added to the index.
        const INDEX_NEW = 1 << 0;
        /// Modified in the index.
        const INDEX_MODIFIED = 1 << 1;
        /// Deleted from the index.
        const INDEX_DELETED = 1 << 2;
        /// Untracked in the working tree.
        const WORKING_TREE_NEW = 1 << 3;
        /// Modified in the working tree.
        const WORKING_TREE_MODIFIED = 1 << 4;
        /// Deleted from the working tree.
        const WORKING_TREE_DELETED = 1 << 5;
        /// Matched by an ignore rule.
        const IGNORED = 1 << 6;

        /// Any flag rendered in bold.
        const NEW_OR_MODIFIED = Self::INDEX_NEW.bits()
            | Self::WORKING_TREE_NEW.bits()
            | Self::INDEX_MODIFIED.bits()
            | Self::WORKING_TREE_MODIFIED.bits();
        /// Any flag rendered struck through.
        const DELETED = Self::INDEX_DELETED.bits() | Self::WORKING_TREE_DELETED.bits();
    }
}

/// How a status is rendered in the file browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupStyle {
    /// The escaped name alone.
    Plain,
    /// Bold, for new or modified files.
    Bold,
    /// Struck through, for deleted files.
    Strikethrough,
}

impl StatusFlags {
    /// Pick the display style. New or modified wins over deleted.
    pub fn style(self) -> MarkupStyle {
        if self.intersects(StatusFlags::NEW_OR_MODIFIED) {
            MarkupStyle::Bold
        } else if self.intersects(StatusFlags::DELETED) {
            MarkupStyle::Strikethrough
        } else {
            MarkupStyle::Plain
        }
    }

    /// Combine the on-disk status with an open editor's own status.
    ///
    /// The editor knows about unsaved changes, so its status is shown,
    /// except for ignored files which stay plain whatever the buffer says.
    pub fn merge_with_document(disk: StatusFlags, document: Option<StatusFlags>) -> StatusFlags {
        match document {
            Some(doc) if !disk.contains(StatusFlags::IGNORED) => doc,
            _ => disk,
        }
    }

    /// Like [`merge_with_document`](Self::merge_with_document) when the
    /// on-disk status may be unknown. Without it the editor's view is all
    /// there is.
    pub fn merge_unknown_with_document(
        disk: Option<StatusFlags>,
        document: Option<StatusFlags>,
    ) -> Option<StatusFlags> {
        match disk {
            Some(disk) => Some(Self::merge_with_document(disk, document)),
            None => document,
        }
    }
}

/// The outcome of one status query, produced on the worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResult {
    /// Absolute path the status was computed for.
    pub path: PathBuf,
    /// Status of that path, or `None` when the query failed.
    pub flags: Option<StatusFlags>,
    /// Id of the request that produced this result.
    pub request: u64,
    /// Worker generation at the time of the request.
    pub generation: u64,
}

/// Escape text for Pango-style markup.
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render a display name with the markup for `flags`.
///
/// `None` means the status is unknown and the name is shown plain.
pub fn render_markup(display_name: &str, flags: Option<StatusFlags>) -> String {
    let escaped = escape_markup(display_name);
    match flags.map(StatusFlags::style) {
        Some(MarkupStyle::Bold) => format!("<span weight=\"bold\">{escaped}</span>"),
        Some(MarkupStyle::Strikethrough) => {
            format!("<span strikethrough=\"true\">{escaped}</span>")
        }
        Some(MarkupStyle::Plain) | None => escaped,
    }
}
