//! Logging and debugging facilities for Horizon item lists.
//!
//! This module provides:
//! - Target and span names used with the `tracing` crate
//! - Debug visualization of depth-annotated flat lists
//! - A performance span guard for profiling cache rebuilds
//!
//! # Tracing Integration
//!
//! Item lists are instrumented with `tracing`. To see logs, install a
//! subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_itemlist::cache=debug")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! Any row type implementing [`TreeRow`] can be rendered with
//! [`FlatListDebug`]:
//!
//! ```
//! use horizon_itemlist_core::logging::{FlatListDebug, TreeRow};
//!
//! struct Row(&'static str, usize);
//!
//! impl TreeRow for Row {
//!     fn row_depth(&self) -> usize { self.1 }
//!     fn row_label(&self) -> String { self.0.to_string() }
//! }
//!
//! let rows = [Row("fruits", 0), Row("apple", 1), Row("pear", 1)];
//! let text = FlatListDebug::new().format(&rows);
//! assert!(text.contains("apple"));
//! ```

use std::fmt::Write as FmtWrite;
use std::sync::Arc;

/// Span names used throughout Horizon item lists for tracing.
pub mod span_names {
    /// Full view-list computation.
    pub const VIEW_LIST: &str = "horizon_itemlist::view_list";
    /// Rebuild of the grouped layer.
    pub const GROUPED: &str = "horizon_itemlist::grouped";
    /// Rebuild of the flat layer.
    pub const FLATTEN: &str = "horizon_itemlist::flatten";
    /// Rebuild of the visible layer.
    pub const VISIBLE: &str = "horizon_itemlist::visible";
    /// Drag-and-drop processing.
    pub const DRAG: &str = "horizon_itemlist::drag";
}

/// Target names for log filtering.
pub mod targets {
    /// Core primitives target.
    pub const CORE: &str = "horizon_itemlist_core";
    /// Signal emission target.
    pub const SIGNAL: &str = "horizon_itemlist_core::signal";
    /// Cache orchestration target.
    pub const CACHE: &str = "horizon_itemlist::cache";
    /// Item loading target.
    pub const LOAD: &str = "horizon_itemlist::load";
    /// Selection tracking target.
    pub const SELECTION: &str = "horizon_itemlist::selection";
    /// Search/filter target.
    pub const FILTER: &str = "horizon_itemlist::filter";
    /// Drag-and-drop target.
    pub const DRAG: &str = "horizon_itemlist::drag";
}

/// A row that can be rendered as part of a depth-annotated flat list.
pub trait TreeRow {
    /// The nesting depth of the row (0 for roots).
    fn row_depth(&self) -> usize;

    /// The text to print for the row.
    fn row_label(&self) -> String;

    /// Short state markers printed after the label (e.g. "selected").
    fn row_markers(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

impl<T: TreeRow + ?Sized> TreeRow for Arc<T> {
    fn row_depth(&self) -> usize {
        (**self).row_depth()
    }

    fn row_label(&self) -> String {
        (**self).row_label()
    }

    fn row_markers(&self) -> Vec<&'static str> {
        (**self).row_markers()
    }
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-dash representation.
    Compact,
}

/// Configuration for flat list debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to prefix each row with its flat index.
    pub show_indices: bool,
    /// Whether to print state markers.
    pub show_markers: bool,
    /// Maximum depth to print (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_indices: true,
            show_markers: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Options for minimal output: labels only.
    pub fn minimal() -> Self {
        Self {
            show_indices: false,
            show_markers: false,
            ..Default::default()
        }
    }
}

/// Debug utility rendering a flat list as an indented tree.
#[derive(Debug, Clone, Default)]
pub struct FlatListDebug {
    options: TreeFormatOptions,
}

impl FlatListDebug {
    /// Create a new visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the rows, one line each.
    pub fn format<R: TreeRow>(&self, rows: &[R]) -> String {
        let mut output = String::new();
        if rows.is_empty() {
            output.push_str("(empty)\n");
            return output;
        }

        for (index, row) in rows.iter().enumerate() {
            let depth = row.row_depth();
            if self.options.max_depth.is_some_and(|max| depth > max) {
                continue;
            }

            if self.options.show_indices {
                let _ = write!(output, "{index:>4} ");
            }
            output.push_str(&self.build_prefix(depth, is_last_sibling(rows, index)));
            output.push_str(&row.row_label());

            if self.options.show_markers {
                let markers = row.row_markers();
                if !markers.is_empty() {
                    let _ = write!(output, " [{}]", markers.join(", "));
                }
            }
            output.push('\n');
        }

        output
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix.push(' ');
        prefix
    }
}

/// A row is the last of its siblings when no later row at the same depth
/// appears before the list climbs back above it.
fn is_last_sibling<R: TreeRow>(rows: &[R], index: usize) -> bool {
    let depth = rows[index].row_depth();
    for row in &rows[index + 1..] {
        let d = row.row_depth();
        if d == depth {
            return false;
        }
        if d < depth {
            return true;
        }
    }
    true
}

/// A guard that keeps a tracing span entered until dropped.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "horizon_itemlist::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}
