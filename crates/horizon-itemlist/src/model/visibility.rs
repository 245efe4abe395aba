//! Visible-list computation.
//!
//! Two pure passes over the (grouped) tree:
//!
//! - [`visible_unfiltered`] keeps every item that is neither hidden by a
//!   collapsed or invisible ancestor nor by its own flags;
//! - [`visible_filtered`] keeps leaves whose search text matches a
//!   [`SearchMatcher`] and the nodes leading to them.
//!
//! Both passes assign the alternating-row flag and collect selected items.

use std::fmt;

use regex::{Regex, RegexBuilder};

use horizon_itemlist_core::logging::targets;

use super::accessor::{self, FieldAccessor};
use super::diacritics;
use super::flatten::hides_itself;
use super::item::{Item, ItemRef, walk_tree};

/// A search query.
#[derive(Clone)]
pub enum Query {
    /// Literal text, matched case-insensitively and without diacritics.
    Text(String),
    /// A caller-supplied pattern, used as is.
    Pattern(Regex),
}

impl Query {
    /// The string form used to detect query changes.
    pub fn as_key(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Pattern(regex) => regex.as_str(),
        }
    }

    /// Builds the matcher regex. An empty text query or a pattern that fails
    /// to compile yields `None` (no filter).
    pub fn to_regex(&self) -> Option<Regex> {
        match self {
            Self::Text(text) if text.is_empty() => None,
            Self::Text(text) => {
                let escaped = regex::escape(&diacritics::remove(text));
                match RegexBuilder::new(&escaped).case_insensitive(true).build() {
                    Ok(regex) => Some(regex),
                    Err(err) => {
                        tracing::warn!(target: targets::FILTER, query = %text, error = %err, "ignoring malformed query");
                        None
                    }
                }
            }
            Self::Pattern(regex) => Some(regex.clone()),
        }
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Regex> for Query {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
        }
    }
}

/// Tests leaves against a regex.
#[derive(Debug, Clone, Copy)]
pub struct SearchMatcher<'a> {
    regex: &'a Regex,
    field: Option<&'a FieldAccessor>,
}

impl<'a> SearchMatcher<'a> {
    /// Matches the text resolved through `field` (the display text when
    /// `None`).
    pub fn new(regex: &'a Regex, field: Option<&'a FieldAccessor>) -> Self {
        Self { regex, field }
    }

    /// Nodes always match. Leaves match when their non-empty search text,
    /// stripped of diacritics, matches the regex.
    pub fn matches(&self, item: &Item) -> bool {
        if item.has_children() {
            return true;
        }
        let text = accessor::item_text(item, self.field);
        !text.is_empty() && self.regex.is_match(&diacritics::remove(&text))
    }
}

/// Output of a visibility pass.
#[derive(Debug, Default)]
pub struct VisibleResult {
    pub visible: Vec<ItemRef>,
    pub selected: Vec<ItemRef>,
}

/// Computes the visible list without a filter.
pub fn visible_unfiltered(items: &[ItemRef], hide_selected: bool) -> VisibleResult {
    fn walk(items: &[ItemRef], hidden: bool, hide_selected: bool, odd: &mut bool, out: &mut VisibleResult) {
        for item in items {
            if !hidden && !hides_itself(item, hide_selected) {
                item.set_odd(*odd);
                *odd = !*odd;
                out.visible.push(item.clone());
            }
            if item.is_selected() {
                out.selected.push(item.clone());
            }
            if let Some(children) = item.child_items() {
                *odd = false;
                let state = item.state();
                walk(&children, hidden || state.collapsed || !state.visible, hide_selected, odd, out);
            }
        }
    }

    let mut out = VisibleResult::default();
    let mut odd = false;
    walk(items, false, hide_selected, &mut odd, &mut out);
    out
}

struct FilterPass<'a> {
    matcher: SearchMatcher<'a>,
    hide_selected: bool,
    expand_tree: bool,
    odd: bool,
    selected: Vec<ItemRef>,
}

impl FilterPass<'_> {
    /// Returns the filtered rows of `list`, `None` when nothing matched.
    fn filter(&mut self, list: &[ItemRef], depth: usize) -> Option<Vec<ItemRef>> {
        let mut filtered: Option<Vec<ItemRef>> = None;
        for item in list {
            if let Some(children) = item.child_items() {
                if item.is_visible() && self.matcher.matches(item) {
                    self.odd = false;
                    if let Some(rows) = self.filter(&children, depth + 1) {
                        if item.is_collapsed() && self.expand_tree {
                            item.set_collapsed(false);
                        }
                        let out = filtered.get_or_insert_with(Vec::new);
                        out.push(item.clone());
                        if !item.is_collapsed() {
                            out.extend(rows);
                        }
                    }
                } else {
                    self.collect_selected(&children);
                }
                if item.is_selected() {
                    self.selected.push(item.clone());
                }
            } else if self.matcher.matches(item) {
                item.set_depth(depth);
                let out = filtered.get_or_insert_with(Vec::new);
                if !hides_itself(item, self.hide_selected) {
                    item.set_odd(self.odd);
                    self.odd = !self.odd;
                    out.push(item.clone());
                }
                if item.is_selected() {
                    self.selected.push(item.clone());
                }
            } else if item.is_selected() {
                self.selected.push(item.clone());
            }
        }
        filtered
    }

    fn collect_selected(&mut self, items: &[ItemRef]) {
        walk_tree(items, &mut |item| {
            if item.is_selected() {
                self.selected.push(item.clone());
            }
        });
    }
}

/// Computes the visible list of the items matching `matcher`.
///
/// A node is included when at least one descendant matched; with
/// `expand_tree` such a node is expanded, otherwise a collapsed node is shown
/// without its children.
pub fn visible_filtered(
    items: &[ItemRef],
    matcher: SearchMatcher<'_>,
    hide_selected: bool,
    expand_tree: bool,
) -> VisibleResult {
    let mut pass = FilterPass {
        matcher,
        hide_selected,
        expand_tree,
        odd: false,
        selected: Vec::new(),
    };
    let visible = pass.filter(items, 0).unwrap_or_default();
    VisibleResult {
        visible,
        selected: pass.selected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::ensure_children;
    use crate::model::accessor::item_text;
    use serde_json::json;

    fn names(list: &[ItemRef]) -> Vec<String> {
        list.iter().map(|i| item_text(i, None)).collect()
    }

    fn sample() -> (Vec<ItemRef>, ItemRef) {
        let b = Item::labeled("B")
            .with_children(vec![Item::labeled("C").into_ref(), Item::labeled("Dé").into_ref()])
            .into_ref();
        let roots = vec![Item::labeled("A").into_ref(), b.clone(), Item::labeled("E").into_ref()];
        ensure_children(&roots, "items");
        (roots, b)
    }

    #[test]
    fn test_text_query_regex() {
        let regex = Query::from("a.b").to_regex().unwrap();
        assert!(regex.is_match("xA.By"));
        assert!(!regex.is_match("axb"));

        let accented = Query::from("Été").to_regex().unwrap();
        assert!(accented.is_match("ete"));

        assert!(Query::from("").to_regex().is_none());
    }

    #[test]
    fn test_unfiltered_hides_collapsed_children() {
        let (roots, b) = sample();
        b.set_collapsed(true);
        let result = visible_unfiltered(&roots, false);
        assert_eq!(names(&result.visible), vec!["A", "B", "E"]);
    }

    #[test]
    fn test_filtered_expands_matching_parent() {
        let (roots, b) = sample();
        b.set_collapsed(true);
        let regex = Query::from("d").to_regex().unwrap();

        let result = visible_filtered(&roots, SearchMatcher::new(&regex, None), false, true);
        assert_eq!(names(&result.visible), vec!["B", "Dé"]);
        assert!(!b.is_collapsed());
    }

    #[test]
    fn test_filtered_keeps_collapsed_without_expand() {
        let (roots, b) = sample();
        b.set_collapsed(true);
        let regex = Query::from("d").to_regex().unwrap();

        let result = visible_filtered(&roots, SearchMatcher::new(&regex, None), false, false);
        assert_eq!(names(&result.visible), vec!["B"]);
        assert!(b.is_collapsed());
    }

    #[test]
    fn test_filtered_collects_unmatched_selection() {
        let (roots, _) = sample();
        roots[0].set_selected(true);
        let regex = Query::from("E").to_regex().unwrap();

        let result = visible_filtered(&roots, SearchMatcher::new(&regex, None), false, true);
        assert_eq!(names(&result.visible), vec!["B", "Dé", "E"]);
        assert_eq!(names(&result.selected), vec!["A"]);
    }

    #[test]
    fn test_filtered_on_search_field() {
        let roots = vec![
            Item::new(json!({"displayName": "one", "code": "X1"})).into_ref(),
            Item::new(json!({"displayName": "two", "code": "Y2"})).into_ref(),
        ];
        let regex = Query::from("y").to_regex().unwrap();
        let field = FieldAccessor::path("code");

        let result = visible_filtered(&roots, SearchMatcher::new(&regex, Some(&field)), false, true);
        assert_eq!(names(&result.visible), vec!["two"]);
    }

    #[test]
    fn test_filtered_no_match_is_empty() {
        let (roots, _) = sample();
        let regex = Query::from("zzz").to_regex().unwrap();
        let result = visible_filtered(&roots, SearchMatcher::new(&regex, None), false, true);
        assert!(result.visible.is_empty());
    }
}
