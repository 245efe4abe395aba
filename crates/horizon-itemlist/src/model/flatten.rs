//! Flattening of item trees.
//!
//! A pre-order depth-first walk turns the (grouped) tree into a flat list,
//! assigning each item its depth and alternating-row flag. The same pass
//! derives the unfiltered visible list and collects selected items.

use super::item::ItemRef;

/// Output of [`flatten`].
#[derive(Debug, Default)]
pub struct FlatResult {
    /// Every item in pre-order.
    pub flat: Vec<ItemRef>,
    /// The subset of `flat` shown without a filter.
    pub visible: Vec<ItemRef>,
    /// Items flagged selected, in traversal order.
    pub selected: Vec<ItemRef>,
    /// Deepest depth reached, 0 when no item is a node.
    pub depth_max: usize,
}

/// Returns `true` if an item is hidden by its own flags.
pub(crate) fn hides_itself(item: &ItemRef, hide_selected: bool) -> bool {
    let state = item.state();
    !state.visible || (state.selected && hide_selected)
}

struct Walker {
    hide_selected: bool,
    odd: bool,
    is_tree: bool,
    result: FlatResult,
}

impl Walker {
    fn walk(&mut self, items: &[ItemRef], depth: usize, hidden: bool) {
        for item in items {
            item.set_depth(depth);
            self.result.depth_max = self.result.depth_max.max(depth);
            self.result.flat.push(item.clone());

            if !hidden && !hides_itself(item, self.hide_selected) {
                item.set_odd(self.odd);
                self.odd = !self.odd;
                self.result.visible.push(item.clone());
            }

            if item.is_selected() {
                self.result.selected.push(item.clone());
            }

            if let Some(children) = item.child_items() {
                self.is_tree = true;
                self.odd = false;
                let state = item.state();
                let hide_children = hidden || state.collapsed || !state.visible;
                self.walk(&children, depth + 1, hide_children);
            }
        }
    }
}

/// Flattens `items` (roots at depth 0).
pub fn flatten(items: &[ItemRef], hide_selected: bool) -> FlatResult {
    let mut walker = Walker {
        hide_selected,
        odd: false,
        is_tree: false,
        result: FlatResult::default(),
    };
    walker.walk(items, 0, false);
    if !walker.is_tree {
        walker.result.depth_max = 0;
    }
    walker.result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::accessor::item_text;
    use crate::model::item::{Item, ensure_children};

    fn names(list: &[ItemRef]) -> Vec<String> {
        list.iter().map(|i| item_text(i, None)).collect()
    }

    fn sample() -> (Vec<ItemRef>, ItemRef) {
        let b = Item::labeled("B")
            .with_children(vec![Item::labeled("C").into_ref(), Item::labeled("D").into_ref()])
            .into_ref();
        let roots = vec![Item::labeled("A").into_ref(), b.clone(), Item::labeled("E").into_ref()];
        ensure_children(&roots, "items");
        (roots, b)
    }

    #[test]
    fn test_flatten_pre_order_and_depth() {
        let (roots, _) = sample();
        let result = flatten(&roots, false);

        assert_eq!(names(&result.flat), vec!["A", "B", "C", "D", "E"]);
        let depths: Vec<_> = result.flat.iter().map(|i| i.depth()).collect();
        assert_eq!(depths, vec![Some(0), Some(0), Some(1), Some(1), Some(0)]);
        assert_eq!(result.depth_max, 1);
        assert_eq!(names(&result.visible), names(&result.flat));
    }

    #[test]
    fn test_flatten_collapsed_node() {
        let (roots, b) = sample();
        b.set_collapsed(true);
        let result = flatten(&roots, false);

        assert_eq!(result.flat.len(), 5);
        assert_eq!(names(&result.visible), vec!["A", "B", "E"]);
    }

    #[test]
    fn test_flatten_odd_resets_per_child_run() {
        let (roots, _) = sample();
        let result = flatten(&roots, false);
        let odd: Vec<bool> = result.visible.iter().map(|i| i.is_odd()).collect();
        // A, B alternate; the child run C, D restarts; E continues after D.
        assert_eq!(odd, vec![false, true, false, true, false]);
    }

    #[test]
    fn test_flatten_hide_selected_and_selection() {
        let (roots, _) = sample();
        roots[0].set_selected(true);
        let result = flatten(&roots, true);

        assert_eq!(names(&result.selected), vec!["A"]);
        assert_eq!(names(&result.visible), vec!["B", "C", "D", "E"]);
    }

    #[test]
    fn test_flatten_without_nodes() {
        let roots = vec![Item::labeled("x").into_ref(), Item::labeled("y").into_ref()];
        let result = flatten(&roots, false);
        assert_eq!(result.depth_max, 0);
        assert_eq!(result.flat.len(), 2);
    }
}
