//! Drag-and-drop reordering.
//!
//! While a drag is in progress the view shows a private copy of the visible
//! list in which the dragged item and its visible descendants (the dragged
//! block) have been moved to the hovered position. [`DragSession`] holds
//! that copy and is updated incrementally on every hover.
//!
//! [`constrain_target_index`] snaps a raw hover index to a position that
//! keeps the dragged block among its siblings, and [`commit`] applies the
//! preview to the underlying tree.

use std::sync::Arc;

use horizon_itemlist_core::logging::targets;

use super::item::{ChildList, ItemRef, find_in_tree};
use crate::error::{ItemListError, Result};

/// The live preview of a drag in progress.
#[derive(Debug, Clone)]
pub struct DragSession {
    list: Vec<ItemRef>,
    current_index: usize,
    child_count: usize,
}

impl DragSession {
    /// Starts a drag of the row at `start` in `visible`.
    ///
    /// Returns `None` when `start` is out of range.
    pub fn start(visible: &[ItemRef], start: usize) -> Option<Self> {
        let dragged = visible.get(start)?;
        let mut last = start;
        if let Some(depth) = dragged.depth() {
            for (index, row) in visible.iter().enumerate().skip(start + 1) {
                if row.depth().is_some_and(|d| d <= depth) {
                    break;
                }
                last = index;
            }
        }
        Some(Self {
            list: visible.to_vec(),
            current_index: start,
            child_count: last - start + 1,
        })
    }

    /// Moves the dragged block so that it starts at `target`.
    pub fn move_to(&mut self, target: usize) {
        let end = (self.current_index + self.child_count).min(self.list.len());
        let block: Vec<ItemRef> = self.list.drain(self.current_index..end).collect();

        let mut target = target;
        if target > self.current_index {
            target = (target + 1).saturating_sub(self.child_count);
        }
        let target = target.min(self.list.len());

        self.current_index = target;
        self.list.splice(target..target, block);
    }

    /// The reordered preview.
    pub fn list(&self) -> &[ItemRef] {
        &self.list
    }

    /// Where the dragged block currently starts.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Size of the dragged block.
    pub fn child_count(&self) -> usize {
        self.child_count
    }

    /// The dragged item.
    pub fn dragged(&self) -> Option<&ItemRef> {
        self.list.get(self.current_index)
    }
}

fn depth_of(list: &[ItemRef], index: usize) -> Option<usize> {
    list.get(index).and_then(|item| item.depth())
}

/// Snaps `target` to a drop position for the row at `start`.
///
/// Moving up, the result is the first row at the dragged depth at or after
/// `target` (or the row after a would-be parent). Moving down, the row at the
/// dragged depth after `target` (or the row before a would-be parent). When
/// no such row exists the drag stays at `start`.
pub fn constrain_target_index(list: &[ItemRef], start: usize, target: usize) -> usize {
    if list.is_empty() {
        return 0;
    }
    if start >= list.len() {
        return list.len() - 1;
    }

    let Some(depth) = list[start].depth() else {
        return start;
    };
    if target == start {
        return start;
    }
    let parent_depth = depth.checked_sub(1);

    if target < start {
        let before = (0..start)
            .rev()
            .find(|&b| depth_of(list, b).is_some_and(|d| d <= depth))
            .unwrap_or(0);
        if target <= before {
            for a in target..=before {
                let d = depth_of(list, a);
                if d == Some(depth) {
                    return a;
                }
                if d.is_some() && d == parent_depth {
                    return a + 1;
                }
            }
        }
        return start;
    }

    let after = (start + 1..list.len())
        .find(|&a| depth_of(list, a).is_some_and(|d| d <= depth))
        .unwrap_or(list.len() - 1);
    if target >= after {
        for a in target + 1..list.len() {
            let d = depth_of(list, a);
            if d == Some(depth) {
                return a;
            }
            if d.is_some() && d == parent_depth {
                return a - 1;
            }
        }
        if depth_of(list, after) == Some(depth) {
            return after;
        }
    }
    start
}

/// Applies a drag preview to the item tree rooted at `roots`.
///
/// The dragged item is reinserted after the row that precedes it in the
/// preview, under that row's parent at the dragged item's depth. `flat` is
/// the full flat list, used to find siblings hidden by a filter.
///
/// Group nodes only exist in the derived list, so a drop inside a group moves
/// the item next to its new neighbour in the caller's containers. Returns
/// `Ok(false)`, leaving the tree untouched, when the drop has no counterpart
/// there (a dragged group node, or an empty target group).
pub fn commit(roots: &ChildList, flat: &[ItemRef], session: &DragSession) -> Result<bool> {
    let item = session.dragged().ok_or(ItemListError::InvalidDragInfo)?;
    if item.is_group() {
        tracing::debug!(target: targets::DRAG, "group nodes cannot be dropped");
        return Ok(false);
    }
    let depth = item.depth();
    let parent_depth = depth.and_then(|d| d.checked_sub(1));

    let mut target_parent: Option<ItemRef> = None;
    let mut target_index = 0;
    let previous = session
        .current_index
        .checked_sub(1)
        .and_then(|i| session.list.get(i));
    if let Some(previous) = previous {
        let position = flat.iter().position(|row| Arc::ptr_eq(row, previous));
        if let Some(position) = position {
            for index in (0..=position).rev() {
                let row = &flat[index];
                match row.depth() {
                    None => {
                        target_index = index;
                        break;
                    }
                    Some(d) if Some(d) == parent_depth => {
                        target_parent = Some(row.clone());
                        break;
                    }
                    Some(d) if Some(d) == depth => target_index += 1,
                    Some(_) => {}
                }
            }
        }
    }

    if let Some(group) = target_parent.as_ref().filter(|parent| parent.is_group()) {
        return commit_into_group(roots, item, group, target_index);
    }

    let target_list = match &target_parent {
        Some(parent) => parent.children().ok_or(ItemListError::InvalidDragInfo)?,
        None => Arc::clone(roots),
    };
    let (origin, origin_index) = find_in_tree(item, roots).ok_or(ItemListError::ItemNotFound)?;
    origin.write().remove(origin_index);
    if target_index > origin_index && Arc::ptr_eq(&origin, &target_list) {
        target_index -= 1;
    }

    let mut list = target_list.write();
    let target_index = target_index.min(list.len());
    list.insert(target_index, item.clone());

    tracing::debug!(
        target: targets::DRAG,
        from = origin_index,
        to = target_index,
        reparented = !Arc::ptr_eq(&origin, &target_list),
        "drag committed"
    );
    Ok(true)
}

/// Drops `item` at `target_index` among the members of `group`, anchoring
/// the move on the neighbouring member in the caller's containers.
fn commit_into_group(
    roots: &ChildList,
    item: &ItemRef,
    group: &ItemRef,
    target_index: usize,
) -> Result<bool> {
    let members = group.child_items().unwrap_or_default();
    let mut target_index = target_index;
    if let Some(own) = members.iter().position(|m| Arc::ptr_eq(m, item)) {
        if target_index > own {
            target_index -= 1;
        }
    }
    let siblings: Vec<ItemRef> = members.into_iter().filter(|m| !Arc::ptr_eq(m, item)).collect();
    let target_index = target_index.min(siblings.len());

    let (anchor, after) = match target_index.checked_sub(1).and_then(|i| siblings.get(i)) {
        Some(previous) => (previous.clone(), true),
        None => match siblings.first() {
            Some(first) => (first.clone(), false),
            None => return Ok(false),
        },
    };

    let (origin, origin_index) = find_in_tree(item, roots).ok_or(ItemListError::ItemNotFound)?;
    if find_in_tree(&anchor, roots).is_none() {
        return Err(ItemListError::ItemNotFound);
    }
    origin.write().remove(origin_index);
    let (target_list, anchor_index) =
        find_in_tree(&anchor, roots).ok_or(ItemListError::ItemNotFound)?;
    let index = if after { anchor_index + 1 } else { anchor_index };
    target_list.write().insert(index, item.clone());

    tracing::debug!(
        target: targets::DRAG,
        from = origin_index,
        to = index,
        "drag committed inside a group"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::accessor::item_text;
    use crate::model::flatten::flatten;
    use crate::model::grouping::{GroupInfo, group_items};
    use crate::model::item::{Item, child_list, ensure_children};
    use serde_json::json;

    fn names(list: &[ItemRef]) -> Vec<String> {
        list.iter().map(|i| item_text(i, None)).collect()
    }

    fn roots(labels: &[&str]) -> ChildList {
        child_list(labels.iter().map(|l| Item::labeled(*l).into_ref()).collect())
    }

    #[test]
    fn test_session_moves_block() {
        let b = Item::labeled("B")
            .with_children(vec![Item::labeled("C").into_ref(), Item::labeled("D").into_ref()])
            .into_ref();
        let items = vec![Item::labeled("A").into_ref(), b, Item::labeled("E").into_ref()];
        ensure_children(&items, "items");
        let flat = flatten(&items, false);

        let mut session = DragSession::start(&flat.visible, 1).unwrap();
        assert_eq!(session.child_count(), 3);

        session.move_to(4);
        assert_eq!(names(session.list()), vec!["A", "E", "B", "C", "D"]);
        assert_eq!(session.current_index(), 2);

        session.move_to(0);
        assert_eq!(names(session.list()), vec!["B", "C", "D", "A", "E"]);
    }

    #[test]
    fn test_start_out_of_range() {
        let items = roots(&["A"]);
        let flat = flatten(&items.read(), false);
        assert!(DragSession::start(&flat.visible, 3).is_none());
    }

    #[test]
    fn test_constrain_target_index() {
        let b = Item::labeled("B")
            .with_children(vec![Item::labeled("C").into_ref(), Item::labeled("D").into_ref()])
            .into_ref();
        let items = vec![Item::labeled("A").into_ref(), b, Item::labeled("E").into_ref()];
        ensure_children(&items, "items");
        let visible = flatten(&items, false).visible;

        // Roots snap to roots.
        assert_eq!(constrain_target_index(&visible, 4, 1), 1);
        // Children move among their siblings.
        assert_eq!(constrain_target_index(&visible, 3, 2), 2);
        assert_eq!(constrain_target_index(&visible, 2, 4), 3);
        // Out of range start.
        assert_eq!(constrain_target_index(&visible, 9, 0), 4);
        // Same position.
        assert_eq!(constrain_target_index(&visible, 2, 2), 2);
    }

    #[test]
    fn test_commit_reorders_roots() {
        let items = roots(&["A", "B", "C", "D", "E"]);
        let flat = flatten(&items.read(), false);

        let mut session = DragSession::start(&flat.visible, 4).unwrap();
        session.move_to(1);
        assert_eq!(names(session.list()), vec!["A", "E", "B", "C", "D"]);

        assert!(commit(&items, &flat.flat, &session).unwrap());
        assert_eq!(names(&items.read()), vec!["A", "E", "B", "C", "D"]);
    }

    #[test]
    fn test_commit_moves_down_in_same_list() {
        let items = roots(&["A", "B", "C"]);
        let flat = flatten(&items.read(), false);

        let mut session = DragSession::start(&flat.visible, 0).unwrap();
        session.move_to(2);
        assert_eq!(names(session.list()), vec!["B", "C", "A"]);

        assert!(commit(&items, &flat.flat, &session).unwrap());
        assert_eq!(names(&items.read()), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_commit_within_children() {
        let b = Item::labeled("B")
            .with_children(vec![Item::labeled("C").into_ref(), Item::labeled("D").into_ref()])
            .into_ref();
        let items = child_list(vec![Item::labeled("A").into_ref(), b.clone()]);
        ensure_children(&items.read(), "items");
        let flat = flatten(&items.read(), false);

        let mut session = DragSession::start(&flat.visible, 3).unwrap();
        session.move_to(2);
        assert_eq!(names(session.list()), vec!["A", "B", "D", "C"]);

        assert!(commit(&items, &flat.flat, &session).unwrap());
        assert_eq!(names(&b.child_items().unwrap()), vec!["D", "C"]);
        assert_eq!(names(&items.read()), vec!["A", "B"]);
    }

    #[test]
    fn test_commit_inside_group_keeps_every_item() {
        let member = |name: &str, key: &str| Item::new(json!({"displayName": name, "g": key})).into_ref();
        let items = child_list(vec![member("x1", "a"), member("y", "b"), member("x2", "a")]);
        let grouped = group_items(&items.read(), &[GroupInfo::new("g")]);
        let flat = flatten(&grouped, false);
        assert_eq!(names(&flat.visible), vec!["a", "x1", "x2", "b", "y"]);

        let mut session = DragSession::start(&flat.visible, 2).unwrap();
        session.move_to(1);
        assert!(commit(&items, &flat.flat, &session).unwrap());
        assert_eq!(names(&items.read()), vec!["x2", "x1", "y"]);

        // Group rows have no counterpart in the caller's items.
        let mut session = DragSession::start(&flat.visible, 3).unwrap();
        session.move_to(1);
        assert!(!commit(&items, &flat.flat, &session).unwrap());
        assert_eq!(names(&items.read()), vec!["x2", "x1", "y"]);
    }
}
