//! Tests for selection tracking through an item-list view.

use std::sync::Arc;

use serde_json::json;

use horizon_itemlist::{
    Deferred, Item, ItemListError, ItemListView, ItemRef, ListViewConfig, ViewRequest,
};

fn label(item: &ItemRef) -> String {
    item.model()["displayName"].as_str().unwrap_or_default().to_string()
}

fn labels(items: &[ItemRef]) -> Vec<String> {
    items.iter().map(label).collect()
}

async fn five_rows() -> ItemListView {
    let view = ItemListView::new();
    view.set_items_now(
        ["A", "B", "C", "D", "E"]
            .into_iter()
            .map(|name| Item::labeled(name).into_ref())
            .collect(),
    );
    view.get_view_list(&ViewRequest::new()).await.unwrap();
    view
}

#[tokio::test]
async fn test_select_range() {
    let view = five_rows().await;

    assert_eq!(view.select_range(1, Some(3)).await.unwrap(), 3);
    assert_eq!(labels(&view.selected_items()), vec!["B", "C", "D"]);

    // A new range replaces the previous one.
    assert_eq!(view.select_range(4, Some(3)).await.unwrap(), 2);
    assert_eq!(labels(&view.selected_items()), vec!["D", "E"]);

    let visible = view.visible_list().unwrap();
    let flags: Vec<_> = visible.iter().map(|item| item.is_selected()).collect();
    assert_eq!(flags, vec![false, false, false, true, true]);
}

#[tokio::test]
async fn test_select_range_single_row_and_clamping() {
    let view = five_rows().await;

    assert_eq!(view.select_range(2, None).await.unwrap(), 1);
    assert_eq!(labels(&view.selected_items()), vec!["C"]);

    assert_eq!(view.select_range(3, Some(99)).await.unwrap(), 2);
    assert_eq!(labels(&view.selected_items()), vec!["D", "E"]);
}

#[tokio::test]
async fn test_select_range_skips_unselectable_rows() {
    let view = ItemListView::new();
    view.set_items_now(vec![
        Item::labeled("A").into_ref(),
        Item::labeled("B").with_selectable(false).into_ref(),
        Item::labeled("C").into_ref(),
    ]);
    view.get_view_list(&ViewRequest::new()).await.unwrap();

    assert_eq!(view.select_range(0, Some(2)).await.unwrap(), 2);
    assert_eq!(labels(&view.selected_items()), vec!["A", "C"]);
}

#[tokio::test]
async fn test_select_range_requires_visible_list() {
    let view = ItemListView::new();
    view.set_items_now(vec![Item::labeled("A").into_ref()]);

    assert_eq!(
        view.select_range(0, None).await,
        Err(ItemListError::EmptyCache("select_range"))
    );
}

#[tokio::test]
async fn test_select_item_is_idempotent() {
    let view = five_rows().await;
    let b = view.item_at(1).unwrap();

    view.select_item(b.clone()).await.unwrap();
    view.select_item(b.clone()).await.unwrap();
    assert_eq!(view.selected_items().len(), 1);
    assert!(b.is_selected());

    view.unselect_item(b.clone()).await.unwrap();
    assert!(view.selected_items().is_empty());
    assert!(!b.is_selected());
}

#[tokio::test]
async fn test_before_select_veto() {
    let view = five_rows().await;
    view.set_before_select(|item| {
        if label(&item) == "C" {
            Deferred::cancelled()
        } else {
            Deferred::ready(item)
        }
    });

    let rows = view.visible_list().unwrap();
    let selected = view.select_items(vec![rows[1].clone(), rows[2].clone()]).await;
    assert_eq!(labels(&selected), vec!["B"]);
    assert_eq!(labels(&view.selected_items()), vec!["B"]);
    assert!(!rows[2].is_selected());

    view.clear_hooks();
    view.select_item(rows[2].clone()).await.unwrap();
    assert_eq!(labels(&view.selected_items()), vec!["B", "C"]);
}

#[tokio::test]
async fn test_unselect_all_keeps_vetoed_items() {
    let view = five_rows().await;
    let rows = view.visible_list().unwrap();
    view.select_items(vec![rows[1].clone(), rows[3].clone()]).await;

    view.set_before_unselect(|item| {
        if label(&item) == "B" {
            Deferred::cancelled()
        } else {
            Deferred::ready(item)
        }
    });

    let unselected = view.unselect_all().await;
    assert_eq!(labels(&unselected), vec!["D"]);
    assert_eq!(labels(&view.selected_items()), vec!["B"]);
    assert!(rows[1].is_selected());
    assert!(!rows[3].is_selected());
}

#[tokio::test]
async fn test_toggle_select() {
    let view = five_rows().await;
    let rows = view.visible_list().unwrap();

    let selection = view.toggle_select(vec![rows[0].clone(), rows[4].clone()], true).await;
    assert_eq!(labels(&selection), vec!["A", "E"]);

    let selection = view.toggle_select(vec![rows[0].clone()], false).await;
    assert_eq!(labels(&selection), vec!["E"]);
}

#[tokio::test]
async fn test_selection_survives_reload() {
    let config = ListViewConfig {
        value_field: Some("id".to_string()),
        ..Default::default()
    };
    let view = ItemListView::with_config(config);
    let make = |id: u32| Item::new(json!({"id": id, "displayName": format!("item {id}")})).into_ref();

    let old: Vec<ItemRef> = (1..=3).map(make).collect();
    view.set_items_now(old.clone());
    view.select_item(old[1].clone()).await.unwrap();

    let fresh: Vec<ItemRef> = (1..=3).map(make).collect();
    view.set_items_now(fresh.clone());

    let selected = view.selected_items();
    assert_eq!(selected.len(), 1);
    assert!(Arc::ptr_eq(&selected[0], &fresh[1]));
    assert!(fresh[1].is_selected());
    assert!(!old[1].is_selected());
}

#[tokio::test]
async fn test_selection_rebuilt_from_flags() {
    let view = ItemListView::new();
    view.set_items_now(vec![
        Item::labeled("A").into_ref(),
        Item::labeled("B")
            .with_children(vec![Item::labeled("C").with_selected(true).into_ref()])
            .into_ref(),
    ]);

    view.get_view_list(&ViewRequest::new()).await.unwrap();
    assert_eq!(labels(&view.selected_items()), vec!["C"]);
}

#[tokio::test]
async fn test_set_selected_items_and_ensure_selection() {
    let view = five_rows().await;
    let rows = view.visible_list().unwrap();
    view.select_item(rows[0].clone()).await.unwrap();

    view.set_selected_items(vec![rows[2].clone()]);
    assert!(!rows[0].is_selected());
    assert!(rows[2].is_selected());
    assert_eq!(labels(&view.ensure_selection()), vec!["C"]);
}

#[tokio::test]
async fn test_ensure_selection_ignores_lookalike_items() {
    let view = ItemListView::new();
    let first = Item::labeled("John").into_ref();
    let twin = Item::labeled("John").into_ref();
    view.set_items_now(vec![first.clone(), twin.clone()]);

    view.select_item(first.clone()).await.unwrap();
    let selection = view.ensure_selection();

    assert_eq!(selection.len(), 1);
    assert!(Arc::ptr_eq(&selection[0], &first));
    assert!(!twin.is_selected());
    assert!(!view.compare_items(&first, &twin));
}
