use crate::db::DbOps;
use crate::grid::Grid;
use crate::model::{list_boxes, list_items, DaoError, Item, StorageBox};

use diesel::SqliteConnection;
use serde::Serialize;

/// What the user has picked in the two grids, and which page each grid is
/// on. It rides along in the query string, so every request rebuilds the
/// page from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, FromForm)]
pub struct Selection {
    pub box_id: Option<i32>,
    pub item_id: Option<i32>,
    pub box_page: Option<usize>,
    pub item_page: Option<usize>,
}

// page 1 is the default and stays out of the query string
fn page_param(page: usize) -> Option<usize> {
    (page > 1).then_some(page)
}

impl Selection {
    pub fn of_box(box_id: i32) -> Selection {
        Selection {
            box_id: Some(box_id),
            ..Selection::default()
        }
    }

    pub fn without_item(self) -> Selection {
        Selection {
            item_id: None,
            ..self
        }
    }

    pub fn query(&self) -> String {
        let mut parts = Vec::new();

        // an item is only reachable through its box
        if let Some(box_id) = self.box_id {
            parts.push(format!("box_id={}", box_id));

            if let Some(item_id) = self.item_id {
                parts.push(format!("item_id={}", item_id));
            }
        }

        if let Some(page) = self.box_page {
            parts.push(format!("box_page={}", page));
        }

        if let (Some(_), Some(page)) = (self.box_id, self.item_page) {
            parts.push(format!("item_page={}", page));
        }

        parts.join("&")
    }

    /// `path` with this selection as its query string.
    pub fn href(&self, path: &str) -> String {
        match self.query().as_str() {
            "" => path.to_string(),
            q => format!("{}?{}", path, q),
        }
    }

    pub fn location(&self) -> String {
        self.href("/")
    }
}

#[derive(Debug, Serialize)]
pub struct InventoryView {
    pub boxes: Grid,
    pub selected_box: Option<StorageBox>,
    pub items: Option<Grid>,
    pub selected_item: Option<Item>,
    pub selection_query: String,
}

pub fn build_view(
    conn: &mut SqliteConnection,
    dbops: impl DbOps + Copy,
    requested: Selection,
) -> Result<InventoryView, DaoError> {
    let boxes = list_boxes(conn, dbops)?;

    let selected_box = requested
        .box_id
        .and_then(|id| boxes.iter().find(|b| b.id == id).cloned());

    let box_grid = Grid::build(&boxes, selected_box.as_ref().map(|b| b.id), requested.box_page)?;

    let mut selection = Selection {
        box_id: selected_box.as_ref().map(|b| b.id),
        box_page: page_param(box_grid.page),
        ..Selection::default()
    };

    let (item_grid, selected_item) = match &selected_box {
        Some(b) => {
            let items = list_items(conn, dbops, b.id)?;
            let selected_item = requested
                .item_id
                .and_then(|id| items.iter().find(|i| i.id == id).cloned());
            selection.item_id = selected_item.as_ref().map(|i| i.id);

            let grid = Grid::build(&items, selection.item_id, requested.item_page)?;
            selection.item_page = page_param(grid.page);

            (Some(grid), selected_item)
        }
        None => (None, None),
    };

    let boxes = box_grid.link(selection.href("/api/v1/grid/boxes"), |page| {
        Selection {
            box_page: page_param(page),
            ..selection
        }
        .location()
    });

    let items = item_grid.map(|grid| {
        grid.link(selection.href("/api/v1/grid/items"), |page| {
            Selection {
                item_page: page_param(page),
                ..selection
            }
            .location()
        })
    });

    Ok(InventoryView {
        boxes,
        selected_box,
        items,
        selected_item,
        selection_query: selection.query(),
    })
}
