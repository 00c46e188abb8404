//! Editable grid binding for boxes and items.
//!
//! A grid is described by a static column list. The page renders one row per
//! record and posts a single [`GridEvent`] back whenever the user selects a
//! row or edits a cell.

use crate::db::DbOps;
use crate::model::{update_box, update_item, DaoError, Item, StorageBox};
use crate::view::Selection;

use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum GridEvent<R> {
    /// `None` when the current row was deselected.
    SelectionChanged(Option<R>),
    CellValueChanged(R),
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GridColumn {
    pub field: &'static str,
    pub header: &'static str,
    pub hide: bool,
    pub editable: bool,
    pub numeric: bool,
    pub nullable: bool,
    pub thumbnail: bool,
}

impl GridColumn {
    const fn hidden(field: &'static str) -> GridColumn {
        GridColumn {
            field,
            header: field,
            hide: true,
            editable: false,
            numeric: false,
            nullable: false,
            thumbnail: false,
        }
    }

    const fn editable(field: &'static str, header: &'static str) -> GridColumn {
        GridColumn {
            field,
            header,
            hide: false,
            editable: true,
            numeric: false,
            nullable: false,
            thumbnail: false,
        }
    }

    const fn numeric(self) -> GridColumn {
        GridColumn {
            numeric: true,
            nullable: true,
            ..self
        }
    }

    /// An emptied cell is sent back as `null`.
    const fn nullable(self) -> GridColumn {
        GridColumn {
            nullable: true,
            ..self
        }
    }

    const fn thumbnail(field: &'static str, header: &'static str) -> GridColumn {
        GridColumn {
            field,
            header,
            hide: false,
            editable: false,
            numeric: false,
            nullable: false,
            thumbnail: true,
        }
    }
}

pub const BOX_COLUMNS: &[GridColumn] = &[
    GridColumn::hidden("id"),
    GridColumn::editable("box_identifier", "Box Identifier"),
    GridColumn::editable("location", "Location"),
];

pub const ITEM_COLUMNS: &[GridColumn] = &[
    GridColumn::hidden("id"),
    GridColumn::hidden("box_id"),
    GridColumn::editable("name", "Name"),
    GridColumn::editable("category", "Category"),
    GridColumn::editable("description", "Description").nullable(),
    GridColumn::editable("price", "Price").numeric(),
    GridColumn::thumbnail("image", "Image"),
];

pub trait GridRecord: Serialize {
    const COLUMNS: &'static [GridColumn];

    fn row_id(&self) -> i32;

    fn cell_text(&self, field: &str) -> String;

    fn thumbnail_url(&self) -> Option<String> {
        None
    }
}

impl GridRecord for StorageBox {
    const COLUMNS: &'static [GridColumn] = BOX_COLUMNS;

    fn row_id(&self) -> i32 {
        self.id
    }

    fn cell_text(&self, field: &str) -> String {
        match field {
            "box_identifier" => self.box_identifier.clone(),
            "location" => self.location.clone(),
            _ => String::new(),
        }
    }
}

impl GridRecord for Item {
    const COLUMNS: &'static [GridColumn] = ITEM_COLUMNS;

    fn row_id(&self) -> i32 {
        self.id
    }

    fn cell_text(&self, field: &str) -> String {
        match field {
            "name" => self.name.clone(),
            "category" => self.category.clone(),
            "description" => self.description.clone().unwrap_or_default(),
            "price" => self.price.map(|p| p.to_string()).unwrap_or_default(),
            _ => String::new(),
        }
    }

    fn thumbnail_url(&self) -> Option<String> {
        if self.has_image() {
            Some(format!("/api/v1/items/{}/image", self.id))
        } else {
            None
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GridCell {
    pub field: &'static str,
    pub value: String,
    pub editable: bool,
    pub numeric: bool,
    pub nullable: bool,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GridRow {
    pub id: i32,
    pub selected: bool,
    /// The whole record as JSON, hidden columns included. Edits are layered
    /// on top of it before a `cellValueChanged` is sent.
    pub data: String,
    pub cells: Vec<GridCell>,
}

/// Rows shown per grid page.
pub const PAGE_SIZE: usize = 10;

/// Number of pages needed for `len` rows. An empty grid still has one page.
pub fn page_count(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE).max(1)
}

#[derive(Debug, Serialize)]
pub struct Grid {
    pub event_url: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<GridRow>,
    /// 1-based page currently shown.
    pub page: usize,
    pub pages: usize,
    pub paged: bool,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl Grid {
    /// Builds the rows of one page. A page past either end is clamped to the
    /// first or last page; the page actually shown is in `Grid::page`.
    pub fn build<R: GridRecord>(
        records: &[R],
        selected: Option<i32>,
        page: Option<usize>,
    ) -> Result<Grid, DaoError> {
        let visible: Vec<&GridColumn> = R::COLUMNS.iter().filter(|c| !c.hide).collect();

        let pages = page_count(records.len());
        let page = page.unwrap_or(1).clamp(1, pages);

        let mut rows = Vec::with_capacity(PAGE_SIZE);
        for record in records.iter().skip((page - 1) * PAGE_SIZE).take(PAGE_SIZE) {
            let cells = visible
                .iter()
                .map(|c| GridCell {
                    field: c.field,
                    value: if c.thumbnail {
                        String::new()
                    } else {
                        record.cell_text(c.field)
                    },
                    editable: c.editable,
                    numeric: c.numeric,
                    nullable: c.nullable,
                    thumbnail: if c.thumbnail {
                        record.thumbnail_url()
                    } else {
                        None
                    },
                })
                .collect();

            rows.push(GridRow {
                id: record.row_id(),
                selected: selected == Some(record.row_id()),
                data: serde_json::to_string(record)?,
                cells,
            });
        }

        Ok(Grid {
            event_url: String::new(),
            headers: visible.iter().map(|c| c.header).collect(),
            rows,
            page,
            pages,
            paged: pages > 1,
            prev_url: None,
            next_url: None,
        })
    }

    /// Points the grid at its event endpoint and fills in the pager links.
    pub fn link(mut self, event_url: String, page_url: impl Fn(usize) -> String) -> Grid {
        self.event_url = event_url;
        self.prev_url = (self.page > 1).then(|| page_url(self.page - 1));
        self.next_url = (self.page < self.pages).then(|| page_url(self.page + 1));
        self
    }
}

/// Applies one box-grid event and returns where the page should go next.
/// A cell edit saves the row and starts over with nothing selected. The box
/// grid stays on its page either way.
pub fn apply_box_event(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
    selection: Selection,
    event: GridEvent<StorageBox>,
) -> Result<Selection, DaoError> {
    let unselected = Selection {
        box_page: selection.box_page,
        ..Selection::default()
    };

    match event {
        GridEvent::SelectionChanged(Some(row)) => {
            debug!(box_id = row.id, "box selected");
            Ok(Selection {
                box_id: Some(row.id),
                ..unselected
            })
        }
        GridEvent::SelectionChanged(None) => Ok(unselected),
        GridEvent::CellValueChanged(row) => {
            update_box(conn, dbops, row.id, &row.box_identifier, &row.location)?;
            Ok(unselected)
        }
    }
}

/// Applies one item-grid event. The owning box stays selected.
pub fn apply_item_event(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
    selection: Selection,
    event: GridEvent<Item>,
) -> Result<Selection, DaoError> {
    match event {
        GridEvent::SelectionChanged(Some(row)) => {
            debug!(item_id = row.id, "item selected");
            Ok(Selection {
                item_id: Some(row.id),
                ..selection
            })
        }
        GridEvent::SelectionChanged(None) => Ok(selection.without_item()),
        GridEvent::CellValueChanged(row) => {
            let id = row.id;
            update_item(conn, dbops, id, row.into_input()?)?;
            Ok(selection.without_item())
        }
    }
}
