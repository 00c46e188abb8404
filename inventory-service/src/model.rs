use crate::db::DbOps;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use diesel::prelude::*;
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde::{Deserialize, Serialize};
use std::error;
use std::fmt;
use std::fmt::Display;
use std::io;
use tracing::{debug, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Deserialize, Serialize, Queryable, Clone, PartialEq)]
pub struct StorageBox {
    #[serde(default)]
    pub id: i32,
    pub box_identifier: String,
    pub location: String,
}

/// A stored item. `image` holds the base64 text exactly as persisted.
#[derive(Debug, Deserialize, Serialize, Queryable, Clone, PartialEq)]
pub struct Item {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub box_id: i32,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
}

/// Mutable item fields as the user supplies them, with the image still raw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemInput {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, PartialEq)]
pub enum ValidateError {
    InvalidImageTypeErr,
}

impl Display for ValidateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ValidateError::InvalidImageTypeErr => {
                f.write_str("Image type is not supported! Upload a PNG or JPEG file!")
            }
        }
    }
}

impl error::Error for ValidateError {}

#[derive(Debug, PartialEq)]
pub enum DataError {
    ItemNotFoundErr,
    ImageNotFoundErr,
    InsertErr,
}

impl Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DataError::ItemNotFoundErr => f.write_str("Requested item is not found!"),
            DataError::ImageNotFoundErr => f.write_str("Requested item has no image!"),
            DataError::InsertErr => f.write_str("Failed to insert value!"),
        }
    }
}

impl error::Error for DataError {}

#[derive(Debug)]
pub enum DaoError {
    DieselError(diesel::result::Error),
    DataError(DataError),
    ValidateError(ValidateError),
    ImageError(base64::DecodeError),
    UploadError(io::Error),
    MigrationError(String),
    RenderError(serde_json::Error),
}

impl Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DaoError::DieselError(e) => f.write_str(e.to_string().as_str()),
            DaoError::DataError(e) => f.write_str(e.to_string().as_str()),
            DaoError::ValidateError(e) => f.write_str(e.to_string().as_str()),
            DaoError::ImageError(e) => write!(f, "Stored image is not valid base64: {}", e),
            DaoError::UploadError(e) => write!(f, "Failed to read uploaded image: {}", e),
            DaoError::MigrationError(e) => write!(f, "Failed to initialise schema: {}", e),
            DaoError::RenderError(e) => write!(f, "Failed to render grid row: {}", e),
        }
    }
}

impl error::Error for DaoError {}

impl From<diesel::result::Error> for DaoError {
    fn from(err: diesel::result::Error) -> DaoError {
        DaoError::DieselError(err)
    }
}

impl From<DataError> for DaoError {
    fn from(err: DataError) -> DaoError {
        DaoError::DataError(err)
    }
}

impl From<ValidateError> for DaoError {
    fn from(err: ValidateError) -> DaoError {
        DaoError::ValidateError(err)
    }
}

impl From<base64::DecodeError> for DaoError {
    fn from(err: base64::DecodeError) -> DaoError {
        DaoError::ImageError(err)
    }
}

impl From<io::Error> for DaoError {
    fn from(err: io::Error) -> DaoError {
        DaoError::UploadError(err)
    }
}

impl From<serde_json::Error> for DaoError {
    fn from(err: serde_json::Error) -> DaoError {
        DaoError::RenderError(err)
    }
}

impl DaoError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DaoError::DieselError(diesel::result::Error::NotFound)
                | DaoError::DataError(DataError::ItemNotFoundErr)
                | DaoError::DataError(DataError::ImageNotFoundErr)
        )
    }

    pub fn is_bad_input(&self) -> bool {
        matches!(self, DaoError::ValidateError(_) | DaoError::ImageError(_))
    }
}

pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_image(text: &str) -> Result<Vec<u8>, DaoError> {
    Ok(STANDARD.decode(text)?)
}

/// Decodes an image column value, treating NULL and "" alike as no image.
pub fn decode_stored_image(stored: Option<&str>) -> Result<Option<Vec<u8>>, DaoError> {
    stored
        .filter(|s| !s.is_empty())
        .map(decode_image)
        .transpose()
}

impl Item {
    fn from_input(id: i32, box_id: i32, input: ItemInput) -> Item {
        Item {
            id,
            box_id,
            name: input.name,
            category: input.category,
            description: input.description,
            price: input.price,
            image: input.image.as_deref().map(encode_image),
        }
    }

    /// Turns a row coming back from the grid into raw input, undoing the
    /// storage encoding of its image. An emptied description goes back to NULL.
    pub fn into_input(self) -> Result<ItemInput, DaoError> {
        let image = decode_stored_image(self.image.as_deref())?;

        Ok(ItemInput {
            name: self.name,
            category: self.category,
            description: self.description.filter(|d| !d.is_empty()),
            price: self.price,
            image,
        })
    }

    pub fn has_image(&self) -> bool {
        self.image.as_deref().map_or(false, |s| !s.is_empty())
    }
}

pub fn init_schema(conn: &mut SqliteConnection) -> Result<(), DaoError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DaoError::MigrationError(e.to_string()))?;

    info!(migrations = applied.len(), "inventory schema ready");

    Ok(())
}

pub fn list_boxes(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
) -> Result<Vec<StorageBox>, DaoError> {
    let boxes = dbops.load_boxes(conn)?;

    debug!(count = boxes.len(), "loaded boxes");

    Ok(boxes)
}

pub fn list_items(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
    box_id: i32,
) -> Result<Vec<Item>, DaoError> {
    let items = dbops.load_items_box_id(box_id, conn)?;

    debug!(box_id, count = items.len(), "loaded items");

    Ok(items)
}

pub fn get_item(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
    id: i32,
) -> Result<Item, DaoError> {
    let mut vec = dbops.load_item_id(id, conn)?;

    vec.pop().ok_or(DaoError::from(DataError::ItemNotFoundErr))
}

pub fn create_box(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
    box_identifier: &str,
    location: &str,
) -> Result<StorageBox, DaoError> {
    let b = StorageBox {
        id: 0,
        box_identifier: box_identifier.to_string(),
        location: location.to_string(),
    };

    let mut vec = dbops.insert_box(&b, conn)?;
    let created = vec.pop().ok_or(DaoError::from(DataError::InsertErr))?;

    info!(id = created.id, box_identifier, "box created");

    Ok(created)
}

pub fn create_item(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
    box_id: i32,
    input: ItemInput,
) -> Result<Item, DaoError> {
    let item = Item::from_input(0, box_id, input);

    let mut vec = dbops.insert_item(&item, conn)?;
    let created = vec.pop().ok_or(DaoError::from(DataError::InsertErr))?;

    info!(id = created.id, box_id, with_image = created.has_image(), "item created");

    Ok(created)
}

/// Overwrites a box in place. An unknown id affects nothing and is not an error.
pub fn update_box(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
    id: i32,
    box_identifier: &str,
    location: &str,
) -> Result<usize, DaoError> {
    let b = StorageBox {
        id,
        box_identifier: box_identifier.to_string(),
        location: location.to_string(),
    };

    let affected = dbops.update_box(&b, conn)?;

    info!(id, affected, "box updated");

    Ok(affected)
}

/// Overwrites every mutable item field, encoding the image the same way
/// `create_item` does. An unknown id affects nothing and is not an error.
pub fn update_item(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
    id: i32,
    input: ItemInput,
) -> Result<usize, DaoError> {
    // box_id is not part of the update set
    let item = Item::from_input(id, 0, input);

    let affected = dbops.update_item(&item, conn)?;

    info!(id, affected, with_image = item.has_image(), "item updated");

    Ok(affected)
}

/// Items of the deleted box are left in place with their old `box_id`.
pub fn delete_box(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
    id: i32,
) -> Result<usize, DaoError> {
    let affected = dbops.delete_box(id, conn)?;

    info!(id, affected, "box deleted");

    Ok(affected)
}

pub fn delete_item(
    conn: &mut SqliteConnection,
    dbops: impl DbOps,
    id: i32,
) -> Result<usize, DaoError> {
    let affected = dbops.delete_item(id, conn)?;

    info!(id, affected, "item deleted");

    Ok(affected)
}
