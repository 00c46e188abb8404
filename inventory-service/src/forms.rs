use crate::model::{DaoError, ItemInput, ValidateError};

use rocket::fs::TempFile;
use rocket::tokio::io::AsyncReadExt;

#[derive(Debug, FromForm)]
pub struct BoxForm {
    pub box_identifier: String,
    pub location: String,
}

#[derive(Debug, FromForm)]
pub struct ItemForm<'r> {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    /// A cleared or unparsable price field comes through as `None`.
    pub price: Option<f64>,
    pub image: Option<TempFile<'r>>,
}

impl<'r> ItemForm<'r> {
    /// Reads the uploaded image (if any) fully into memory.
    pub async fn into_input(self) -> Result<ItemInput, DaoError> {
        let image = match &self.image {
            Some(file) if file.len() > 0 => Some(read_upload(file).await?),
            _ => None,
        };

        Ok(ItemInput {
            name: self.name,
            category: self.category,
            description: self.description.filter(|d| !d.is_empty()),
            price: self.price,
            image,
        })
    }
}

pub async fn read_upload(file: &TempFile<'_>) -> Result<Vec<u8>, DaoError> {
    let accepted = file
        .content_type()
        .map_or(false, |ct| ct.is_png() || ct.is_jpeg());

    if !accepted {
        return Err(DaoError::from(ValidateError::InvalidImageTypeErr));
    }

    let mut bytes = Vec::with_capacity(file.len() as usize);
    let reader = file.open().await?;
    rocket::tokio::pin!(reader);
    reader.read_to_end(&mut bytes).await?;

    Ok(bytes)
}
