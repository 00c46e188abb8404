use crate::model::{Item, StorageBox};
use crate::schema::{boxes, items};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use std::result::Result;

#[derive(Clone, Copy)]
pub struct MainDbOps;

pub trait DbOps {
    fn insert_box(
        &self,
        b: &StorageBox,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<StorageBox>, diesel::result::Error>;

    fn load_boxes(&self, conn: &mut SqliteConnection) -> Result<Vec<StorageBox>, diesel::result::Error>;

    fn update_box(
        &self,
        b: &StorageBox,
        conn: &mut SqliteConnection,
    ) -> Result<usize, diesel::result::Error>;

    fn delete_box(
        &self,
        id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<usize, diesel::result::Error>;

    fn insert_item(
        &self,
        item: &Item,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Item>, diesel::result::Error>;

    fn load_items_box_id(
        &self,
        box_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Item>, diesel::result::Error>;

    fn load_item_id(
        &self,
        id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Item>, diesel::result::Error>;

    fn update_item(
        &self,
        item: &Item,
        conn: &mut SqliteConnection,
    ) -> Result<usize, diesel::result::Error>;

    fn delete_item(
        &self,
        id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<usize, diesel::result::Error>;
}

// Items may outlive their box and may name a box that is gone. Connections
// come out of diesel and the pool with enforcement switched on, so the two
// statements touching `items.box_id` switch it off first.
fn allow_orphans(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    conn.batch_execute("PRAGMA foreign_keys = OFF")
}

impl DbOps for MainDbOps {
    fn insert_box(
        &self,
        b: &StorageBox,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<StorageBox>, diesel::result::Error> {
        diesel::insert_into(boxes::table)
            .values((
                boxes::box_identifier.eq(&b.box_identifier),
                boxes::location.eq(&b.location),
            ))
            .get_results(conn)
    }

    fn load_boxes(&self, conn: &mut SqliteConnection) -> Result<Vec<StorageBox>, diesel::result::Error> {
        boxes::table.load::<StorageBox>(conn)
    }

    fn update_box(
        &self,
        b: &StorageBox,
        conn: &mut SqliteConnection,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(boxes::table.filter(boxes::id.eq(b.id)))
            .set((
                boxes::box_identifier.eq(&b.box_identifier),
                boxes::location.eq(&b.location),
            ))
            .execute(conn)
    }

    fn delete_box(
        &self,
        id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<usize, diesel::result::Error> {
        allow_orphans(conn)?;
        diesel::delete(boxes::table.filter(boxes::id.eq(id))).execute(conn)
    }

    fn insert_item(
        &self,
        item: &Item,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Item>, diesel::result::Error> {
        allow_orphans(conn)?;
        diesel::insert_into(items::table)
            .values((
                items::box_id.eq(item.box_id),
                items::name.eq(&item.name),
                items::category.eq(&item.category),
                items::description.eq(&item.description),
                items::price.eq(item.price),
                items::image.eq(&item.image),
            ))
            .get_results(conn)
    }

    fn load_items_box_id(
        &self,
        box_id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Item>, diesel::result::Error> {
        items::table
            .filter(items::box_id.eq(box_id))
            .load::<Item>(conn)
    }

    fn load_item_id(
        &self,
        id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Item>, diesel::result::Error> {
        items::table
            .filter(items::id.eq(id))
            .load::<Item>(conn)
    }

    fn update_item(
        &self,
        item: &Item,
        conn: &mut SqliteConnection,
    ) -> Result<usize, diesel::result::Error> {
        diesel::update(items::table.filter(items::id.eq(item.id)))
            .set((
                items::name.eq(&item.name),
                items::category.eq(&item.category),
                items::description.eq(&item.description),
                items::price.eq(item.price),
                items::image.eq(&item.image),
            ))
            .execute(conn)
    }

    fn delete_item(
        &self,
        id: i32,
        conn: &mut SqliteConnection,
    ) -> Result<usize, diesel::result::Error> {
        diesel::delete(items::table.filter(items::id.eq(id))).execute(conn)
    }
}

/// Fresh in-memory database with the inventory schema applied.
#[cfg(test)]
pub fn memory_connection() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").expect("in-memory sqlite");
    crate::model::init_schema(&mut conn).expect("schema");
    conn
}
