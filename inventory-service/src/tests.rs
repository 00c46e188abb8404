use crate::model::{Item, StorageBox};

use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use serde::Deserialize;
use tempfile::TempDir;

const BOUNDARY: &str = "X-INVENTORY-BOUNDARY";
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d];

// client is declared first so it drops before the directory holding the db
struct TestApp {
    client: Client,
    _dir: TempDir,
}

#[derive(Deserialize)]
struct LocationJson {
    location: String,
}

#[derive(Deserialize)]
struct MessageJson {
    message: String,
}

fn app() -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let db = dir.path().join("inventory.db");

    let figment = rocket::Config::figment()
        .merge(("databases.inventory.url", db.to_string_lossy().into_owned()))
        .merge(("databases.inventory.pool_size", 1));

    let client = Client::tracked(crate::rocket(figment)).expect("valid rocket instance");

    TestApp { client, _dir: dir }
}

fn multipart(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", name, value).as_bytes(),
        );
    }

    if let Some((content_type, bytes)) = image {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"image\"; filename=\"picture\"\r\n",
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_type() -> ContentType {
    ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY))
}

impl TestApp {
    fn add_box(&self, ident: &str, location: &str) -> StorageBox {
        let response = self
            .client
            .post("/boxes")
            .header(ContentType::Form)
            .body(format!("box_identifier={}&location={}", ident, location))
            .dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(response.headers().get_one("Location"), Some("/"));

        self.boxes()
            .into_iter()
            .filter(|b| b.box_identifier == ident)
            .max_by_key(|b| b.id)
            .expect("created box")
    }

    fn boxes(&self) -> Vec<StorageBox> {
        let response = self.client.get("/api/v1/boxes").dispatch();
        assert_eq!(response.status(), Status::Ok);
        response.into_json().expect("box list")
    }

    fn items(&self, box_id: i32) -> Vec<Item> {
        let response = self
            .client
            .get(format!("/api/v1/boxes/{}/items", box_id))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        response.into_json().expect("item list")
    }

    fn add_item(&self, box_id: i32, name: &str, image: Option<(&str, &[u8])>) -> Status {
        self.client
            .post(format!("/boxes/{}/items", box_id))
            .header(multipart_type())
            .body(multipart(
                &[
                    ("name", name),
                    ("category", "Tools"),
                    ("description", "desc"),
                    ("price", "9.99"),
                ],
                image,
            ))
            .dispatch()
            .status()
    }
}

#[test]
fn start_page_lists_boxes_without_items() {
    let app = app();
    app.add_box("B1", "Shelf-A");

    let response = app.client.get("/").dispatch();

    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().unwrap();
    assert!(body.contains("B1"));
    assert!(body.contains("Add Box"));
    assert!(!body.contains("Items in"));
    assert!(!body.contains("Add Item"));
}

#[test]
fn selected_box_page_shows_items_and_item_form() {
    let app = app();
    let b1 = app.add_box("B1", "Shelf-A");
    assert_eq!(app.add_item(b1.id, "Widget", None), Status::SeeOther);

    let response = app.client.get(format!("/?box_id={}", b1.id)).dispatch();

    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().unwrap();
    assert!(body.contains("Items in B1"));
    assert!(body.contains("Widget"));
    assert!(body.contains("Add Item"));
    assert!(!body.contains("Delete Item"));
}

#[test]
fn widget_scenario_over_http() {
    let app = app();
    let b1 = app.add_box("B1", "Shelf-A");

    let response = app
        .client
        .post(format!("/boxes/{}/items", b1.id))
        .header(multipart_type())
        .body(multipart(
            &[("name", "Widget"), ("category", "Tools"), ("description", "desc"), ("price", "9.99")],
            None,
        ))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    let expected = format!("/?box_id={}", b1.id);
    assert_eq!(response.headers().get_one("Location"), Some(expected.as_str()));

    let items = app.items(b1.id);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Widget");
    assert_eq!(items[0].price, Some(9.99));
    assert_eq!(items[0].image, None);

    let widget = items[0].clone();
    let response = app
        .client
        .post(format!("/items/{}/update?box_id={}&item_id={}", widget.id, b1.id, widget.id))
        .header(multipart_type())
        .body(multipart(
            &[("name", "Widget2"), ("category", "Tools"), ("description", "desc"), ("price", "9.99")],
            None,
        ))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);

    let items = app.items(b1.id);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, widget.id);
    assert_eq!(items[0].name, "Widget2");
}

#[test]
fn uploaded_image_is_served_back_decoded() {
    let app = app();
    let b = app.add_box("B1", "Shelf-A");
    assert_eq!(app.add_item(b.id, "Photo", Some(("image/png", PNG))), Status::SeeOther);
    let item = app.items(b.id).pop().unwrap();
    assert!(item.image.is_some());

    let response = app
        .client
        .get(format!("/api/v1/items/{}/image", item.id))
        .dispatch();

    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::PNG));
    assert_eq!(response.into_bytes().unwrap(), PNG.to_vec());
}

#[test]
fn unsupported_upload_type_is_rejected() {
    let app = app();
    let b = app.add_box("B1", "Shelf-A");

    let status = app.add_item(b.id, "Notes", Some(("text/plain", b"hello")));

    assert_eq!(status, Status::BadRequest);
    assert!(app.items(b.id).is_empty());
}

#[test]
fn missing_image_is_not_found() {
    let app = app();
    let b = app.add_box("B1", "Shelf-A");
    app.add_item(b.id, "Plain", None);
    let item = app.items(b.id).pop().unwrap();

    let no_image = app
        .client
        .get(format!("/api/v1/items/{}/image", item.id))
        .dispatch();
    assert_eq!(no_image.status(), Status::NotFound);

    let no_item = app.client.get("/api/v1/items/999/image").dispatch();
    assert_eq!(no_item.status(), Status::NotFound);
    let message: MessageJson = no_item.into_json().unwrap();
    assert_eq!(message.message, "Requested item is not found!");
}

#[test]
fn box_grid_events() {
    let app = app();
    let b = app.add_box("B1", "Shelf-A");

    let response = app
        .client
        .post("/api/v1/grid/boxes")
        .header(ContentType::JSON)
        .body(format!(
            r#"{{"type":"selectionChanged","data":{{"id":{},"box_identifier":"B1","location":"Shelf-A"}}}}"#,
            b.id
        ))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let next: LocationJson = response.into_json().unwrap();
    assert_eq!(next.location, format!("/?box_id={}", b.id));

    let response = app
        .client
        .post("/api/v1/grid/boxes")
        .header(ContentType::JSON)
        .body(format!(
            r#"{{"type":"cellValueChanged","data":{{"id":{},"box_identifier":"B1","location":"Shelf-Z"}}}}"#,
            b.id
        ))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let next: LocationJson = response.into_json().unwrap();
    assert_eq!(next.location, "/");
    assert_eq!(app.boxes()[0].location, "Shelf-Z");

    let response = app
        .client
        .post("/api/v1/grid/boxes")
        .header(ContentType::JSON)
        .body(r#"{"type":"selectionChanged","data":null}"#)
        .dispatch();
    let next: LocationJson = response.into_json().unwrap();
    assert_eq!(next.location, "/");
}

#[test]
fn item_grid_cell_edit_keeps_image() {
    let app = app();
    let b = app.add_box("B1", "Shelf-A");
    app.add_item(b.id, "Photo", Some(("image/png", PNG)));
    let mut item = app.items(b.id).pop().unwrap();
    let stored_image = item.image.clone();
    item.name = "Renamed".to_string();

    let body = serde_json::json!({ "type": "cellValueChanged", "data": item }).to_string();
    let response = app
        .client
        .post(format!("/api/v1/grid/items?box_id={}&item_id={}", b.id, item.id))
        .header(ContentType::JSON)
        .body(body)
        .dispatch();

    assert_eq!(response.status(), Status::Ok);
    let next: LocationJson = response.into_json().unwrap();
    assert_eq!(next.location, format!("/?box_id={}", b.id));

    let reloaded = app.items(b.id).pop().unwrap();
    assert_eq!(reloaded.name, "Renamed");
    assert_eq!(reloaded.image, stored_image);
}

#[test]
fn item_grid_selection_and_delete() {
    let app = app();
    let b = app.add_box("B1", "Shelf-A");
    app.add_item(b.id, "Widget", None);
    let item = app.items(b.id).pop().unwrap();

    let body = serde_json::json!({ "type": "selectionChanged", "data": item }).to_string();
    let response = app
        .client
        .post(format!("/api/v1/grid/items?box_id={}", b.id))
        .header(ContentType::JSON)
        .body(body)
        .dispatch();
    let next: LocationJson = response.into_json().unwrap();
    let selected = format!("/?box_id={}&item_id={}", b.id, item.id);
    assert_eq!(next.location, selected);

    let page = app.client.get(selected.clone()).dispatch().into_string().unwrap();
    assert!(page.contains("Delete Item"));

    let response = app
        .client
        .post(format!("/items/{}/delete?box_id={}&item_id={}", item.id, b.id, item.id))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    let expected = format!("/?box_id={}", b.id);
    assert_eq!(response.headers().get_one("Location"), Some(expected.as_str()));
    assert!(app.items(b.id).is_empty());
}

#[test]
fn box_form_update_and_delete_without_cascade() {
    let app = app();
    let b = app.add_box("B1", "Shelf-A");
    app.add_item(b.id, "Widget", None);

    let response = app
        .client
        .post(format!("/boxes/{}/update", b.id))
        .header(ContentType::Form)
        .body("box_identifier=B1-renamed&location=Garage")
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(app.boxes()[0].box_identifier, "B1-renamed");

    let response = app.client.post(format!("/boxes/{}/delete", b.id)).dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/"));

    assert!(app.boxes().is_empty());
    assert_eq!(app.items(b.id).len(), 1);

    // the orphaned items are unreachable from the page
    let page = app
        .client
        .get(format!("/?box_id={}", b.id))
        .dispatch()
        .into_string()
        .unwrap();
    assert!(!page.contains("Items in"));
}

#[test]
fn malformed_grid_event_is_rejected() {
    let app = app();

    let response = app
        .client
        .post("/api/v1/grid/boxes")
        .header(ContentType::JSON)
        .body(r#"{"type":"rowDoubleClicked","data":null}"#)
        .dispatch();

    assert_eq!(response.status(), Status::UnprocessableEntity);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    let message: MessageJson = response.into_json().unwrap();
    assert_eq!(message.message, "Submitted data is missing fields or has malformed values!");

    let response = app
        .client
        .post("/api/v1/grid/items?box_id=1")
        .header(ContentType::JSON)
        .body("{not json")
        .dispatch();

    assert_eq!(response.status(), Status::BadRequest);
    let message: MessageJson = response.into_json().unwrap();
    assert_eq!(message.message, "Request could not be understood!");
}

#[test]
fn unknown_api_path_answers_with_json() {
    let app = app();

    let response = app.client.get("/api/v1/shelves").dispatch();

    assert_eq!(response.status(), Status::NotFound);
    let message: MessageJson = response.into_json().unwrap();
    assert_eq!(message.message, "Requested resource is not found!");
}

#[test]
fn incomplete_box_form_renders_error_page() {
    let app = app();

    let response = app
        .client
        .post("/boxes")
        .header(ContentType::Form)
        .body("box_identifier=B1")
        .dispatch();

    assert_eq!(response.status(), Status::UnprocessableEntity);
    assert_eq!(response.content_type(), Some(ContentType::HTML));
    let body = response.into_string().unwrap();
    assert!(body.contains("Something went wrong (422)"));
    assert!(body.contains("Back to the inventory"));
    assert!(app.boxes().is_empty());
}

#[test]
fn cleared_price_and_description_are_stored_as_null() {
    let app = app();
    let b = app.add_box("B1", "Shelf-A");

    let response = app
        .client
        .post(format!("/boxes/{}/items", b.id))
        .header(multipart_type())
        .body(multipart(
            &[("name", "Widget"), ("category", "Tools"), ("description", ""), ("price", "")],
            None,
        ))
        .dispatch();

    assert_eq!(response.status(), Status::SeeOther);
    let items = app.items(b.id);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].price, None);
    assert_eq!(items[0].description, None);
}

#[test]
fn box_grid_pages_through_boxes() {
    let app = app();
    for n in 0..crate::grid::PAGE_SIZE + 1 {
        app.add_box(&format!("Box-{:02}", n), "Shelf");
    }

    let first = app.client.get("/").dispatch().into_string().unwrap();
    assert!(first.contains("Page 1 of 2"));
    assert!(first.contains("Box-00"));
    assert!(!first.contains("Box-10"));

    let last = app.client.get("/?box_page=7").dispatch().into_string().unwrap();
    assert!(last.contains("Page 2 of 2"));
    assert!(last.contains("Box-10"));
    assert!(last.contains("Previous"));
    assert!(!last.contains(">Next<"));
}

#[test]
fn box_selection_keeps_grid_page() {
    let app = app();
    let b = app.add_box("B1", "Shelf-A");

    let response = app
        .client
        .post("/api/v1/grid/boxes?box_page=2")
        .header(ContentType::JSON)
        .body(format!(
            r#"{{"type":"selectionChanged","data":{{"id":{},"box_identifier":"B1","location":"Shelf-A"}}}}"#,
            b.id
        ))
        .dispatch();

    let next: LocationJson = response.into_json().unwrap();
    assert_eq!(next.location, format!("/?box_id={}&box_page=2", b.id));
}

#[test]
fn health_reports_database_up() {
    let app = app();

    let response = app.client.get("/manage/health").dispatch();

    assert_eq!(response.status(), Status::Ok);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["status"], "UP");
    assert_eq!(body["components"]["db"]["status"], "UP");
    assert_eq!(body["components"]["db"]["details"]["database"], "SQLite");
}
