use crate::db::MainDbOps;
use crate::forms::{BoxForm, ItemForm};
use crate::grid::{apply_box_event, apply_item_event, GridEvent};
use crate::model::*;
use crate::view::{build_view, Selection};
use crate::InventoryDatabase;

use serde::Serialize;

use diesel::connection::SimpleConnection;

use rocket::form::Form;
use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Redirect, Responder, Response};
use rocket::serde::json::Json;
use rocket_dyn_templates::{context, Template};

use tracing::{error, warn};

use std::error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug)]
enum DatabaseError {
    ConnectionFailed,
}

impl Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DatabaseError::ConnectionFailed => f.write_str("Failed to connect to database!"),
        }
    }
}

impl error::Error for DatabaseError {}

#[derive(Serialize, Debug)]
struct ErrorJson {
    message: String,
}

#[derive(Serialize, Debug)]
pub struct GridEventResponseJson {
    location: String,
}

#[derive(Responder, Debug)]
enum JsonRespond {
    Boxes(Json<Vec<StorageBox>>),
    Items(Json<Vec<Item>>),
    GridEventResponse(Json<GridEventResponseJson>),
    Error(Json<ErrorJson>),
}

#[derive(Debug)]
pub struct ApiResponder {
    inner: JsonRespond,
    status: Status,
}

impl ApiResponder {
    fn unavailable() -> ApiResponder {
        ApiResponder {
            inner: JsonRespond::Error(Json(ErrorJson {
                message: DatabaseError::ConnectionFailed.to_string(),
            })),
            status: Status::ServiceUnavailable,
        }
    }
}

fn error_status(e: &DaoError) -> Status {
    if e.is_not_found() {
        Status::NotFound
    } else if e.is_bad_input() {
        Status::BadRequest
    } else {
        Status::InternalServerError
    }
}

impl From<DaoError> for ApiResponder {
    fn from(e: DaoError) -> ApiResponder {
        let status = error_status(&e);
        warn!(error = %e, status = status.code, "request failed");

        ApiResponder {
            inner: JsonRespond::Error(Json(ErrorJson {
                message: e.to_string(),
            })),
            status,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiResponder {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        Response::build_from(self.inner.respond_to(req)?)
            .status(self.status)
            .header(ContentType::JSON)
            .ok()
    }
}

/// A failed render cycle. The page says what went wrong and links back to
/// the start; the next request begins a fresh cycle.
#[derive(Debug)]
pub struct PageError {
    message: String,
    status: Status,
}

impl From<DaoError> for PageError {
    fn from(e: DaoError) -> PageError {
        let status = error_status(&e);
        error!(error = %e, status = status.code, "render cycle failed");

        PageError {
            message: e.to_string(),
            status,
        }
    }
}

impl<'r> Responder<'r, 'static> for PageError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let page = Template::render(
            "error",
            context! {
                message: self.message,
                status: self.status.code,
            },
        );

        Response::build_from(page.respond_to(req)?)
            .status(self.status)
            .ok()
    }
}

/// Answers requests no handler could take. Anything under `/api/` gets the
/// JSON error body, everything else the error page.
pub struct Caught {
    message: String,
    status: Status,
}

impl<'r> Responder<'r, 'static> for Caught {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        warn!(path = %req.uri().path(), status = self.status.code, "request not handled");

        if req.uri().path().as_str().starts_with("/api/") {
            ApiResponder {
                inner: JsonRespond::Error(Json(ErrorJson {
                    message: self.message,
                })),
                status: self.status,
            }
            .respond_to(req)
        } else {
            PageError {
                message: self.message,
                status: self.status,
            }
            .respond_to(req)
        }
    }
}

fn caught(status: Status, message: &str) -> Caught {
    Caught {
        message: message.to_string(),
        status,
    }
}

#[catch(400)]
pub fn bad_request() -> Caught {
    caught(Status::BadRequest, "Request could not be understood!")
}

#[catch(404)]
pub fn not_found() -> Caught {
    caught(Status::NotFound, "Requested resource is not found!")
}

#[catch(422)]
pub fn unprocessable_entity() -> Caught {
    caught(
        Status::UnprocessableEntity,
        "Submitted data is missing fields or has malformed values!",
    )
}

#[catch(503)]
pub fn service_unavailable() -> Caught {
    caught(
        Status::ServiceUnavailable,
        &DatabaseError::ConnectionFailed.to_string(),
    )
}

#[catch(default)]
pub fn default_catcher(status: Status, _req: &Request) -> Caught {
    caught(status, status.reason().unwrap_or("Request failed!"))
}

#[get("/?<selection..>")]
pub async fn index(conn: InventoryDatabase, selection: Selection) -> Result<Template, PageError> {
    let view = conn
        .run(move |c| build_view(c, MainDbOps, selection))
        .await?;

    Ok(Template::render("index", &view))
}

#[post("/boxes", data = "<form>")]
pub async fn add_box(conn: InventoryDatabase, form: Form<BoxForm>) -> Result<Redirect, PageError> {
    let form = form.into_inner();

    conn.run(move |c| create_box(c, MainDbOps, &form.box_identifier, &form.location))
        .await?;

    Ok(Redirect::to(Selection::default().location()))
}

#[post("/boxes/<id>/update", data = "<form>")]
pub async fn edit_box(
    conn: InventoryDatabase,
    id: i32,
    form: Form<BoxForm>,
) -> Result<Redirect, PageError> {
    let form = form.into_inner();

    conn.run(move |c| update_box(c, MainDbOps, id, &form.box_identifier, &form.location))
        .await?;

    Ok(Redirect::to(Selection::of_box(id).location()))
}

#[post("/boxes/<id>/delete")]
pub async fn remove_box(conn: InventoryDatabase, id: i32) -> Result<Redirect, PageError> {
    conn.run(move |c| delete_box(c, MainDbOps, id)).await?;

    Ok(Redirect::to(Selection::default().location()))
}

#[post("/boxes/<box_id>/items", data = "<form>")]
pub async fn add_item(
    conn: InventoryDatabase,
    box_id: i32,
    form: Form<ItemForm<'_>>,
) -> Result<Redirect, PageError> {
    let input = form.into_inner().into_input().await?;

    conn.run(move |c| create_item(c, MainDbOps, box_id, input))
        .await?;

    Ok(Redirect::to(Selection::of_box(box_id).location()))
}

#[post("/items/<id>/update?<selection..>", data = "<form>")]
pub async fn edit_item(
    conn: InventoryDatabase,
    id: i32,
    selection: Selection,
    form: Form<ItemForm<'_>>,
) -> Result<Redirect, PageError> {
    let input = form.into_inner().into_input().await?;

    conn.run(move |c| update_item(c, MainDbOps, id, input))
        .await?;

    Ok(Redirect::to(selection.location()))
}

#[post("/items/<id>/delete?<selection..>")]
pub async fn remove_item(
    conn: InventoryDatabase,
    id: i32,
    selection: Selection,
) -> Result<Redirect, PageError> {
    conn.run(move |c| delete_item(c, MainDbOps, id)).await?;

    Ok(Redirect::to(selection.without_item().location()))
}

#[get("/api/v1/boxes")]
pub async fn get_boxes(conn: Result<InventoryDatabase, ()>) -> ApiResponder {
    let conn = match conn {
        Ok(conn) => conn,
        Err(_) => return ApiResponder::unavailable(),
    };

    match conn.run(|c| list_boxes(c, MainDbOps)).await {
        Ok(v) => ApiResponder {
            inner: JsonRespond::Boxes(Json(v)),
            status: Status::Ok,
        },
        Err(e) => ApiResponder::from(e),
    }
}

#[get("/api/v1/boxes/<box_id>/items")]
pub async fn get_items(conn: Result<InventoryDatabase, ()>, box_id: i32) -> ApiResponder {
    let conn = match conn {
        Ok(conn) => conn,
        Err(_) => return ApiResponder::unavailable(),
    };

    match conn.run(move |c| list_items(c, MainDbOps, box_id)).await {
        Ok(v) => ApiResponder {
            inner: JsonRespond::Items(Json(v)),
            status: Status::Ok,
        },
        Err(e) => ApiResponder::from(e),
    }
}

fn sniff_image_type(bytes: &[u8]) -> ContentType {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        ContentType::PNG
    } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        ContentType::JPEG
    } else {
        ContentType::Binary
    }
}

#[get("/api/v1/items/<id>/image")]
pub async fn get_item_image(
    conn: Result<InventoryDatabase, ()>,
    id: i32,
) -> Result<(ContentType, Vec<u8>), ApiResponder> {
    let conn = conn.map_err(|_| ApiResponder::unavailable())?;

    let item = conn.run(move |c| get_item(c, MainDbOps, id)).await?;

    let bytes = decode_stored_image(item.image.as_deref())?
        .ok_or(DaoError::from(DataError::ImageNotFoundErr))?;

    Ok((sniff_image_type(&bytes), bytes))
}

#[post("/api/v1/grid/boxes?<selection..>", format = "json", data = "<event>")]
pub async fn box_grid_event(
    conn: Result<InventoryDatabase, ()>,
    selection: Selection,
    event: Json<GridEvent<StorageBox>>,
) -> ApiResponder {
    let conn = match conn {
        Ok(conn) => conn,
        Err(_) => return ApiResponder::unavailable(),
    };

    let event = event.into_inner();

    match conn.run(move |c| apply_box_event(c, MainDbOps, selection, event)).await {
        Ok(next) => ApiResponder {
            inner: JsonRespond::GridEventResponse(Json(GridEventResponseJson {
                location: next.location(),
            })),
            status: Status::Ok,
        },
        Err(e) => ApiResponder::from(e),
    }
}

#[post("/api/v1/grid/items?<selection..>", format = "json", data = "<event>")]
pub async fn item_grid_event(
    conn: Result<InventoryDatabase, ()>,
    selection: Selection,
    event: Json<GridEvent<Item>>,
) -> ApiResponder {
    let conn = match conn {
        Ok(conn) => conn,
        Err(_) => return ApiResponder::unavailable(),
    };

    let event = event.into_inner();

    match conn
        .run(move |c| apply_item_event(c, MainDbOps, selection, event))
        .await
    {
        Ok(next) => ApiResponder {
            inner: JsonRespond::GridEventResponse(Json(GridEventResponseJson {
                location: next.location(),
            })),
            status: Status::Ok,
        },
        Err(e) => ApiResponder::from(e),
    }
}

#[derive(Serialize, Debug)]
struct DetailsBody {
    database: String,
    #[serde(rename = "validationQuery")]
    validation_query: String,
}

#[derive(Serialize, Debug)]
struct DbBody {
    status: String,
    details: DetailsBody,
}

#[derive(Serialize, Debug)]
struct ComponentsBody {
    db: DbBody,
}

#[derive(Serialize, Debug)]
struct PingBody {
    status: String,
}

#[derive(Serialize, Debug)]
pub struct HealthBody {
    status: String,
    components: ComponentsBody,
    ping: PingBody,
}

#[get("/manage/health")]
pub async fn health_check(conn: Option<InventoryDatabase>) -> Json<HealthBody> {
    let db_up = match conn {
        Some(conn) => conn.run(|c| c.batch_execute("SELECT 1")).await.is_ok(),
        None => false,
    };

    let (status, validation_query) = if db_up {
        ("UP", "IsValid()")
    } else {
        ("DOWN", "!IsValid()")
    };

    Json(HealthBody {
        status: String::from("UP"),
        components: ComponentsBody {
            db: DbBody {
                status: status.to_string(),
                details: DetailsBody {
                    database: String::from("SQLite"),
                    validation_query: validation_query.to_string(),
                },
            },
        },
        ping: PingBody {
            status: String::from("UP"),
        },
    })
}
