#[macro_use]
extern crate rocket;

pub mod model;
pub mod schema;

mod db;
mod forms;
mod grid;
mod routes;
mod view;

#[cfg(test)]
mod tests;

use rocket::fairing::{self, AdHoc};
use rocket::figment::Figment;
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;
use rocket_sync_db_pools::database;

use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use routes::*;

#[database("inventory")]
pub struct InventoryDatabase(diesel::SqliteConnection);

async fn run_db_migrations(rocket: Rocket<Build>) -> fairing::Result {
    let conn = match InventoryDatabase::get_one(&rocket).await {
        Some(conn) => conn,
        None => {
            error!("No database connection available for schema setup");
            return Err(rocket);
        }
    };

    match conn.run(|c| model::init_schema(c)).await {
        Ok(()) => Ok(rocket),
        Err(e) => {
            error!(error = %e, "Failed to run database migrations");
            Err(rocket)
        }
    }
}

fn cors() -> Result<rocket_cors::Cors, rocket_cors::Error> {
    let mut default = rocket_cors::CorsOptions::default();

    default = default.allow_credentials(true);

    default.to_cors()
}

fn rocket(figment: Figment) -> Rocket<Build> {
    let rocket = rocket::custom(figment)
        .mount(
            "/",
            routes![
                index,
                add_box,
                edit_box,
                remove_box,
                add_item,
                edit_item,
                remove_item,
                get_boxes,
                get_items,
                get_item_image,
                box_grid_event,
                item_grid_event,
                health_check,
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                not_found,
                unprocessable_entity,
                service_unavailable,
                default_catcher,
            ],
        )
        .attach(InventoryDatabase::fairing())
        .attach(Template::fairing())
        .attach(AdHoc::try_on_ignite("Database Migrations", run_db_migrations));

    match cors() {
        Ok(cors) => rocket.attach(cors),
        Err(e) => {
            error!(error = %e, "CORS options rejected, serving without CORS headers");
            rocket
        }
    }
}

#[launch]
fn launch() -> _ {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting inventory service");

    rocket(rocket::Config::figment())
}
