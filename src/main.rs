mod config;
mod infra;
mod shopping;
mod short_link;

use config::Config;
use infra::auth::AuthError;
use infra::*;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::serde::json::{json, Json, Value};
use rocket::{Build, Request, Response, Rocket};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[macro_use]
extern crate rocket;
pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Attaching CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PATCH, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[catch(400)]
fn bad_request() -> Json<Value> {
    Json(json!({ "detail": "JSON parse error." }))
}

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Value> {
    let failure = req.local_cache(|| AuthError::Missing);
    Json(json!({ "detail": failure.detail() }))
}

#[catch(404)]
fn not_found() -> Json<Value> {
    Json(json!({ "detail": "Not found." }))
}

#[catch(422)]
fn unprocessable() -> Json<Value> {
    Json(json!({ "detail": "Malformed request." }))
}

#[catch(500)]
fn internal_error() -> Json<Value> {
    Json(json!({ "detail": "Internal server error." }))
}

fn build(db: Db, config: Config) -> Rocket<Build> {
    rocket::build()
        .manage(db)
        .manage(config)
        .mount(
            "/api",
            routes![
                list_recipes,
                get_recipe,
                create_recipe,
                update_recipe,
                delete_recipe,
                add_favorite,
                remove_favorite,
                add_to_cart,
                remove_from_cart,
                download_shopping_cart,
                get_short_link,
                resolve_short_link,
                list_tags,
                get_tag,
                list_ingredients,
                get_ingredient,
                me,
                get_user,
                subscriptions,
                subscribe,
                unsubscribe
            ],
        )
        .mount("/", routes![resolve_short_link])
        .register(
            "/",
            catchers![bad_request, unauthorized, not_found, unprocessable, internal_error],
        )
        .attach(CORS)
}

#[launch]
fn rocket() -> _ {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load();
    info!(database = %config.database, "connecting to MongoDB");
    let db = MongoRep::init(config.mongo_uri.clone(), &config.database)
        .expect("Failed to initialise the MongoDB repository");
    build(Box::new(db), config)
}
