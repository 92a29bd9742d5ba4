use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{delete, get, post, State};
use tracing::info;

use super::auth::{CurrentUser, Viewer};
use super::error::ApiError;
use super::mongo::types::{User, UserId};
use super::store::{Db, UserRepository};
use super::views::{subscription_view, user_view, SubscriptionView, UserView};

fn find_user(db: &Db, id: UserId) -> Result<User, ApiError> {
    db.get_user(id)?.ok_or(ApiError::NotFound("User not found"))
}

#[get("/users/me")]
pub fn me(db: &State<Db>, user: CurrentUser) -> Result<Json<UserView>, ApiError> {
    let id = user.id();
    Ok(Json(user_view(db, user.0, Some(id))?))
}

#[get("/users/<id>")]
pub fn get_user(
    db: &State<Db>,
    viewer: Viewer,
    id: UserId,
) -> Result<Json<UserView>, ApiError> {
    let user = find_user(db, id)?;
    Ok(Json(user_view(db, user, viewer.id())?))
}

#[get("/users/subscriptions?<recipes_limit>")]
pub fn subscriptions(
    db: &State<Db>,
    user: CurrentUser,
    recipes_limit: Option<usize>,
) -> Result<Json<Vec<SubscriptionView>>, ApiError> {
    let authors = db.subscribed_authors(user.id())?;
    let views = authors
        .into_iter()
        .map(|author| subscription_view(db, author, user.id(), recipes_limit))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

#[post("/users/<id>/subscribe?<recipes_limit>")]
pub fn subscribe(
    db: &State<Db>,
    user: CurrentUser,
    id: UserId,
    recipes_limit: Option<usize>,
) -> Result<status::Created<Json<SubscriptionView>>, ApiError> {
    let author = find_user(db, id)?;
    if author.id == user.id() {
        return Err(ApiError::BadRequest("You cannot subscribe to yourself."));
    }
    if !db.subscribe(user.id(), author.id)? {
        return Err(ApiError::BadRequest("You are already subscribed to this user."));
    }
    info!(user_id = user.id(), author_id = author.id, "subscribed");
    let view = subscription_view(db, author, user.id(), recipes_limit)?;
    Ok(status::Created::new(format!("/api/users/{id}")).body(Json(view)))
}

#[delete("/users/<id>/subscribe")]
pub fn unsubscribe(db: &State<Db>, user: CurrentUser, id: UserId) -> Result<Status, ApiError> {
    let author = find_user(db, id)?;
    if !db.unsubscribe(user.id(), author.id)? {
        return Err(ApiError::BadRequest("You are not subscribed to this user."));
    }
    Ok(Status::NoContent)
}

#[cfg(test)]
mod tests {
    use rocket::http::{Header, Status};
    use rocket::local::blocking::Client;
    use rocket::serde::json::{json, Value};

    use crate::config::Config;
    use crate::infra::memory::MemoryRep;

    fn client() -> Client {
        let repo = MemoryRep::default()
            .with_user(1, "alice", "alice-token")
            .with_user(2, "bob", "bob-token")
            .with_recipe(1, 2, &[])
            .with_recipe(2, 2, &[])
            .with_recipe(3, 2, &[]);
        let config = Config {
            mongo_uri: String::new(),
            database: String::new(),
            base_url: "http://foodgram.test".into(),
        };
        Client::tracked(crate::build(Box::new(repo), config)).unwrap()
    }

    fn alice() -> Header<'static> {
        Header::new("Authorization", "Token alice-token")
    }

    #[test]
    fn test_me() {
        let client = client();
        let response = client.get("/api/users/me").header(alice()).dispatch();
        assert_eq!(response.status(), Status::Ok);
        let me = response.into_json::<Value>().unwrap();
        assert_eq!(me["username"], json!("alice"));
        assert_eq!(me["is_subscribed"], json!(false));

        assert_eq!(
            client.get("/api/users/me").dispatch().status(),
            Status::Unauthorized
        );
    }

    #[test]
    fn test_subscribe_flow() {
        let client = client();
        let response = client
            .post("/api/users/2/subscribe?recipes_limit=2")
            .header(alice())
            .dispatch();
        assert_eq!(response.status(), Status::Created);
        let view = response.into_json::<Value>().unwrap();
        assert_eq!(view["username"], json!("bob"));
        assert_eq!(view["is_subscribed"], json!(true));
        assert_eq!(view["recipes_count"], json!(3));
        assert_eq!(view["recipes"].as_array().unwrap().len(), 2);
        assert_eq!(view["recipes"][0]["id"], json!(3));

        let again = client.post("/api/users/2/subscribe").header(alice()).dispatch();
        assert_eq!(again.status(), Status::BadRequest);

        let listed = client
            .get("/api/users/subscriptions")
            .header(alice())
            .dispatch()
            .into_json::<Value>()
            .unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let bob = client
            .get("/api/users/2")
            .header(alice())
            .dispatch()
            .into_json::<Value>()
            .unwrap();
        assert_eq!(bob["is_subscribed"], json!(true));

        let remove = || {
            client
                .delete("/api/users/2/subscribe")
                .header(alice())
                .dispatch()
                .status()
        };
        assert_eq!(remove(), Status::NoContent);
        assert_eq!(remove(), Status::BadRequest);
    }

    #[test]
    fn test_cannot_subscribe_to_self() {
        let client = client();
        let response = client.post("/api/users/1/subscribe").header(alice()).dispatch();
        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(
            response.into_json::<Value>().unwrap(),
            json!({"errors": "You cannot subscribe to yourself."})
        );
    }

    #[test]
    fn test_unknown_user() {
        let client = client();
        assert_eq!(
            client.get("/api/users/99").dispatch().status(),
            Status::NotFound
        );
    }
}
