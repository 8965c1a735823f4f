use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    users: BTreeMap<u64, User>,
}

impl Store {
    fn seeded(users: Vec<User>) -> Self {
        let next_id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        Self {
            next_id,
            users: users.into_iter().map(|u| (u.id, u)).collect(),
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Vec::new())
}

/// The users API, pre-populated with `users`.
pub fn app_with(users: Vec<User>) -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded(users)));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/v2/users", get(list_users_wrapped))
        .route(
            "/users/{id}",
            get(get_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user)
                .post(override_user),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

async fn list_users(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<User>> {
    let store = db.read().await;
    Json(select(store.users.values(), &params))
}

async fn list_users_wrapped(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let store = db.read().await;
    let users = select(store.users.values(), &params);
    Json(json!({ "total": users.len(), "data": users }))
}

async fn create_user(State(db): State<Db>, Json(input): Json<Map<String, Value>>) -> Response {
    let name = text(&input, "name").unwrap_or_default();
    let email = text(&input, "email").unwrap_or_default();
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push("name is required");
    }
    if email.trim().is_empty() {
        errors.push("email is required");
    }
    if !errors.is_empty() {
        return invalid(&errors);
    }

    let mut store = db.write().await;
    let user = User {
        id: store.next_id,
        name,
        email,
    };
    store.next_id += 1;
    store.users.insert(user.id, user.clone());
    debug!(id = user.id, "created user");
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let store = db.read().await;
    match store.users.get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => not_found(),
    }
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<Map<String, Value>>,
) -> Response {
    apply_update(&db, id, &input).await
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    apply_delete(&db, id).await
}

/// POST to an instance path carrying the intended verb in `_method`.
async fn override_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<Map<String, Value>>,
) -> Response {
    let verb = input
        .get("_method")
        .and_then(Value::as_str)
        .map(str::to_ascii_uppercase);
    match verb.as_deref() {
        Some("PUT") | Some("PATCH") => apply_update(&db, id, &input).await,
        Some("DELETE") => apply_delete(&db, id).await,
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

async fn apply_update(db: &Db, id: u64, input: &Map<String, Value>) -> Response {
    let mut store = db.write().await;
    let Some(user) = store.users.get_mut(&id) else {
        return not_found();
    };
    if let Some(name) = text(input, "name") {
        if name.trim().is_empty() {
            return invalid(&["name can not be blank"]);
        }
        user.name = name;
    }
    if let Some(email) = text(input, "email") {
        user.email = email;
    }
    debug!(id, "updated user");
    Json(user.clone()).into_response()
}

async fn apply_delete(db: &Db, id: u64) -> Response {
    let mut store = db.write().await;
    match store.users.remove(&id) {
        Some(user) => {
            debug!(id, "deleted user");
            Json(user).into_response()
        }
        None => not_found(),
    }
}

fn text(input: &Map<String, Value>, key: &str) -> Option<String> {
    input.get(key).and_then(Value::as_str).map(str::to_string)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "errors": ["not found"] }))).into_response()
}

fn invalid(messages: &[&str]) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "errors": messages })),
    )
        .into_response()
}

#[derive(Debug, Clone, PartialEq)]
struct Condition {
    property: String,
    operator: String,
    value: String,
}

/// Read `search[i][property|operator|value]` triples until an index is missing.
fn conditions(params: &HashMap<String, String>) -> Vec<Condition> {
    let mut found = Vec::new();
    for i in 0.. {
        let Some(property) = params.get(&format!("search[{i}][property]")) else {
            break;
        };
        found.push(Condition {
            property: property.clone(),
            operator: params
                .get(&format!("search[{i}][operator]"))
                .cloned()
                .unwrap_or_else(|| "=".to_string()),
            value: params
                .get(&format!("search[{i}][value]"))
                .cloned()
                .unwrap_or_default(),
        });
    }
    found
}

fn field_text(user: &User, property: &str) -> Option<String> {
    match property {
        "id" => Some(user.id.to_string()),
        "name" => Some(user.name.clone()),
        "email" => Some(user.email.clone()),
        _ => None,
    }
}

fn matches(user: &User, condition: &Condition) -> bool {
    let Some(actual) = field_text(user, &condition.property) else {
        return false;
    };
    match condition.operator.as_str() {
        "=" => actual == condition.value,
        "!=" => actual != condition.value,
        "like" | "LIKE" => actual
            .to_lowercase()
            .contains(&condition.value.trim_matches('%').to_lowercase()),
        _ => false,
    }
}

fn compare(a: &User, b: &User, field: &str) -> Ordering {
    match field {
        "id" => a.id.cmp(&b.id),
        "name" => a.name.cmp(&b.name),
        "email" => a.email.cmp(&b.email),
        _ => Ordering::Equal,
    }
}

/// Apply search conditions, then ordering.
fn select<'a>(users: impl Iterator<Item = &'a User>, params: &HashMap<String, String>) -> Vec<User> {
    let conditions = conditions(params);
    let any = params
        .get("logical_operator")
        .is_some_and(|op| op.eq_ignore_ascii_case("OR"));

    let mut selected: Vec<User> = users
        .filter(|user| {
            if conditions.is_empty() {
                return true;
            }
            if any {
                conditions.iter().any(|c| matches(user, c))
            } else {
                conditions.iter().all(|c| matches(user, c))
            }
        })
        .cloned()
        .collect();

    if let Some(field) = params.get("order_by") {
        selected.sort_by(|a, b| compare(a, b, field));
    }
    if params
        .get("order_dir")
        .is_some_and(|dir| dir.eq_ignore_ascii_case("DESC"))
    {
        selected.reverse();
    }
    selected
}
