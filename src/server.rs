use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reject::{self, Reject};
use warp::reply::{self, Reply, Response};
use warp::{Filter, Rejection};

use crate::MovieStore;
use crate::error::{self, ApiError, StoreError, NOT_FOUND_MESSAGE};
use crate::query::ListParams;
use crate::schema;

// 64KB cap on request bodies
const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Debug)]
struct InvalidJson(String);
impl Reject for InvalidJson {}

#[derive(Debug)]
struct BodyTooLarge;
impl Reject for BodyTooLarge {}

#[derive(Debug)]
struct NotJson;
impl Reject for NotJson {}

pub struct ReelServer {
    store: Arc<MovieStore>,
}

impl ReelServer {
    pub fn new(store: Arc<MovieStore>) -> Self {
        Self { store }
    }

    /// Serves until `shutdown` resolves.
    pub async fn run<S>(&self, addr: SocketAddr, shutdown: S) -> Result<(), warp::Error>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let (bound, server) = warp::serve(routes(self.store.clone()))
            .try_bind_with_graceful_shutdown(addr, shutdown)?;
        info!("Reel listening on http://{}", bound);
        server.await;
        info!("Server stopped.");
        Ok(())
    }
}

/// The full HTTP surface: routes, rejection mapping, CORS and request tracing.
pub fn routes(store: Arc<MovieStore>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    // 1. GET /
    let root = warp::path::end()
    .and(warp::get())
    .map(|| warp::reply::json(&json!({ "message": "Hola Mundo" })));

    // 2. GET /movies?genre=..|pag=..&qt=..
    let list = warp::path("movies")
    .and(warp::path::end())
    .and(warp::get())
    .and(list_params())
    .and(with_store(store.clone()))
    .and_then(list_movies);

    // 3. GET /movies/:id
    let get = warp::path!("movies" / String)
    .and(warp::get())
    .and(with_store(store.clone()))
    .and_then(get_movie);

    // 4. POST /movies
    let create = warp::path("movies")
    .and(warp::path::end())
    .and(warp::post())
    .and(json_body())
    .and(with_store(store.clone()))
    .and_then(create_movie);

    // 5. PATCH /movies/:id
    let update = warp::path!("movies" / String)
    .and(warp::patch())
    .and(json_body())
    .and(with_store(store.clone()))
    .and_then(update_movie);

    // 6. DELETE /movies/:id
    let delete = warp::path!("movies" / String)
    .and(warp::delete())
    .and(with_store(store))
    .and_then(delete_movie);

    let cors = warp::cors()
    .allow_any_origin()
    .allow_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
    .allow_headers(vec!["content-type"]);

    root.or(list).or(get).or(create).or(update).or(delete)
    .recover(handle_rejection)
    .with(cors)
    .with(warp::trace::request())
}

fn with_store(store: Arc<MovieStore>) -> impl Filter<Extract = (Arc<MovieStore>,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

/// Unparseable query strings fall back to an unfiltered listing.
fn list_params() -> impl Filter<Extract = (ListParams,), Error = Infallible> + Clone {
    warp::query::<ListParams>()
    .or(warp::any().map(ListParams::default))
    .unify()
}

/// JSON request body, capped at 64KB. `Content-Length` is optional so chunked
/// uploads are accepted; the cap is then enforced on the bytes read.
fn json_body() -> impl Filter<Extract = (Value,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
    .and(warp::header::optional::<String>("content-type"))
    .and_then(|length: Option<u64>, content_type: Option<String>| async move {
        if length.map_or(false, |n| n > MAX_BODY_BYTES) {
            return Err(reject::custom(BodyTooLarge));
        }
        if content_type.map_or(false, |ct| !is_json(&ct)) {
            return Err(reject::custom(NotJson));
        }
        Ok(())
    })
    .untuple_one()
    .and(warp::body::bytes())
    .and_then(|bytes: Bytes| async move { decode_body(&bytes) })
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

fn decode_body(bytes: &[u8]) -> Result<Value, Rejection> {
    if bytes.len() as u64 > MAX_BODY_BYTES {
        return Err(reject::custom(BodyTooLarge));
    }
    serde_json::from_slice(bytes).map_err(|e| reject::custom(InvalidJson(e.to_string())))
}

// --- HANDLERS ---

async fn list_movies(params: ListParams, store: Arc<MovieStore>) -> Result<Response, Infallible> {
    let query = params.into_query();
    debug!("Listing movies: {:?}", query);
    respond(store.query(&query).map(|movies| reply::json(&movies).into_response()).map_err(ApiError::from))
}

async fn get_movie(id: String, store: Arc<MovieStore>) -> Result<Response, Infallible> {
    debug!("Fetching movie {}", id);
    respond(store.get(&id).map(|movie| reply::json(&movie).into_response()).map_err(ApiError::from))
}

async fn create_movie(body: Value, store: Arc<MovieStore>) -> Result<Response, Infallible> {
    respond(create(&body, &store))
}

async fn update_movie(id: String, body: Value, store: Arc<MovieStore>) -> Result<Response, Infallible> {
    respond(update(&id, &body, &store))
}

async fn delete_movie(id: String, store: Arc<MovieStore>) -> Result<Response, Infallible> {
    respond(
        store
        .delete(&id)
        .map(|_| reply::with_status(reply::reply(), StatusCode::NO_CONTENT).into_response())
        .map_err(ApiError::from),
    )
}

fn create(body: &Value, store: &MovieStore) -> Result<Response, ApiError> {
    let draft = schema::validate_full(body)?;
    let movie = store.create(draft)?;
    Ok(reply::with_status(reply::json(&movie), StatusCode::CREATED).into_response())
}

// Validation runs before the lookup, so a bad delta is a 400 even for unknown ids.
fn update(id: &str, body: &Value, store: &MovieStore) -> Result<Response, ApiError> {
    let delta = schema::validate_partial(body)?;
    let movie = store.update_partial(id, delta)?;
    Ok(reply::json(&movie).into_response())
}

fn respond(result: Result<Response, ApiError>) -> Result<Response, Infallible> {
    match result {
        Ok(response) => Ok(response),
        Err(err) => {
            match &err {
                ApiError::Store(StoreError::Poisoned) => error!("Request failed: {}", err),
                ApiError::Validation(_) => warn!("Rejected input: {}", err),
                ApiError::Store(_) => debug!("Request failed: {}", err),
            }
            Ok(err.into_response())
        }
    }
}

// --- REJECTIONS ---

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(error::message(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE));
    }

    if let Some(InvalidJson(e)) = err.find::<InvalidJson>() {
        warn!("Malformed JSON body: {}", e);
        let body = json!({
            "error": [{ "code": "invalid_json", "path": [], "message": e }]
        });
        return Ok(reply::with_status(reply::json(&body), StatusCode::BAD_REQUEST).into_response());
    }

    let (status, text) = if err.find::<BodyTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
    } else if err.find::<NotJson>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported Media Type")
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    };
    Ok(error::message(status, text))
}
