//! Student routes, mounted at `/api/v1/student`.
//! Fixed paths are registered alongside `/:id`; axum prefers static segments.

use crate::handlers::student::{
    bulk, count, create, delete as delete_handler, get_by_code, get_by_id, list, paginated, search, update,
};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(list))
        .route("/paginated", get(paginated))
        .route("/search", get(search))
        .route("/count", get(count))
        .route("/code/:code", get(get_by_code))
        .route("/create", post(create))
        .route("/bulk", post(bulk))
        .route("/:id", get(get_by_id).put(update).delete(delete_handler))
}
