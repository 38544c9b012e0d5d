use axum::routing::post;
use axum::Router;

pub mod acl_exists;
pub mod add_write_access;
pub mod authenticate;
pub mod delete_data;
pub mod fetch_data;
pub mod refresh_token;
pub mod register;
pub mod remove_write_access;
pub mod request_token;
pub mod update_data;

use crate::state::State;

pub fn router(state: State) -> Router<State> {
    Router::new()
        .route("/request-token", post(request_token::handler))
        .route("/register", post(register::handler))
        .route("/authenticate", post(authenticate::handler))
        .route("/refresh-token", post(refresh_token::handler))
        .route("/add-write-access", post(add_write_access::handler))
        .route("/remove-write-access", post(remove_write_access::handler))
        .route("/acl", post(acl_exists::handler))
        .route("/fetch-data", post(fetch_data::handler))
        .route(
            "/update-data",
            post(update_data::handler).delete(delete_data::handler),
        )
        .with_state(state)
}
