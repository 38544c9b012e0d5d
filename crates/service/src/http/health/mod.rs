use axum::routing::get;
use axum::Router;

mod healthz;

use crate::state::State;

pub fn router(state: State) -> Router<State> {
    Router::new()
        .route("/healthz", get(healthz::handler))
        .with_state(state)
}
