//! JSON endpoints over the domain commands

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    commands::DomainLogic,
    ports::{admin::AdminPort, ledger::LedgerPort},
};

mod error;
mod handlers;

pub use error::ApiError;

pub fn router<L, A>(domain: DomainLogic<L, A>) -> Router
where
    L: LedgerPort + Send + Sync + 'static,
    A: AdminPort + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(handlers::health))
        .route("/award-points", post(handlers::award_points::<L, A>))
        .route("/redeem-code", post(handlers::redeem_code::<L, A>))
        .route("/redeem-reward", post(handlers::redeem_reward::<L, A>))
        .route("/admin/sign-in", post(handlers::sign_in::<L, A>))
        .route("/accounts/{account_id}", get(handlers::get_account::<L, A>))
        .route(
            "/accounts/{account_id}/redemptions",
            get(handlers::list_redemptions::<L, A>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(domain)
}
