pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod ports;
pub mod rail;
pub mod services;

use arc_swap::ArcSwap;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::domain::{Clock, FeeSchedule};
use crate::ports::TransferRepository;
use crate::rail::{PaymentRail, RateSource};
use crate::services::{
    AdminService, IssuerService, QuoteService, ReconciliationService, TransferLocks,
};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn TransferRepository>,
    pub quotes: QuoteService,
    pub issuer: IssuerService,
    pub reconciliation: ReconciliationService,
    pub admin: AdminService,
    pub locks: TransferLocks,
    pub clock: Arc<dyn Clock>,
    pub fee_schedule: Arc<ArcSwap<FeeSchedule>>,
    pub webhook_secret: String,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        rail: Arc<dyn PaymentRail>,
        rates: Arc<dyn RateSource>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let locks = TransferLocks::new();
        let fee_schedule = Arc::new(ArcSwap::from_pointee(config.fee_schedule()));

        let quotes = QuoteService::new(
            repo.clone(),
            rates,
            fee_schedule.clone(),
            clock.clone(),
            chrono::Duration::minutes(config.transfer_ttl_minutes),
        );
        let issuer = IssuerService::new(repo.clone(), rail.clone(), locks.clone(), clock.clone());
        let reconciliation = ReconciliationService::new(
            repo.clone(),
            rail,
            locks.clone(),
            config.reconcile_epsilon.clone(),
            clock.clone(),
        );
        let admin = AdminService::new(repo.clone(), locks.clone(), clock.clone());

        Self {
            repo,
            quotes,
            issuer,
            reconciliation,
            admin,
            locks,
            clock,
            fee_schedule,
            webhook_secret: config.rail_webhook_secret.clone(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/quotes", post(handlers::transfers::preview_quote))
        .route(
            "/transfers",
            post(handlers::transfers::create_transfer).get(handlers::transfers::list_transfers),
        )
        .route("/transfers/:id", get(handlers::transfers::get_transfer))
        .route(
            "/transfers/:id/virtual-account",
            post(handlers::transfers::issue_virtual_account),
        )
        .route(
            "/transfers/:id/reconcile",
            post(handlers::transfers::reconcile_transfer),
        )
        .route(
            "/transfers/:id/cancel",
            post(handlers::transfers::cancel_transfer),
        )
        .route(
            "/webhooks/payments",
            post(handlers::webhook::payment_notification),
        )
        .route(
            "/admin/transfers/:id/approve",
            post(handlers::admin::approve_transfer),
        )
        .route(
            "/admin/transfers/:id/payout-confirmed",
            post(handlers::admin::confirm_payout),
        )
        .route(
            "/admin/transfers/:id/override",
            post(handlers::admin::override_status),
        )
        .route(
            "/admin/transfers/:id/history",
            get(handlers::admin::transfer_history),
        )
        .route("/admin/fee-schedule", put(handlers::admin::update_fee_schedule))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
