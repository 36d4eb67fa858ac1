//! Punto Venta API Library
//!
//! Point-of-sale and inventory backend: customers, products, cash and credit
//! sales, installment payments, expenses, and profit reporting.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub auth: Arc<auth::AuthService>,
    pub services: services::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let auth = Arc::new(auth::AuthService::new(
            &config.jwt_secret,
            config.jwt_expiration,
        ));
        let services =
            services::AppServices::new(db.clone(), Arc::new(event_sender.clone()), auth.clone());

        Self {
            db,
            config,
            event_sender,
            auth,
            services,
        }
    }
}

/// Builds the application router with middleware applied.
pub fn app_router(state: AppState) -> Router {
    let mut router = handlers::api_routes();

    if state.config.cors_allow_any_origin {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
