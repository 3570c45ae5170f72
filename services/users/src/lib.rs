//! User management service
//!
//! CRUD over user accounts with role sets, pagination, argon2 password
//! hashing and JWT sign-in, served over HTTP with axum.

pub mod config;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod validation;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    jwt::{JwtKey, JwtService},
    password::PasswordService,
    repositories::{RoleStore, UserStore},
    services::{AuthService, RoleResolver, UserService},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub role_resolver: RoleResolver,
    pub auth_service: AuthService,
    pub jwt_service: JwtService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the services on top of the given stores
    pub fn new(
        user_store: Arc<dyn UserStore>,
        role_store: Arc<dyn RoleStore>,
        jwt_key: &JwtKey,
        config: AppConfig,
    ) -> Self {
        let jwt_service = JwtService::new(jwt_key, config.jwt_expiry_seconds);
        let role_resolver = RoleResolver::new(role_store);
        let user_service = UserService::new(
            user_store,
            role_resolver.clone(),
            PasswordService::new(),
        );
        let auth_service = AuthService::new(user_service.clone(), jwt_service.clone());

        Self {
            user_service,
            role_resolver,
            auth_service,
            jwt_service,
            config: Arc::new(config),
        }
    }
}
