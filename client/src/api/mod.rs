pub mod auth;
pub mod client;
pub mod minigames;
pub mod rcon;
pub mod services;
pub mod users;

pub use auth::AuthApi;
pub use client::{ApiClient, ApiError};
pub use minigames::{MinigameApi, PaginationParams};
pub use rcon::RconApi;
pub use services::{ServiceApi, ServicePaginationParams};
pub use users::UserAdminApi;
