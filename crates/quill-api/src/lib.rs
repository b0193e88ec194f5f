pub mod auth;
pub mod categories;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod routes;
pub mod search;
pub mod series;
pub mod session;
pub mod settings;
pub mod tags;
pub mod uploads;
