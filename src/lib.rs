pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod hosts;
pub mod models;
pub mod nutritionix;
pub mod pagination;
pub mod password;
pub mod routes;
pub mod state;
