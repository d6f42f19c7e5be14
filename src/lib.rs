pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod mail;
pub mod pagination;
pub mod posts;
pub mod state;
pub mod storage;
pub mod users;
