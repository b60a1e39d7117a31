//! Ninja Blog - a small blog module
//!
//! Posts, tags and threaded comments over SQLite or MySQL, with read-only
//! routing for the index, tag pages and single posts.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
