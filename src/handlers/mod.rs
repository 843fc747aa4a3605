// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod grades;
pub mod practices;
pub mod users;
