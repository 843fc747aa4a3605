// src/models/mod.rs

pub mod attempt;
pub mod grade;
pub mod practice;
pub mod user;
