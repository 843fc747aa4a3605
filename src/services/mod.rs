// src/services/mod.rs

pub mod attempts;
pub mod grades;
pub mod scoring;
pub mod test_catalog;
