//! # partview-entity
//!
//! Domain entity models for PartView. Every struct in this crate represents
//! a database table row or a domain value object. Row types additionally
//! derive `sqlx::FromRow`.

pub mod file;
pub mod note;
pub mod part;
