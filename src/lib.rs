//! TripNest - A multi-role tourism marketplace
//!
//! Admins curate categories and their dynamic forms, service providers
//! submit destinations into the categories they are assigned, and users
//! browse, like and comment on what has been approved.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
