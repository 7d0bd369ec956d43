//! Listora - A real-estate listings content service
//!
//! This library provides the collections, access rules, sitemaps and HTTP
//! API behind the Listora site.

pub mod access;
pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
