pub mod config;
pub mod db;
pub mod favorites;
pub mod models;
pub mod photo_cache;
pub mod photo_library;
pub mod secure_store;
pub mod webdav_service;
pub mod webdav_xml;
