// MongoDB module - the driver-facing half of the middleware
//
// - config: host normalization and connection URI composition
// - connection: the live client handle and its façade methods
// - collection: `DocumentStore` over a driver collection
// - params: conversion between `DocValues` and BSON

pub mod collection;
pub mod config;
pub mod connection;
pub mod params;

pub use collection::MongoCollection;
pub use config::{SchemeDetection, build_connection_uri, normalize_host, redact_uri};
pub use connection::MongoConnection;
pub use params::{from_document, into_document};
