//! HTTP API

pub mod views;
