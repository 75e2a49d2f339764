pub mod config;

pub mod db;

pub mod rest;

pub mod openapi;

pub mod error_convert;

pub mod telemetry;

pub mod health;

pub mod storage;

// Road damage domain modules
pub mod repo;

pub mod triage;
