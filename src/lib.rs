#![doc = "The `taskkeeper` library crate."]
#![doc = ""]
#![doc = "Domain models, the storage seam, authentication, account notifications and"]
#![doc = "the HTTP routes of the task manager service. The binary (`main.rs`) only"]
#![doc = "loads configuration, picks a store and a mailer, and starts the server."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
