//! # Marketplace payment server
//! This crate hosts the HTTP edge of the payment reconciliation service. It is responsible for:
//! * Listening for incoming webhook deliveries from the payment provider.
//! * Verifying each delivery's signature and freshness before anything else looks at it.
//! * Handing verified events to the reconciliation engine and translating the outcome into a
//!   response the provider's retry loop understands.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/payments`: The webhook route for receiving payment events from the provider.
//! * `/api/subscription/{company_id}`: Read-only view of a company's subscription state.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
