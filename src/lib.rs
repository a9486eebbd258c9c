//! Client library for the ringside combat-sport platform: REST services,
//! the STOMP live channel, session handling, route guarding and the bout
//! reconciliation stores.

pub mod config;
pub mod dto;
pub mod error;
pub mod live;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_support;
