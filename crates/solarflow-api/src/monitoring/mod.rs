// Monitoring API surface: client transport, endpoints and wire types.

pub mod client;
pub mod models;
mod sites;
