//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection
//! - One forwarder thread per SUBSCRIBE, pushing messages to its socket
//! - Commands routed through Engine

mod server;
mod connection;

pub use server::Server;
pub use connection::Connection;
