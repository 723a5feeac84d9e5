//! Model Context Protocol server: capability registries, dispatch, JSON-RPC
//! routing and the stdio transport.

pub mod context;
pub mod dispatcher;
pub mod registry;
pub mod rpc;
pub mod server;
pub mod transport;
