//! afya-gateway - HTTP API for AfyaMkononi
//!
//! Exposes the agent orchestrator, the consultation and vitals records, and
//! the mock M-Pesa endpoints to the web client.

pub mod protocol;
pub mod server;

pub use server::{GatewayServer, GatewayState};
