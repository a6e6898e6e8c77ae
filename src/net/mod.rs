//! Connectivity tracking for the auth core.

pub mod connectivity;

pub use connectivity::ConnectivityMonitor;
