pub mod agent;
pub mod config;
pub mod errors;
pub mod gitops;
pub mod issue_ref;
pub mod launcher;
pub mod logging;
pub mod orchestrator;
pub mod pool;
pub mod server;
pub mod tracker;
pub mod workflow;
