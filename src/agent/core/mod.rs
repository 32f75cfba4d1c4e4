// Module declarations
mod action_executor;
mod agent;
mod browser_state;
mod config;
mod llm_integration;
mod processor;

pub use agent::Agent;
pub use config::AgentConfig;
