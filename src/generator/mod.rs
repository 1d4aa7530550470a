pub mod analysis;
pub mod context;
pub mod error;
pub mod router;
pub mod state;
pub mod step_forward_agent;
pub mod tool_dispatch;
pub mod workflow;
