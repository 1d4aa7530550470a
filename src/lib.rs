pub mod cli;
pub mod config;
pub mod generator;
pub mod i18n;
pub mod llm;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use generator::context::GeneratorContext;
pub use generator::error::RunError;
pub use generator::state::ValidationReport;
pub use generator::workflow::{LaunchMode, PipelineDriver, launch, run_pipeline};
