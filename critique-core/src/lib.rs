pub mod model;
pub mod openai;
pub mod prompt;
pub mod service;
pub mod synthetic;
pub mod validate;

pub use model::*;
pub use openai::OpenAiClient;
pub use service::{request_analysis, request_fix, InvokeError, ReasoningService};
pub use validate::normalize_analysis;
