//! # Schedule Module
//!
//! Prompt-validation-and-schedule-normalization pipeline.
//! Gates user input BEFORE spending a generation call, then repairs the
//! model's output into an exact schedule.
//!
//! ## Components
//! - `classifier`: turns a prompt into a category/confidence/reasoning triple via the gateway
//! - `validator`: two-tier accept/reject gate (classifier verdict, heuristic fallback)
//! - `normalizer`: array extraction, filtering, and equal-division remainder correction

pub mod classifier;
pub mod normalizer;
pub mod validator;

pub use classifier::IntentClassifier;
pub use normalizer::ScheduleService;
pub use validator::{evaluate_prompt, PromptValidator, Verdict};
