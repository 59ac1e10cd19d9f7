// src/tools/mod.rs

//! External capabilities the pipeline calls into: a chat model and an
//! integer-program solver.

pub mod llm;
pub mod scripted;
pub mod solver;

pub use llm::{ChatMessage, ChatRequest, LlmClient, OpenAiCompatibleClient, TransportError};
pub use scripted::ScriptedClient;
pub use solver::{BranchAndBound, IntegerProgram, IpSolver, SolveStatus, SolverOutcome};
