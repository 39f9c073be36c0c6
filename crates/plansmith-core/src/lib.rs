//! Core domain logic for plansmith: plan generation through an LLM,
//! materialization of plans into a GitHub repository, and the tracker
//! client those workflows drive.

pub mod due_date;
pub mod llm;
pub mod plan;
pub mod tracker;
