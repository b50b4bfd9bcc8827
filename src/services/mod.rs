/// Answer submission, deduplication, and the answer-lock path.
pub mod answer_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// AI question generation orchestrator.
pub mod generation;
/// Health check service.
pub mod health_service;
/// Phase transitions driven by the host.
pub mod phase_service;
/// Round lifecycle: prompter selection, prompts, and generated options.
pub mod round_service;
/// Pure scoring arithmetic.
pub mod scoring;
/// Session bootstrap, joining, kicking, and read-only projections.
pub mod session_service;
