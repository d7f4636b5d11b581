// ai module - providers, prompts, the deadline-bound invoker and the generation loop

pub mod api;
pub mod generation;
pub mod invoker;
pub mod prompts;

// re-export key public items for convenient access
pub use api::{build_provider, CompletionProvider, Provider};
pub use generation::{GenerationAttempt, MessageLoop, Outcome, ReviewChoice, MAX_ATTEMPTS};
pub use invoker::invoke;
pub use prompts::{build_prompt, Refinement};
