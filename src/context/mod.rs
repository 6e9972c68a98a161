//! Context Pack Builder
//!
//! Turns a facts document into budgeted, fingerprinted prompt material for
//! one section. Selection is a pure function of (facts, section, synopses,
//! budget): no randomness, clock or object identity takes part.

mod budget;
mod builder;
mod pack;
mod policy;
mod synopsis;
mod template;

pub use budget::{Budget, TokenBudget, TokenCounter};
pub use builder::{ContextPackBuilder, PackRequest};
pub use pack::{ContextPack, fingerprint};
pub use policy::RankingPolicy;
pub use synopsis::{OutlineExcerpt, Synopsis};
pub use template::PromptTemplate;
