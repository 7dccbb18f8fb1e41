//! Bundled provider backends.

pub mod openai;

pub use openai::OpenAiProvider;
