pub mod api;
pub mod error;
pub mod lexicon;
pub mod llm;
pub mod webdriver;
