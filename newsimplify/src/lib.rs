// Library interface for newsimplify modules
// This allows tests and other binaries to import modules

pub mod llm;
pub mod search;
pub mod extraction;
pub mod browser;
pub mod tools;
pub mod prompt;
pub mod sessions;
pub mod server;
