pub mod args;
pub mod env;
pub mod file;
