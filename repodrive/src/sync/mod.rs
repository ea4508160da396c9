pub mod clipboard;
pub mod engine;
mod folder_ops;
pub mod paths;
pub mod tree;

#[cfg(test)]
mod engine_tests;
