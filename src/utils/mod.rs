//! Utility modules for the documentation generator.

pub mod fs;
