pub mod aligner;
pub mod alignment;
pub mod config;
pub mod context;
pub mod errors;
pub mod graph;
pub mod index;
pub mod io;
