pub mod automaton;
pub mod config;
pub mod encode;
pub mod extract;
pub mod matrix;
pub mod pipeline;
