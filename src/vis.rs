pub mod frame;
pub mod gif;
pub mod png;
