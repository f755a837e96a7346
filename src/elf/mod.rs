pub mod needed;
pub mod symbols;
