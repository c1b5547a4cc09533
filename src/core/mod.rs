pub mod config;
pub mod generator;
pub mod parser;
pub mod random;
pub mod registry;
pub mod symbol;
pub mod table;
pub mod value;
