pub mod argument;
pub mod parsers;
pub mod resolver;
pub mod variants;
