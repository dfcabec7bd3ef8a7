pub mod parser;

pub use parser::{DocumentParser, ParsedDocument};
