pub mod convert;
pub mod error;
pub mod parser;

pub use convert::{Converter, DEFAULT_OUTPUT, OutputCheck};
pub use error::{ConvertError, ParseError};
pub use parser::{Record, parse_record, parse_table};
