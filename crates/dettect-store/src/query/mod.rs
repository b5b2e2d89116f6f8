//! Query language
//!
//! Boolean comparisons over administration records, used to narrow an
//! administration file before reports are generated.

pub mod eval;
pub mod filter;
pub mod parser;

pub use filter::FsQueryFilter;
pub use parser::{parse, CmpOp, Expr, Literal};
