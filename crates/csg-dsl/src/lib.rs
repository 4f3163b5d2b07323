//! Postfix drawing programs: the grammar symbol table, a parser producing
//! [`Expression`] values, their canonical serialization, and the stack
//! machine that renders them onto occupancy canvases.
//!
//! ```text
//! c(32,32,16) s(24,40,8) + t(40,24,12) - $
//! ```
//!
//! Primitives push a canvas, operators pop two and push their combination,
//! and `$` ends the program.

pub mod grammar;
pub mod parser;
pub mod program;
pub mod render;

pub use grammar::{Grammar, GrammarError, STOP_SYMBOL};
pub use parser::{ParseError, canonicalize, parse, parse_with_budget};
pub use program::{Expression, ParamSlot, Token};
pub use render::{Renderer, StackError, check_structure, render, render_at};
