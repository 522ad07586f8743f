//! Parametrize text templates (prompts, emails, reports) with named values and
//! render them to final text.
//!
//! ```
//! use paramforge::{render_text, Context};
//!
//! let ctx = Context::new().with("name", "Ana");
//! assert_eq!(render_text("Hello {{name}}!", &ctx).unwrap(), "Hello Ana!");
//! ```

pub mod ast;
pub mod context;
pub mod engine;
pub mod errors;
pub mod expression;
pub mod filters; // builtin filter table
pub mod lexer;
pub mod parser;
pub mod store;
pub mod value;
mod comparison;
mod renderer;

pub use context::Context;
pub use engine::{parse, render, render_text, Template};
pub use errors::{Error, ParseError, RenderError, Result, StoreError};
pub use lexer::SyntaxOptions;
pub use renderer::{LoopState, LOOP_VAR};
pub use store::ParameterStore;
pub use value::{Map, Value};
