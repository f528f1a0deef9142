//! Go model emission
//!
//! Renders one table's transformed fields into a GORM-style model file with
//! MiniJinja. The output is the raw text the rewriter post-processes: it
//! always declares `TableName()` on a pointer receiver and is not aligned the
//! way gofmt would align it beyond the name and type columns.

pub mod emitter;

pub use emitter::{ModelEmitter, ModelSpec, RenderError, GENERATOR_NAME};
