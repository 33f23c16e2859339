//! Method level metadata: body headers and the attribute flags of `MethodDef` rows.

mod body;
mod types;

pub use body::{MethodBody, TINY_MAX_STACK};
pub use types::*;
