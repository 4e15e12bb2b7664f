pub mod error;
pub mod types;
pub mod value;

pub use error::{ErrorKind, Operation, Result, StoreError};
pub use types::{Document, DocumentPath, Fields, to_fields};
pub use value::Value;
