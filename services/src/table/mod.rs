//! The listing pipeline: parse a request into a [`QuerySpec`], run it with the
//! [`TableQueryEngine`] and shape the [`ResultPage`] for the wire.

pub mod engine;
pub mod error;
pub mod filter;
pub mod packer;
pub mod query;

pub use engine::{ResultPage, TableQueryEngine};
pub use error::{TableError, TableErrorResponse, ValidationError};
pub use packer::{DataTableResponse, pack, pack_csv};
pub use query::{QueryLimits, QuerySpec, QuerySpecBuilder, RawListingParams};
