pub mod api;
pub mod archive;
pub mod cli;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod lookup;
pub mod model;
pub mod schema;
pub mod volume;

pub use api::{ArchiveConverter, ConversionOptions, ExportSummary, LookupConfig};
pub use archive::Archive;
pub use cli::report::TextReport;
pub use error::{Result, TomoError};
pub use lookup::{IdentifierLookup, TcpLookup};
pub use model::*;
