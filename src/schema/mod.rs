mod registry;
mod table;
mod value;

pub use registry::{HistoryBuilder, RegistryBuilder, Revision, SchemaRegistry};
pub use table::{FieldDef, FieldKind, SchemaSet, TableDef};
pub(crate) use table::quote_ident;
pub use value::{Record, Value};
