mod id;
mod layer;
mod record;
mod schema;

pub use id::TargetId;
pub use layer::{SourceLayer, TargetLayer};
pub use record::{SourceRecord, TargetRecord};
pub use schema::{normalize_field_name, FieldSchema};
