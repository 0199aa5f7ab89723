//! Study schema: the ordered independent variables a file name is classified by.

pub mod axis;
pub mod model;
mod validation;

pub use axis::{Axis, AxisDefinition, ABSENT_TOKEN};
pub use model::{MetadataEdit, SchemaModel, SchemaState};
