mod resources;

pub use resources::{resources_schema, ResourceQuery, ResourcesDataSource};
