use lazy_static::lazy_static;
use schema::SchemaCatalog;

pub mod beamline;
pub mod element;
pub mod error;
pub mod persistence;
pub mod position;
pub mod schema;
pub mod session;
pub mod validate;
pub mod watchpoint;

lazy_static! {
    // Built-in element and report model schemas
    pub static ref SCHEMA: SchemaCatalog = SchemaCatalog::default();
}
