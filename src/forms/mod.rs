//! Form synthesis from tool input schemas.
//!
//! - [`schema`]: JSON Schema → closed [`SchemaField`] tree
//! - [`widget`]: [`SchemaField`] → [`Widget`] tree
//! - [`values`]: flat, path-keyed submitted values
//! - [`collect`]: values → argument payload, with validation
//!
//! ```rust
//! use mcp_dashboard::forms::{FormValues, collect, parse_input_schema};
//! use serde_json::json;
//!
//! let schema = parse_input_schema(&json!({
//!     "type": "object",
//!     "properties": { "age": { "type": "number" } },
//!     "required": ["age"]
//! })).unwrap();
//!
//! let mut values = FormValues::new();
//! assert!(collect(&schema, &values).is_err());
//!
//! values.insert("age", "30");
//! assert_eq!(collect(&schema, &values).unwrap(), json!({ "age": 30 }));
//! ```

pub mod collect;
pub mod schema;
pub mod values;
pub mod widget;

pub use collect::{collect, collect_json};
pub use schema::{FieldKind, SchemaField, parse_input_schema};
pub use values::{FormOp, FormValues};
pub use widget::{Control, Widget, render};
