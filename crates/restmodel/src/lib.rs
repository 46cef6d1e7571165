//! RestModel Rust: remote REST resources as validating, schema-driven models.
//!
//! A [`Model`] is an active record for one resource. Its fields come from a
//! [`Schema`], either declared in code or fetched from the service through
//! the client's [`SchemaSource`]. Operations build a [`Request`], run it
//! through a shared [`Client`] and hand the [`Response`] to a [`Parser`]:
//!
//! - [`Model::find`] loads one record by primary key
//! - [`Model::find_all`] fetches a collection as a [`ModelIterator`]
//! - [`Model::save`] validates, then POSTs a new record or PUTs a loaded one
//! - [`Model::delete`] removes a loaded record and resets the model
//!
//! Most applications only need the prelude:
//!
//! ```
//! use restmodel::prelude::*;
//!
//! let schema = Schema::new()
//!     .field("id", FieldDescription::new("auto"))
//!     .field("title", FieldDescription::new("string").length(120));
//! let mut book = Model::builder("book").schema(schema).build().unwrap();
//!
//! book.set("title", "Dune").unwrap();
//! assert!(book.is_valid());
//! assert_eq!(book.changed(), ["title"]);
//! ```

pub mod inflector;
pub mod iterator;
pub mod model;
pub mod parser;

pub use iterator::{IntoModels, ModelIterator};
pub use model::{Model, ModelBuilder, OrderDirection, Resource, SERIALIZED_PREFIX};
pub use parser::{JsonParser, Parsed, Parser};

pub use restmodel_core::{
    Error, Field, FieldContainer, FieldDescription, FieldKind, FieldOption, KindRegistry,
    ModelError, ModelErrorKind, Result, Schema, UploadedFile, Uploads, ValidationError,
    ValidityAggregation, Value, ValueExchange, Values,
};
#[cfg(feature = "http")]
pub use restmodel_http::HttpTransport;
pub use restmodel_http::{
    Client, ClientConfig, ClientRegistry, DescribeEndpoint, Envelope, Gateway, Method, Request,
    Response, ScriptedTransport, SchemaSource, SharedClient, StaticSchemas, Transport,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Client, ClientConfig, ClientRegistry, Error, FieldDescription, JsonParser, Model,
        ModelIterator, OrderDirection, Request, Resource, Result, Schema, SharedClient, Value,
        Values,
    };
}
