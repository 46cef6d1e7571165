//! Active-record models over a remote REST resource.
//!
//! A [`Model`] binds a schema-backed [`FieldContainer`] to a resource name, a
//! shared client and a parser. It tracks whether its record was loaded from
//! the service, whether local edits were saved, and which keys changed.
//!
//! ```no_run
//! use restmodel::prelude::*;
//!
//! # fn main() -> restmodel::Result<()> {
//! let client = Client::http(ClientConfig::new("people", "https://api.example.com/v1"))?.shared();
//! let schema = Schema::new()
//!     .field("id", FieldDescription::new("auto"))
//!     .field("name", FieldDescription::new("string").length(64));
//!
//! let mut person = Model::builder("person")
//!     .schema(schema)
//!     .client(client)
//!     .parser(JsonParser::new())
//!     .build()?;
//! person.set("name", "Ada")?;
//! person.save()?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use restmodel_core::error::{Error, ModelError, ModelErrorKind, Result, ValidationError};
use restmodel_core::{
    FieldContainer, KindRegistry, Schema, Uploads, ValidityAggregation, Value, ValueExchange,
    Values,
};
use restmodel_http::{Request, SharedClient};

use crate::inflector;
use crate::iterator::ModelIterator;
use crate::parser::{Parsed, Parser};

/// Key prefix marking a non-scalar value sent as JSON text.
pub const SERIALIZED_PREFIX: &str = "__serialized|";

/// Sort direction for collection requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(OrderDirection::Asc),
            "desc" => Ok(OrderDirection::Desc),
            _ => Err(ModelError::new(
                ModelErrorKind::InvalidOrder,
                format!("trying to set an invalid order by direction : {}", s),
            )
            .into()),
        }
    }
}

/// A resource type known at compile time.
///
/// ```
/// use restmodel::{FieldDescription, Model, Resource, Schema};
///
/// struct Person;
///
/// impl Resource for Person {
///     const OBJECT_NAME: &'static str = "person";
///
///     fn schema() -> Schema {
///         Schema::new()
///             .field("id", FieldDescription::new("auto"))
///             .field("name", FieldDescription::new("string"))
///     }
/// }
///
/// let person = Model::builder_for::<Person>().build().unwrap();
/// assert_eq!(person.object_name(), "person");
/// ```
pub trait Resource {
    const OBJECT_NAME: &'static str;
    const PRIMARY_KEY: &'static str = "id";

    fn schema() -> Schema;
}

/// Configuration for a [`Model`].
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    object_name: String,
    service_name: Option<String>,
    schema: Option<Schema>,
    primary_key: String,
    mapping: Vec<(String, String)>,
    disable_plural: bool,
    allow_schema_override: bool,
    dispatch_lock: bool,
    multipart: bool,
    client: Option<SharedClient>,
    parser: Option<Arc<dyn Parser>>,
    kinds: KindRegistry,
    aggregation: ValidityAggregation,
    id: Option<Value>,
}

impl ModelBuilder {
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            service_name: None,
            schema: None,
            primary_key: "id".to_string(),
            mapping: Vec::new(),
            disable_plural: false,
            allow_schema_override: true,
            dispatch_lock: false,
            multipart: false,
            client: None,
            parser: None,
            kinds: KindRegistry::new(),
            aggregation: ValidityAggregation::default(),
            id: None,
        }
    }

    /// Resource name used in request paths; defaults to the object name.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Explicit schema; without one the client is asked to describe the
    /// resource.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    /// Expose storage key `internal` under the attribute name `external`.
    pub fn map_attribute(mut self, external: impl Into<String>, internal: impl Into<String>) -> Self {
        self.mapping.push((external.into(), internal.into()));
        self
    }

    pub fn disable_plural(mut self, disable: bool) -> Self {
        self.disable_plural = disable;
        self
    }

    /// Whether a missing schema may fall back to an empty one.
    pub fn allow_schema_override(mut self, allow: bool) -> Self {
        self.allow_schema_override = allow;
        self
    }

    pub fn dispatch_lock(mut self, lock: bool) -> Self {
        self.dispatch_lock = lock;
        self
    }

    pub fn multipart(mut self, multipart: bool) -> Self {
        self.multipart = multipart;
        self
    }

    pub fn client(mut self, client: SharedClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    pub fn shared_parser(mut self, parser: Arc<dyn Parser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Extra type tags for custom field kinds.
    pub fn kinds(mut self, kinds: KindRegistry) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn aggregation(mut self, aggregation: ValidityAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Load this record as part of [`build`](Self::build).
    pub fn id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn build(self) -> Result<Model> {
        let mut mapping = BTreeMap::new();
        for (external, internal) in self.mapping {
            if external == internal {
                return Err(ModelError::new(
                    ModelErrorKind::Mapping,
                    "Mapping key/value pairs cannot be identical",
                )
                .into());
            }
            mapping.insert(external, internal);
        }

        let service_name = self
            .service_name
            .unwrap_or_else(|| self.object_name.clone());
        let mut model = Model {
            object_name: self.object_name,
            service_name,
            primary_key: self.primary_key,
            schema: self.schema,
            kinds: self.kinds,
            aggregation: self.aggregation,
            storage: FieldContainer::default(),
            mapping,
            client: self.client,
            parser: self.parser,
            disable_plural: self.disable_plural,
            allow_schema_override: self.allow_schema_override,
            multipart: self.multipart,
            loaded: false,
            saved: false,
            changed: Vec::new(),
            dispatch_lock: self.dispatch_lock,
            request: None,
            order_by: None,
            limit: None,
        };
        model.storage = model.fresh_storage()?;

        if let Some(id) = self.id {
            model.find(id)?;
        }
        Ok(model)
    }
}

/// One record of a remote resource.
#[derive(Debug, Clone)]
pub struct Model {
    object_name: String,
    service_name: String,
    primary_key: String,
    schema: Option<Schema>,
    kinds: KindRegistry,
    aggregation: ValidityAggregation,
    storage: FieldContainer,
    mapping: BTreeMap<String, String>,
    client: Option<SharedClient>,
    parser: Option<Arc<dyn Parser>>,
    disable_plural: bool,
    allow_schema_override: bool,
    multipart: bool,
    loaded: bool,
    saved: bool,
    changed: Vec<String>,
    dispatch_lock: bool,
    request: Option<Request>,
    order_by: Option<(String, OrderDirection)>,
    limit: Option<(u64, u64)>,
}

impl Model {
    pub fn builder(object_name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(object_name)
    }

    pub fn builder_for<R: Resource>() -> ModelBuilder {
        ModelBuilder::new(R::OBJECT_NAME)
            .primary_key(R::PRIMARY_KEY)
            .schema(R::schema())
    }

    // ==================== Identity and collaborators ====================

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Value of the primary-key field.
    pub fn id(&self) -> Value {
        self.get(&self.primary_key)
    }

    /// Collection endpoint name.
    pub fn collection_name(&self) -> String {
        if self.disable_plural {
            self.service_name.clone()
        } else {
            inflector::plural(&self.service_name)
        }
    }

    pub fn client(&self) -> Option<&SharedClient> {
        self.client.as_ref()
    }

    pub fn set_client(&mut self, client: SharedClient) -> &mut Self {
        self.client = Some(client);
        self
    }

    pub fn parser(&self) -> Option<&Arc<dyn Parser>> {
        self.parser.as_ref()
    }

    pub fn set_parser(&mut self, parser: Arc<dyn Parser>) -> &mut Self {
        self.parser = Some(parser);
        self
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn fields(&self) -> &FieldContainer {
        &self.storage
    }

    pub fn is_multipart(&self) -> bool {
        self.multipart
    }

    /// The last request built, while it is pending or deferred.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    // ==================== State ====================

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Keys written since the last load, in first-write order.
    pub fn changed(&self) -> &[String] {
        &self.changed
    }

    pub fn dispatch_lock(&self) -> bool {
        self.dispatch_lock
    }

    /// While set, operations build their request without sending it.
    pub fn set_dispatch_lock(&mut self, lock: bool) -> &mut Self {
        self.dispatch_lock = lock;
        self
    }

    // ==================== Attributes ====================

    /// Map the attribute name `external` onto storage key `internal`.
    pub fn map_attribute(&mut self, external: &str, internal: &str) -> Result<&mut Self> {
        if external == internal {
            return Err(ModelError::new(
                ModelErrorKind::Mapping,
                "Mapping key/value pairs cannot be identical",
            )
            .into());
        }
        self.mapping.insert(external.to_string(), internal.to_string());
        Ok(self)
    }

    fn resolve(&self, name: &str) -> Option<String> {
        let key = self.mapping.get(name).map_or(name, String::as_str);
        self.storage.contains(key).then(|| key.to_string())
    }

    /// Value of an attribute; null when the name is unknown.
    pub fn get(&self, name: &str) -> Value {
        self.resolve(name)
            .map_or(Value::Null, |key| self.storage.get(&key))
    }

    /// Write an attribute, marking the model unsaved.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let Some(key) = self.resolve(name) else {
            return Err(ModelError::new(
                ModelErrorKind::UnknownKey,
                format!("the key '{}' is not available in this model", name),
            )
            .into());
        };
        self.storage.set(&key, value)?;
        self.saved = false;
        if !self.changed.contains(&key) {
            self.changed.push(key);
        }
        Ok(())
    }

    /// Reset one attribute to null.
    pub fn unset(&mut self, name: &str) -> Result<()> {
        self.set(name, Value::Null)
    }

    /// Write many attributes through [`set`](Self::set).
    ///
    /// Keys prefixed with `__serialized|` carry JSON text and are decoded.
    pub fn set_values(&mut self, values: Values) -> Result<&mut Self> {
        for (key, value) in values {
            let (key, value) = decode_serialized(key, value)?;
            self.set(&key, value)?;
        }
        Ok(self)
    }

    /// Hydrate from a server record without dirty tracking.
    ///
    /// Keys outside the schema are skipped.
    pub fn load_values(&mut self, values: Values) -> Result<&mut Self> {
        for (key, value) in values {
            let (key, value) = decode_serialized(key, value)?;
            match self.resolve(&key) {
                Some(internal) => self.storage.hydrate(&internal, value)?,
                None => {
                    tracing::warn!(
                        model = %self.object_name,
                        key = %key,
                        "Skipping key outside the schema"
                    );
                }
            }
        }
        Ok(self)
    }

    pub fn values(&self) -> Values {
        self.storage.values()
    }

    /// Values of the changed keys only.
    pub fn changed_values(&self) -> Values {
        self.changed
            .iter()
            .map(|key| (key.clone(), self.storage.get(key)))
            .collect()
    }

    /// Attach pending uploads to autoloading file fields.
    pub fn attach_uploads(&mut self, uploads: &mut Uploads) -> Result<usize> {
        let attached = self.storage.attach_uploads(uploads)?;
        if !attached.is_empty() {
            self.saved = false;
        }
        let count = attached.len();
        for key in attached {
            if !self.changed.contains(&key) {
                self.changed.push(key);
            }
        }
        Ok(count)
    }

    // ==================== Validation ====================

    pub fn validate(&mut self) -> bool {
        self.storage.validate()
    }

    pub fn is_valid(&mut self) -> bool {
        self.storage.is_valid()
    }

    pub fn errors(&self) -> IndexMap<String, Vec<String>> {
        self.storage.errors()
    }

    pub fn messages(&self) -> IndexMap<String, Vec<String>> {
        self.storage.messages()
    }

    pub fn validation_error(&self) -> ValidationError {
        self.storage.validation_error()
    }

    // ==================== Directives ====================

    /// Sort collection requests by `field`; direction is `asc` or `desc`.
    pub fn order_by(&mut self, field: &str, direction: &str) -> Result<&mut Self> {
        let direction = direction.parse()?;
        self.order_by = Some((field.to_string(), direction));
        Ok(self)
    }

    pub fn limit(&mut self, limit: u64, offset: u64) -> &mut Self {
        self.limit = Some((limit, offset));
        self
    }

    fn add_extra_params(&self, request: &mut Request) {
        if let Some((field, direction)) = &self.order_by {
            request.add_get_param("order", field.as_str());
            request.add_get_param("direction", direction.as_str());
        }
        if let Some((limit, offset)) = self.limit {
            request.add_get_param("limit", limit.to_string());
            request.add_get_param("offset", offset.to_string());
        }
    }

    // ==================== Remote operations ====================

    /// Load the record whose primary key equals `id`.
    #[tracing::instrument(level = "debug", skip(self, id), fields(model = %self.object_name))]
    pub fn find(&mut self, id: impl Into<Value>) -> Result<&mut Self> {
        let id = id.into();
        self.request = Some(
            Request::get()
                .with_url_param(self.service_name.as_str())
                .with_get_param(self.primary_key.as_str(), id.to_text()),
        );
        self.load_result()?;
        Ok(self)
    }

    /// Fetch a collection, optionally filtered.
    ///
    /// This model is used as the prototype for every record and its own
    /// state is left alone. Under the dispatch lock the returned iterator is
    /// empty and carries the pending request.
    #[tracing::instrument(level = "debug", skip(self, filters), fields(model = %self.object_name))]
    pub fn find_all<I, K, V>(&mut self, filters: I) -> Result<ModelIterator>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut request = Request::get()
            .with_url_param(self.collection_name())
            .with_single_record(false);
        let mut filters = filters.into_iter().peekable();
        if filters.peek().is_some() {
            request.add_get_param("search", "search");
            for (key, value) in filters {
                request.add_get_param(key, value.into().to_text());
            }
        }
        self.request = Some(request);

        match self.load_result()? {
            Some(Parsed::Collection(iterator)) => Ok(iterator),
            Some(other) => Err(ModelError::new(
                ModelErrorKind::Parse,
                format!("expected a collection, the parser returned {:?}", other),
            )
            .into()),
            None => {
                let mut deferred = ModelIterator::new(Vec::new(), self.prototype()?);
                if let Some(request) = &self.request {
                    deferred = deferred.with_request(request.clone());
                }
                Ok(deferred)
            }
        }
    }

    /// Send local changes: POST when new, PUT when loaded.
    ///
    /// Does nothing if the model is saved and unchanged. Fails with
    /// `ModelError { kind: Invalid }` listing every failure when validation
    /// does not pass.
    #[tracing::instrument(level = "debug", skip(self), fields(model = %self.object_name))]
    pub fn save(&mut self) -> Result<&mut Self> {
        if self.saved && self.changed.is_empty() {
            tracing::debug!("Nothing to save");
            return Ok(self);
        }

        if !self.validate() {
            let validation = self.storage.validation_error();
            let listing = validation
                .errors
                .iter()
                .map(|e| format!("{}: {} ({})", e.field, e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::Model(ModelError {
                kind: ModelErrorKind::Invalid,
                message: format!("the model is not valid: {}", listing),
                validation: Some(validation),
                source: None,
            }));
        }

        let payload = self.package_payload()?;
        let request = if self.loaded {
            Request::put()
                .with_url_param(self.service_name.as_str())
                .with_url_param(self.id().to_text())
        } else {
            Request::post().with_url_param(self.service_name.as_str())
        };
        self.request = Some(request.with_post_params(payload).with_single_record(true));
        self.load_result()?;
        Ok(self)
    }

    /// Delete the loaded record, then reset the model.
    ///
    /// Does nothing if the model is not loaded. The model is kept when the
    /// request never reached the service or the dispatch lock is set;
    /// otherwise it is reset and any service error is returned afterwards.
    #[tracing::instrument(level = "debug", skip(self), fields(model = %self.object_name))]
    pub fn delete(&mut self) -> Result<&mut Self> {
        if !self.loaded {
            return Ok(self);
        }
        self.request = Some(
            Request::delete()
                .with_url_param(self.object_name.as_str())
                .with_url_param(self.id().to_text()),
        );

        match self.load_result() {
            Ok(None) => Ok(self),
            Ok(Some(_)) => {
                self.reset()?;
                Ok(self)
            }
            Err(e) if reached_service(&e) => {
                self.reset()?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Forget the record: clear state and rebuild fields from the schema.
    pub fn reset(&mut self) -> Result<&mut Self> {
        self.loaded = false;
        self.saved = false;
        self.changed.clear();
        self.request = None;
        self.order_by = None;
        self.limit = None;
        self.storage = self.fresh_storage()?;
        Ok(self)
    }

    /// A clean copy with the same schema, collaborators and configuration.
    pub fn prototype(&self) -> Result<Model> {
        let mut copy = self.clone();
        copy.reset()?;
        Ok(copy)
    }

    /// Hydrate from one collection record and mark it loaded.
    pub fn load_record(&mut self, record: Values, request: Option<Request>) -> Result<&mut Self> {
        self.load_values(record)?;
        self.loaded = true;
        self.saved = true;
        self.changed.clear();
        self.request = request;
        Ok(self)
    }

    /// Values to send: nulls dropped, non-scalars as `__serialized|key` JSON.
    pub fn package_payload(&self) -> Result<Values> {
        let mut payload = Values::new();
        for (key, value) in self.values() {
            if value.is_null() {
                continue;
            }
            if value.is_scalar() {
                payload.insert(key, value);
            } else {
                let encoded = serde_json::to_string(&value)?;
                payload.insert(format!("{}{}", SERIALIZED_PREFIX, key), Value::Text(encoded));
            }
        }
        Ok(payload)
    }

    fn fresh_storage(&mut self) -> Result<FieldContainer> {
        if self.schema.is_none() {
            self.resolve_schema()?;
        }
        let schema = self.schema.as_ref().cloned().unwrap_or_default();
        Ok(FieldContainer::build(&schema, &self.kinds)?.with_aggregation(self.aggregation))
    }

    fn resolve_schema(&mut self) -> Result<()> {
        let described = match &self.client {
            Some(client) => client
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .service_description(&self.service_name),
            None => Err(ModelError::new(
                ModelErrorKind::NoClient,
                "no client available to describe the resource",
            )
            .into()),
        };

        match described {
            Ok(schema) => {
                tracing::debug!(
                    model = %self.object_name,
                    fields = schema.len(),
                    "Resolved schema from service description"
                );
                self.schema = Some(schema);
                Ok(())
            }
            Err(e) if self.allow_schema_override => {
                tracing::warn!(
                    model = %self.object_name,
                    error = %e,
                    "No service description, continuing with an empty schema"
                );
                self.schema = Some(Schema::new());
                Ok(())
            }
            Err(e) => Err(Error::Model(ModelError {
                kind: ModelErrorKind::NoSchema,
                message: format!("no schema available for '{}': {}", self.service_name, e),
                validation: None,
                source: Some(Box::new(e)),
            })),
        }
    }

    /// Dispatch the pending request and apply the parsed result.
    ///
    /// Returns `None` when the dispatch lock deferred the request.
    fn load_result(&mut self) -> Result<Option<Parsed>> {
        if self.dispatch_lock {
            tracing::debug!(model = %self.object_name, "Dispatch lock set, request deferred");
            return Ok(None);
        }
        let Some(client) = self.client.clone() else {
            return Err(ModelError::new(ModelErrorKind::NoClient, "no valid client present").into());
        };
        let Some(parser) = self.parser.clone() else {
            return Err(ModelError::new(ModelErrorKind::NoParser, "no valid parser present").into());
        };
        let Some(mut request) = self.request.take() else {
            return Err(ModelError::new(ModelErrorKind::Parse, "no request to dispatch").into());
        };

        self.add_extra_params(&mut request);
        let outcome = {
            let mut client = client.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(gateway) = client.gateway_mut() {
                gateway.set_multipart(self.multipart);
            }
            client.run(&mut request)
        };
        self.request = Some(request);
        let response = outcome?;

        let parsed = parser.parse(&response, self).map_err(|e| match e {
            Error::Parser(inner) => Error::Model(ModelError {
                kind: ModelErrorKind::Parse,
                message: format!("Failed to parse the response with message : {}", inner),
                validation: None,
                source: Some(Box::new(Error::Parser(inner))),
            }),
            other => other,
        })?;

        match &parsed {
            Parsed::Record | Parsed::Written => self.mark_loaded(),
            Parsed::Collection(_) => {
                self.order_by = None;
                self.limit = None;
            }
            Parsed::Removed => {}
        }
        Ok(Some(parsed))
    }

    fn mark_loaded(&mut self) {
        self.loaded = true;
        self.saved = true;
        self.changed.clear();
        self.request = None;
        self.order_by = None;
        self.limit = None;
    }
}

fn decode_serialized(key: String, value: Value) -> Result<(String, Value)> {
    let Some(stripped) = key.strip_prefix(SERIALIZED_PREFIX) else {
        return Ok((key, value));
    };
    let decoded = match &value {
        Value::Text(text) => Value::from(serde_json::from_str::<serde_json::Value>(text)?),
        _ => value,
    };
    Ok((stripped.to_string(), decoded))
}

/// Did the service answer (as opposed to the request never arriving)?
fn reached_service(err: &Error) -> bool {
    match err {
        Error::Service(_) => true,
        Error::Client(c) => c.status.is_some(),
        Error::Model(m) => m.kind == ModelErrorKind::Parse,
        _ => false,
    }
}

impl ValueExchange for Model {
    fn values(&self) -> Value {
        Value::Object(Model::values(self))
    }

    fn set_values(&mut self, values: Value) -> Result<()> {
        match values {
            Value::Object(map) => {
                Model::set_values(self, map)?;
                Ok(())
            }
            Value::Null => {
                self.reset()?;
                Ok(())
            }
            other => Err(Error::Serde(format!(
                "'{}' expects an object, got {}",
                self.object_name,
                other.type_name()
            ))),
        }
    }

    fn validate(&mut self) -> bool {
        Model::validate(self)
    }

    fn errors(&self) -> Vec<String> {
        self.storage
            .errors()
            .into_iter()
            .flat_map(|(key, codes)| codes.into_iter().map(move |code| format!("{}.{}", key, code)))
            .collect()
    }

    fn clone_box(&self) -> Box<dyn ValueExchange> {
        Box::new(self.clone())
    }
}
