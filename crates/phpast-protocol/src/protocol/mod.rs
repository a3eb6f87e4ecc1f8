//! Request and response contracts exchanged with the peer.
//!
//! Records arrive as mapping-shaped [`Record`] values regardless of the wire
//! format. [`Request::from_record`] validates one record; responses are
//! assembled through [`ResponseBuilder`] so that a half-built response in the
//! `pending` state never leaves this module.
//!
//! # Wire shape
//!
//! ```text
//! request:  {"content": "<?php echo 1;", "metadata": {"name": "a.php"}}
//! response: {"ast": {...}, "driverId": "phpast:0.1.0",
//!            "metadata": {"name": "a.php"}, "status": "ok", "errors": []}
//! ```

use serde_json::{Map, Value};

use crate::failure::{Failure, WRONG_REQUEST_FORMAT};

/// A decoded record: one request or response unit, independent of wire format.
pub type Record = Value;

/// The opaque tree produced by an extractor.
pub type Ast = Value;

/// Identifier of this driver implementation and its AST schema version.
pub const DRIVER_ID: &str = concat!("phpast:", env!("CARGO_PKG_VERSION"));

/// Identity fields echoed from a request into its response.
///
/// All fields are optional. [`Identity::recover`] extracts whatever is present
/// on a raw record, which lets fatal responses for invalid requests still
/// carry the caller's identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    id: Option<Value>,
    name: Option<String>,
    language: Option<Value>,
    language_version: Option<Value>,
}

impl Identity {
    /// Extracts identity fields from a raw record without validating it.
    ///
    /// Non-map records yield an empty identity. The name is read from
    /// `metadata.name`, falling back to a top-level `name`; only string
    /// names are kept.
    #[must_use]
    pub fn recover(record: &Record) -> Self {
        let Some(fields) = record.as_object() else {
            return Self::default();
        };

        let name = fields
            .get("metadata")
            .and_then(|metadata| metadata.get("name"))
            .and_then(Value::as_str)
            .or_else(|| fields.get("name").and_then(Value::as_str))
            .map(str::to_owned);

        Self {
            id: present(fields, "id"),
            name,
            language: present(fields, "language"),
            language_version: present(fields, "languageVersion")
                .or_else(|| present(fields, "language_version")),
        }
    }

    /// Returns the opaque request identifier.
    #[must_use]
    pub const fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// Returns the human-readable request label.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the language hint.
    #[must_use]
    pub const fn language(&self) -> Option<&Value> {
        self.language.as_ref()
    }

    /// Returns the language version hint.
    #[must_use]
    pub const fn language_version(&self) -> Option<&Value> {
        self.language_version.as_ref()
    }
}

fn present(fields: &Map<String, Value>, key: &str) -> Option<Value> {
    fields.get(key).filter(|value| !value.is_null()).cloned()
}

/// A validated analysis request.
///
/// Requests are immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    identity: Identity,
    content: String,
}

impl Request {
    /// Validates a raw record and builds a request from it.
    ///
    /// # Errors
    ///
    /// Returns a validation [`Failure`] when the record is not a map or its
    /// `content` field is missing or not a string.
    pub fn from_record(record: &Record) -> Result<Self, Failure> {
        let content = record
            .as_object()
            .and_then(|fields| fields.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| Failure::validation(WRONG_REQUEST_FORMAT))?;

        Ok(Self {
            identity: Identity::recover(record),
            content: content.to_owned(),
        })
    }

    /// Returns the source text to analyse.
    #[must_use]
    pub const fn content(&self) -> &str {
        self.content.as_str()
    }

    /// Returns the identity fields echoed into the response.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Processing status reported in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The response is still being assembled. Never written to the wire.
    Pending,
    /// The AST was produced.
    Ok,
    /// The request was valid but the source could not be parsed.
    Error,
    /// The record could not be decoded or validated.
    Fatal,
}

impl Status {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

/// Response metadata block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Metadata {
    name: Option<String>,
}

/// The outcome of one request.
///
/// Build responses with [`Response::builder`] or [`Response::orphan`]. An
/// `ok` response always carries a non-empty AST and no errors; every other
/// status carries at least one error and no AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    id: Option<Value>,
    driver_id: String,
    language: Option<Value>,
    language_version: Option<Value>,
    ast: Option<Ast>,
    metadata: Metadata,
    status: Status,
    errors: Vec<String>,
}

impl Response {
    /// Starts a response echoing the given identity.
    #[must_use]
    pub fn builder(identity: Identity) -> ResponseBuilder {
        ResponseBuilder { identity }
    }

    /// Starts a response for the given request.
    #[must_use]
    pub fn for_request(request: &Request) -> ResponseBuilder {
        Self::builder(request.identity().clone())
    }

    /// Starts a response with no associated request.
    #[must_use]
    pub fn orphan() -> ResponseBuilder {
        Self::builder(Identity::default())
    }

    /// Returns the response status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Returns the produced AST, if any.
    #[must_use]
    pub const fn ast(&self) -> Option<&Ast> {
        self.ast.as_ref()
    }

    /// Returns the error messages.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns the echoed request label.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    /// Returns the echoed request identifier.
    #[must_use]
    pub const fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// Returns the echoed language hint.
    #[must_use]
    pub const fn language(&self) -> Option<&Value> {
        self.language.as_ref()
    }

    /// Returns the echoed language version hint.
    #[must_use]
    pub const fn language_version(&self) -> Option<&Value> {
        self.language_version.as_ref()
    }

    /// Returns the driver identifier.
    #[must_use]
    pub const fn driver_id(&self) -> &str {
        self.driver_id.as_str()
    }

    /// Returns the identity fields carried by this response.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            name: self.metadata.name.clone(),
            language: self.language.clone(),
            language_version: self.language_version.clone(),
        }
    }

    /// Renders the response in its wire shape, moving the AST.
    ///
    /// An absent AST is written as an empty array.
    #[must_use]
    pub fn into_record(self) -> Record {
        let identity = Identity {
            id: self.id,
            name: None,
            language: self.language,
            language_version: self.language_version,
        };
        let mut fields = identity_fields(&identity);
        fields.insert(String::from("driverId"), Value::String(self.driver_id));
        fields.insert(
            String::from("ast"),
            self.ast.unwrap_or_else(|| Value::Array(Vec::new())),
        );
        fields.insert(String::from("metadata"), metadata_field(self.metadata.name));
        fields.insert(
            String::from("status"),
            Value::String(self.status.as_str().to_owned()),
        );
        fields.insert(
            String::from("errors"),
            Value::Array(self.errors.into_iter().map(Value::String).collect()),
        );
        Value::Object(fields)
    }
}

/// Assembles a [`Response`] from its originating identity.
///
/// The builder is the only place a response exists in the `pending` state;
/// both finishing methods resolve it to a terminal status.
#[derive(Debug, Clone)]
#[must_use = "a response builder does nothing until it is finished"]
pub struct ResponseBuilder {
    identity: Identity,
}

impl ResponseBuilder {
    /// Finishes the response with a produced AST.
    ///
    /// An empty AST (null, or an empty array or map) cannot satisfy the `ok`
    /// contract and yields a fatal response instead.
    pub fn succeed(self, ast: Ast) -> Response {
        if is_empty_ast(&ast) {
            return self.fail(&Failure::encoding("No ast parsed"));
        }
        let mut response = self.pending();
        response.ast = Some(ast);
        response.status = Status::Ok;
        response
    }

    /// Finishes the response with a failure.
    pub fn fail(self, failure: &Failure) -> Response {
        let mut response = self.pending();
        response.errors = vec![failure.message().to_owned()];
        response.status = failure.status();
        response
    }

    fn pending(self) -> Response {
        let Identity {
            id,
            name,
            language,
            language_version,
        } = self.identity;
        Response {
            id,
            driver_id: DRIVER_ID.to_owned(),
            language,
            language_version,
            ast: None,
            metadata: Metadata { name },
            status: Status::Pending,
            errors: Vec::new(),
        }
    }
}

fn identity_fields(identity: &Identity) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(id) = identity.id() {
        fields.insert(String::from("id"), id.clone());
    }
    if let Some(language) = identity.language() {
        fields.insert(String::from("language"), language.clone());
    }
    if let Some(version) = identity.language_version() {
        fields.insert(String::from("languageVersion"), version.clone());
    }
    fields
}

fn metadata_field(name: Option<String>) -> Value {
    let mut metadata = Map::new();
    metadata.insert(String::from("name"), name.map_or(Value::Null, Value::String));
    Value::Object(metadata)
}

fn is_empty_ast(ast: &Ast) -> bool {
    match ast {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
    }
}

#[cfg(test)]
mod tests;
