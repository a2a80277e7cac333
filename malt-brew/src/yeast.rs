//! Content-type handlers
//!
//! A [`Yeast`] validates and commits one type of content unit. Its static
//! [`Schema`] declares the metadata it accepts:
//!
//! - `expected`: top-level preamble keys, required and type-checked
//! - `also_expected`: keys of a second preamble at the top of the body,
//!   required and type-checked
//! - `optional`: further second-preamble keys, each routed to a typed
//!   processor
//!
//! Handlers are registered in [`Yeasts`] under their type name. The
//! registry stores them behind the object-safe [`Culture`] trait, which runs
//! the two invocation protocols (`ferment` and `referment`) on a fresh
//! handler instance per call.

use crate::brewing::{BrewError, FieldType, History, Member, Meta, MetaValue, YeastError};
use crate::grower;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Processor for one optional second-preamble key
pub type Processor<Y> = fn(&mut Y, MetaValue, &mut History) -> Result<(), BrewError>;

/// A required, type-checked field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

/// An optional field and its processor
pub struct Optional<Y> {
    pub name: &'static str,
    pub ty: FieldType,
    pub process: Processor<Y>,
}

/// Static metadata declaration of a handler
pub struct Schema<Y> {
    pub expected: Vec<Field>,
    pub also_expected: Vec<Field>,
    pub optional: Vec<Optional<Y>>,
}

impl<Y> Default for Schema<Y> {
    fn default() -> Self {
        Self {
            expected: Vec::new(),
            also_expected: Vec::new(),
            optional: Vec::new(),
        }
    }
}

impl<Y> Schema<Y> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(mut self, name: &'static str, ty: FieldType) -> Self {
        self.expected.push(Field { name, ty });
        self
    }

    pub fn also_expect(mut self, name: &'static str, ty: FieldType) -> Self {
        self.also_expected.push(Field { name, ty });
        self
    }

    pub fn optional(mut self, name: &'static str, ty: FieldType, process: Processor<Y>) -> Self {
        self.optional.push(Optional { name, ty, process });
        self
    }

    /// Whether the body may start with a second preamble
    pub fn has_second_stage(&self) -> bool {
        !self.also_expected.is_empty() || !self.optional.is_empty()
    }

    /// Clean top-level metadata
    ///
    /// Keeps exactly the `expected` keys; undeclared keys are dropped.
    pub fn clean(&self, raw: &Mapping) -> Result<Meta, YeastError> {
        clean_fields(&self.expected, raw)
    }

    /// Clean the `also_expected` keys of a second preamble
    pub fn clean_also(&self, raw: &Mapping) -> Result<Meta, YeastError> {
        clean_fields(&self.also_expected, raw)
    }

    fn find_optional(&self, name: &str) -> Option<&Optional<Y>> {
        self.optional.iter().find(|optional| optional.name == name)
    }

    fn is_also_expected(&self, name: &str) -> bool {
        self.also_expected.iter().any(|field| field.name == name)
    }
}

fn clean_fields(fields: &[Field], raw: &Mapping) -> Result<Meta, YeastError> {
    let mut meta = BTreeMap::new();
    for field in fields {
        let value = raw
            .get(field.name)
            .ok_or_else(|| YeastError::Missing(field.name.to_string()))?;
        meta.insert(field.name.to_string(), field.ty.check(field.name, value)?);
    }
    Ok(meta)
}

/// A content-type handler
///
/// `pre_process` must only validate: it always runs before anything is
/// committed, so a failure there leaves storage untouched.
pub trait Yeast: Sized + 'static {
    /// Metadata declaration, built once at registration
    fn schema() -> Schema<Self>;

    /// Clean top-level metadata against the schema
    fn clean(schema: &Schema<Self>, raw: &Mapping) -> Result<Meta, YeastError> {
        schema.clean(raw)
    }

    /// Validate metadata and return the URL to redirect to
    fn pre_process(&mut self, meta: &Meta, history: &mut History) -> Result<String, BrewError>;

    /// Receives the cleaned `also_expected` keys of the second preamble
    fn post_pre_process(&mut self, _meta: &Meta, _history: &mut History) -> Result<(), BrewError> {
        Ok(())
    }

    /// Commit the body
    fn process(&mut self, _body: &str, history: &mut History) -> Result<(), BrewError> {
        Err(history.error("This type does not accept content."))
    }

    /// Commit the members uploaded alongside the content unit
    fn process_attachments(
        &mut self,
        members: &[Member],
        history: &mut History,
    ) -> Result<(), BrewError> {
        if members.is_empty() {
            return Ok(());
        }
        Err(history.error("This type does not accept attachments."))
    }
}

/// Object-safe view of a registered handler
pub trait Culture: Send + Sync {
    /// Type name the handler is registered under
    fn name(&self) -> &str;

    /// Clean top-level metadata
    fn clean(&self, raw: &Mapping) -> Result<Meta, YeastError>;

    /// Full ingestion: metadata, body and attachments
    fn ferment(
        &self,
        meta: Meta,
        body: &str,
        attachments: &[Member],
        history: &mut History,
    ) -> Result<String, BrewError>;

    /// Metadata-only re-edit: no body
    fn referment(
        &self,
        meta: Meta,
        attachments: &[Member],
        history: &mut History,
    ) -> Result<String, BrewError>;
}

/// A handler type with its schema and instance factory
pub struct Strain<Y, F> {
    name: String,
    schema: Schema<Y>,
    factory: F,
}

impl<Y, F> Strain<Y, F>
where
    Y: Yeast,
    F: Fn() -> Y + Send + Sync,
{
    pub fn new(name: impl Into<String>, factory: F) -> Self {
        Self {
            name: name.into(),
            schema: Y::schema(),
            factory,
        }
    }

    fn record_meta(&self, meta: &Meta, history: &mut History) {
        for (key, value) in meta {
            history.push(format!("{}: {}", key, value));
        }
    }

    /// Consume the second preamble, returning the body below it
    fn second_stage(
        &self,
        yeast: &mut Y,
        body: &str,
        history: &mut History,
    ) -> Result<String, BrewError> {
        let split = match grower::split(body) {
            Some(split) => split,
            None if self.schema.also_expected.is_empty() => {
                history.push("Second separator not found.");
                return Ok(body.to_string());
            }
            None => {
                let names: Vec<&str> = self.schema.also_expected.iter().map(|f| f.name).collect();
                return Err(history.error(format!(
                    "Content must start with a second preamble declaring {}.",
                    names.join(", ")
                )));
            }
        };
        history.push(format!("Second separator found in line {}.", split.line));

        let mapping = grower::parse_preamble(&split.preamble)
            .map_err(|e| history.error(format!("Second preamble is not valid: {}", e)))?;

        let also = self
            .schema
            .clean_also(&mapping)
            .map_err(|e| history.error(format!("Second preamble is not valid: {}", e)))?;
        self.record_meta(&also, history);
        yeast.post_pre_process(&also, history)?;

        for (key, value) in &mapping {
            let key = match key {
                Value::String(key) => key,
                other => {
                    return Err(history.error(format!(
                        "Second preamble key {} is not a string.",
                        serde_yaml::to_string(other)
                            .map(|s| s.trim_end().to_string())
                            .unwrap_or_default()
                    )))
                }
            };
            if self.schema.is_also_expected(key) {
                continue;
            }

            let optional = match self.schema.find_optional(key) {
                Some(optional) => optional,
                None => {
                    let error = YeastError::Unexpected(key.clone());
                    return Err(history.error(format!("Second preamble is not valid: {}", error)));
                }
            };
            let value = optional
                .ty
                .check(key, value)
                .map_err(|e| history.error(format!("Second preamble is not valid: {}", e)))?;
            history.push(format!("{}: {}", key, value));
            (optional.process)(yeast, value, history)?;
        }

        Ok(split.body)
    }
}

impl<Y, F> Culture for Strain<Y, F>
where
    Y: Yeast,
    F: Fn() -> Y + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn clean(&self, raw: &Mapping) -> Result<Meta, YeastError> {
        Y::clean(&self.schema, raw)
    }

    fn ferment(
        &self,
        meta: Meta,
        body: &str,
        attachments: &[Member],
        history: &mut History,
    ) -> Result<String, BrewError> {
        history.push(format!("Fermenting {}.", self.name));
        self.record_meta(&meta, history);

        let mut yeast = (self.factory)();
        let url = yeast.pre_process(&meta, history)?;

        let body = if self.schema.has_second_stage() {
            self.second_stage(&mut yeast, body, history)?
        } else {
            body.to_string()
        };

        yeast.process(&body, history)?;
        yeast.process_attachments(attachments, history)?;
        history.push(format!("Fermented {}.", self.name));

        Ok(url)
    }

    fn referment(
        &self,
        meta: Meta,
        attachments: &[Member],
        history: &mut History,
    ) -> Result<String, BrewError> {
        history.push(format!("Refermenting {}.", self.name));
        self.record_meta(&meta, history);

        let mut yeast = (self.factory)();
        let url = yeast.pre_process(&meta, history)?;
        yeast.process_attachments(attachments, history)?;
        history.push(format!("Refermented {}.", self.name));

        Ok(url)
    }
}

/// Registry of handlers by type name
#[derive(Default)]
pub struct Yeasts {
    strains: BTreeMap<String, Box<dyn Culture>>,
}

impl Yeasts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler type; a second registration under the same name
    /// replaces the first
    pub fn register<Y, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        Y: Yeast,
        F: Fn() -> Y + Send + Sync + 'static,
    {
        let strain = Strain::new(name, factory);
        if self.strains.insert(name.to_string(), Box::new(strain)).is_some() {
            tracing::warn!(name = %name, "Replaced registered content type");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Culture> {
        self.strains.get(name).map(|strain| strain.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strains.keys().map(String::as_str)
    }
}
