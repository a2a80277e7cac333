//! Upload orchestration
//!
//! The [`Brewery`] takes one upload through the pipeline:
//!
//! 1. Check there is exactly one file, under the configured field name,
//!    and that the request carries a numeric `date`
//! 2. Try each enzyme in priority order; the first that decodes the upload
//!    decides its members, and no further enzyme is tried
//! 3. Sort the members into content units and attachments with the
//!    [`Grower`]; more than one content unit is fatal
//! 4. Ferment the content unit, or hand everything to the [`Primer`] when
//!    there is none
//!
//! An upload that no enzyme decodes is a single member on its own.

use crate::brewing::{BrewError, History, Member};
use crate::enzymes::Enzyme;
use crate::grower::{Grower, Grown};
use crate::upload::{RequestMeta, UploadedFile, DATE_KEY, VIEW_NAME_KEY};
use crate::yeast::Yeasts;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

/// Default form field name of the upload
pub const DEFAULT_FIELD_NAME: &str = "file";

/// Fallback for uploads without a content unit
///
/// Re-edits the handler named by the `view_name` request key, passing the
/// uploaded members as attachments.
pub struct Primer<'a> {
    yeasts: &'a Yeasts,
}

impl<'a> Primer<'a> {
    pub fn new(yeasts: &'a Yeasts) -> Self {
        Self { yeasts }
    }

    pub fn prime(
        &self,
        mut meta: RequestMeta,
        sugars: &[Member],
        history: &mut History,
    ) -> Result<String, BrewError> {
        let view_name = meta
            .remove(VIEW_NAME_KEY)
            .ok_or_else(|| history.error("Page not found."))?;

        let culture = self.yeasts.get(&view_name).ok_or_else(|| {
            history.error("File is not a content unit and page is not editable.")
        })?;
        history.push(format!("Page {} is editable.", view_name));

        let raw: Mapping = meta
            .into_iter()
            .map(|(key, value)| (Value::String(key), Value::String(value)))
            .collect();
        let clean_meta = culture
            .clean(&raw)
            .map_err(|e| history.error(format!("Page not valid: {}.", e)))?;

        culture.referment(clean_meta, sugars, history)
    }
}

/// Orchestrates one upload at a time
pub struct Brewery {
    enzymes: Vec<Box<dyn Enzyme>>,
    yeasts: Yeasts,
    field_name: String,
}

impl Brewery {
    pub fn new(enzymes: Vec<Box<dyn Enzyme>>, yeasts: Yeasts) -> Self {
        Self {
            enzymes,
            yeasts,
            field_name: DEFAULT_FIELD_NAME.to_string(),
        }
    }

    /// Use a different form field name for the upload
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    pub fn yeasts(&self) -> &Yeasts {
        &self.yeasts
    }

    /// Ingest one upload, returning the URL to redirect to
    pub fn brew(&self, files: Vec<UploadedFile>, meta: RequestMeta) -> Result<String, BrewError> {
        let mut history = History::new();
        let result = self.brew_with(files, meta, &mut history);

        match &result {
            Ok(url) => info!(url = %url, steps = history.len(), "Brew succeeded"),
            Err(error) => warn!(
                message = %error.message,
                steps = error.history.len(),
                "Brew failed"
            ),
        }

        result
    }

    fn brew_with(
        &self,
        mut files: Vec<UploadedFile>,
        meta: RequestMeta,
        history: &mut History,
    ) -> Result<String, BrewError> {
        if files.len() != 1 {
            return Err(history.error(
                "One file is expected and this file cannot exceed the upload limit.",
            ));
        }
        let file = match files.pop() {
            Some(file) if file.field == self.field_name => file,
            _ => {
                return Err(history.error(format!(
                    "The field name must be {}.",
                    self.field_name
                )))
            }
        };

        let date = meta
            .get(DATE_KEY)
            .and_then(|date| date.trim().parse::<i64>().ok())
            .ok_or_else(|| history.error("The date must be an integer."))?;
        let date = malt_common::time::from_millis(date)
            .ok_or_else(|| history.error("The date is out of range."))?;

        history.push(format!("Received {}.", file.name));

        let grower = Grower::new(&self.yeasts);
        let primer = Primer::new(&self.yeasts);

        for enzyme in &self.enzymes {
            let members = match enzyme.convert(&file.content) {
                Ok(members) => members,
                Err(error) => {
                    history.push(format!(
                        "File is not a valid {} archive: {}.",
                        enzyme.extension(),
                        error
                    ));
                    continue;
                }
            };
            history.push(format!("File is a valid {} archive.", enzyme.extension()));

            let mut units: Vec<(String, Grown<'_>)> = Vec::new();
            let mut sugars = Vec::new();
            for member in members {
                history.push(format!("Extracted {}.", member.name));
                match grower.grow(&member.content, history) {
                    Some(grown) => units.push((member.name, grown)),
                    None => sugars.push(member),
                }
            }

            if units.len() > 1 {
                let names: Vec<&str> = units.iter().map(|(name, _)| name.as_str()).collect();
                return Err(history.error(format!(
                    "Multiple content units found: {}.",
                    names.join(", ")
                )));
            }

            return match units.pop() {
                Some((_, grown)) => grown.culture.ferment(grown.meta, &grown.body, &sugars, history),
                None => primer.prime(meta, &sugars, history),
            };
        }

        match grower.grow(&file.content, history) {
            Some(grown) => grown.culture.ferment(grown.meta, &grown.body, &[], history),
            None => {
                let member = Member::new(Some(date), file.name, file.content);
                primer.prime(meta, &[member], history)
            }
        }
    }
}
