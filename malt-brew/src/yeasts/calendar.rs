//! Calendar content type
//!
//! ```text
//! type: calendar
//! slug: spring
//! ...
//! title: Spring term
//! start: 2021-03-01
//! end: 2021-06-30
//! ...
//! Description.
//! ```
//!
//! The calendar is stored as JSON in `calendars/<slug>.json`; attachments
//! go to `calendars/<slug>/`.

use super::{segment, store, url};
use crate::brewing::{BrewError, FieldType, History, Member, Meta, MetaValue};
use crate::storage::Storage;
use crate::yeast::{Schema, Yeast};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// Stored calendar record
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Calendar {
    pub slug: String,
    pub title: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub public: bool,
    pub description: String,
}

pub struct CalendarYeast {
    storage: Arc<dyn Storage>,
    base_url: String,
    calendar: Calendar,
}

impl CalendarYeast {
    pub fn new(storage: Arc<dyn Storage>, base_url: impl Into<String>) -> Self {
        Self {
            storage,
            base_url: base_url.into(),
            calendar: Calendar::default(),
        }
    }

    fn set_start(&mut self, value: MetaValue, _history: &mut History) -> Result<(), BrewError> {
        self.calendar.start = value.as_date();
        Ok(())
    }

    fn set_end(&mut self, value: MetaValue, _history: &mut History) -> Result<(), BrewError> {
        self.calendar.end = value.as_date();
        Ok(())
    }

    fn set_public(&mut self, value: MetaValue, _history: &mut History) -> Result<(), BrewError> {
        self.calendar.public = value.as_bool().unwrap_or(false);
        Ok(())
    }
}

impl Yeast for CalendarYeast {
    fn schema() -> Schema<Self> {
        Schema::new()
            .expect("slug", FieldType::Str)
            .also_expect("title", FieldType::Str)
            .optional("start", FieldType::Date, Self::set_start)
            .optional("end", FieldType::Date, Self::set_end)
            .optional("public", FieldType::Bool, Self::set_public)
    }

    fn pre_process(&mut self, meta: &Meta, history: &mut History) -> Result<String, BrewError> {
        let slug = segment(meta, "slug", history)?;
        self.calendar.slug = slug.to_string();
        Ok(url(&self.base_url, &format!("calendars/{}", slug)))
    }

    fn post_pre_process(&mut self, meta: &Meta, history: &mut History) -> Result<(), BrewError> {
        let title = meta
            .get("title")
            .and_then(|value| value.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if title.is_empty() {
            return Err(history.error("Calendar title must not be empty."));
        }
        self.calendar.title = title.to_string();
        Ok(())
    }

    fn process(&mut self, body: &str, history: &mut History) -> Result<(), BrewError> {
        if let (Some(start), Some(end)) = (self.calendar.start, self.calendar.end) {
            if start > end {
                return Err(history.error(format!(
                    "Calendar cannot end ({}) before it starts ({}).",
                    end, start
                )));
            }
        }
        self.calendar.description = body.trim_end().to_string();

        let json = serde_json::to_vec_pretty(&self.calendar)
            .map_err(|e| history.error(format!("Could not serialize calendar: {}", e)))?;
        let name = format!("calendars/{}.json", self.calendar.slug);
        store(self.storage.as_ref(), &name, &json, history)
    }

    fn process_attachments(
        &mut self,
        members: &[Member],
        history: &mut History,
    ) -> Result<(), BrewError> {
        for member in members {
            let name = format!("calendars/{}/{}", self.calendar.slug, member.name);
            store(self.storage.as_ref(), &name, &member.content, history)?;
        }
        Ok(())
    }
}
