//! Course page content type
//!
//! ```text
//! type: node
//! course_uid: algorithms
//! uid: sorting
//! ...
//! Page body.
//! ```
//!
//! The body is stored as `<course_uid>/<uid>/index.md` and each attachment
//! beside it. An attachment may not be named `index.md`.

use super::{segment, store, url};
use crate::brewing::{BrewError, FieldType, History, Member, Meta};
use crate::storage::Storage;
use crate::yeast::{Schema, Yeast};
use std::sync::Arc;

/// File name of the stored page body
const BODY_NAME: &str = "index.md";

pub struct NodeYeast {
    storage: Arc<dyn Storage>,
    base_url: String,
    folder: Option<String>,
}

impl NodeYeast {
    pub fn new(storage: Arc<dyn Storage>, base_url: impl Into<String>) -> Self {
        Self {
            storage,
            base_url: base_url.into(),
            folder: None,
        }
    }

    fn folder(&self, history: &History) -> Result<&str, BrewError> {
        self.folder
            .as_deref()
            .ok_or_else(|| history.error("Node was not pre-processed."))
    }
}

impl Yeast for NodeYeast {
    fn schema() -> Schema<Self> {
        Schema::new()
            .expect("course_uid", FieldType::Str)
            .expect("uid", FieldType::Str)
    }

    fn pre_process(&mut self, meta: &Meta, history: &mut History) -> Result<String, BrewError> {
        let course_uid = segment(meta, "course_uid", history)?;
        let uid = segment(meta, "uid", history)?;

        self.folder = Some(format!("{}/{}", course_uid, uid));
        Ok(url(
            &self.base_url,
            &format!("courses/{}/nodes/{}", course_uid, uid),
        ))
    }

    fn process(&mut self, body: &str, history: &mut History) -> Result<(), BrewError> {
        let name = format!("{}/{}", self.folder(history)?, BODY_NAME);
        store(self.storage.as_ref(), &name, body.as_bytes(), history)
    }

    fn process_attachments(
        &mut self,
        members: &[Member],
        history: &mut History,
    ) -> Result<(), BrewError> {
        let folder = self.folder(history)?.to_string();
        if members.iter().any(|member| member.name == BODY_NAME) {
            return Err(history.error(format!(
                "Attachment {} would replace the page body.",
                BODY_NAME
            )));
        }
        for member in members {
            let name = format!("{}/{}", folder, member.name);
            store(self.storage.as_ref(), &name, &member.content, history)?;
        }
        Ok(())
    }
}
