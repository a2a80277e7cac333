//! Mock content types
//!
//! - `pass`: accepts any preamble as-is, records every hook
//! - `fail`: never accepts a preamble
//! - `pass-fail`: accepts any preamble, then rejects it in `pre_process`
//! - `pass-pass`: like `pass`, with a required second preamble

use malt_brew::{
    BrewError, FieldType, History, Member, Meta, MetaValue, Schema, Yeast, YeastError, Yeasts,
};
use serde_yaml::Mapping;
use std::sync::{Arc, Mutex};

/// Hook calls shared between a test and the handlers it registers
pub type CallLog = Arc<Mutex<Vec<String>>>;

fn clean_as_is(raw: &Mapping) -> Result<Meta, YeastError> {
    raw.iter()
        .map(|(key, value)| {
            let key = key
                .as_str()
                .ok_or_else(|| YeastError::Invalid("keys must be strings".to_string()))?;
            Ok((key.to_string(), MetaValue::infer(key, value)?))
        })
        .collect()
}

fn describe(member: &Member) -> String {
    let date = member
        .date
        .map(|date| date.timestamp_millis().to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{}@{}", member.name, date)
}

pub struct Pass {
    log: CallLog,
}

impl Pass {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }

    fn note(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }
}

impl Yeast for Pass {
    fn schema() -> Schema<Self> {
        Schema::new()
    }

    fn clean(_schema: &Schema<Self>, raw: &Mapping) -> Result<Meta, YeastError> {
        clean_as_is(raw)
    }

    fn pre_process(&mut self, meta: &Meta, _history: &mut History) -> Result<String, BrewError> {
        let keys: Vec<&str> = meta.keys().map(String::as_str).collect();
        self.note(format!("pre:{}", keys.join(",")));
        Ok("/pass".to_string())
    }

    fn process(&mut self, body: &str, _history: &mut History) -> Result<(), BrewError> {
        self.note(format!("body:{}", body));
        Ok(())
    }

    fn process_attachments(
        &mut self,
        members: &[Member],
        _history: &mut History,
    ) -> Result<(), BrewError> {
        let members: Vec<String> = members.iter().map(describe).collect();
        self.note(format!("attachments:{}", members.join(",")));
        Ok(())
    }
}

pub struct Fail;

impl Yeast for Fail {
    fn schema() -> Schema<Self> {
        Schema::new()
    }

    fn clean(_schema: &Schema<Self>, _raw: &Mapping) -> Result<Meta, YeastError> {
        Err(YeastError::Invalid("never valid".to_string()))
    }

    fn pre_process(&mut self, _meta: &Meta, history: &mut History) -> Result<String, BrewError> {
        Err(history.error("Unreachable."))
    }
}

pub struct PassFail;

impl Yeast for PassFail {
    fn schema() -> Schema<Self> {
        Schema::new()
    }

    fn clean(_schema: &Schema<Self>, raw: &Mapping) -> Result<Meta, YeastError> {
        clean_as_is(raw)
    }

    fn pre_process(&mut self, _meta: &Meta, history: &mut History) -> Result<String, BrewError> {
        Err(history.error("Rejected."))
    }
}

pub struct PassPass {
    inner: Pass,
}

impl Yeast for PassPass {
    fn schema() -> Schema<Self> {
        Schema::new().also_expect("title", FieldType::Str)
    }

    fn clean(_schema: &Schema<Self>, raw: &Mapping) -> Result<Meta, YeastError> {
        clean_as_is(raw)
    }

    fn pre_process(&mut self, meta: &Meta, history: &mut History) -> Result<String, BrewError> {
        self.inner.pre_process(meta, history)?;
        Ok("/pass-pass".to_string())
    }

    fn post_pre_process(&mut self, meta: &Meta, _history: &mut History) -> Result<(), BrewError> {
        self.inner.note(format!("title:{}", meta["title"]));
        Ok(())
    }

    fn process(&mut self, body: &str, history: &mut History) -> Result<(), BrewError> {
        self.inner.process(body, history)
    }

    fn process_attachments(
        &mut self,
        members: &[Member],
        history: &mut History,
    ) -> Result<(), BrewError> {
        self.inner.process_attachments(members, history)
    }
}

/// Registry holding every mock content type, all writing to `log`
pub fn registry(log: CallLog) -> Yeasts {
    let mut yeasts = Yeasts::new();

    let pass_log = log.clone();
    yeasts.register("pass", move || Pass::new(pass_log.clone()));
    yeasts.register("fail", || Fail);
    yeasts.register("pass-fail", || PassFail);
    yeasts.register("pass-pass", move || PassPass {
        inner: Pass::new(log.clone()),
    });

    yeasts
}
