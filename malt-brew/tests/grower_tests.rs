//! Content unit detection tests

mod helpers;

use helpers::{registry, CallLog};
use malt_brew::{Grower, History, MetaValue, Yeasts};

fn yeasts() -> Yeasts {
    registry(CallLog::default())
}

fn last(history: &History) -> &str {
    history.entries().last().map(String::as_str).unwrap_or_default()
}

#[test]
fn test_grow_content_unit() {
    let yeasts = yeasts();
    let mut history = History::new();

    let grown = Grower::new(&yeasts)
        .grow(b"type: pass\nuid: 7\n...\nBody\n...\nmore", &mut history)
        .unwrap();

    assert_eq!(grown.culture.name(), "pass");
    assert_eq!(grown.meta.len(), 1);
    assert_eq!(grown.meta["uid"], MetaValue::Int(7));
    assert_eq!(grown.body, "Body\n...\nmore");
    assert_eq!(
        history.entries(),
        [
            "File does not seem to be binary.",
            "Separator found in line 3.",
            "Preamble is valid YAML.",
            "Preamble is a dictionary.",
            "Preamble has a type.",
            "Preamble type pass exists.",
            "Preamble describes a valid pass.",
        ]
    );
}

#[test]
fn test_grow_binary() {
    let yeasts = yeasts();
    let mut history = History::new();

    let grown = Grower::new(&yeasts).grow(&[0xff, 0xfe, 0x00, 0x81], &mut history);

    assert!(grown.is_none());
    assert_eq!(history.entries(), ["File seems to be binary."]);
}

#[test]
fn test_grow_without_separator() {
    let yeasts = yeasts();
    let mut history = History::new();

    let grown = Grower::new(&yeasts).grow(b"type: pass\nno separator", &mut history);

    assert!(grown.is_none());
    assert_eq!(last(&history), "Separator not found.");
}

#[test]
fn test_grow_invalid_yaml() {
    let yeasts = yeasts();
    let mut history = History::new();

    let grown = Grower::new(&yeasts).grow(b"type: [pass\n...\n", &mut history);

    assert!(grown.is_none());
    assert!(last(&history).starts_with("Preamble is not valid YAML"));
}

#[test]
fn test_grow_preamble_not_a_dictionary() {
    let yeasts = yeasts();
    let mut history = History::new();

    let grown = Grower::new(&yeasts).grow(b"- pass\n- node\n...\n", &mut history);

    assert!(grown.is_none());
    assert_eq!(last(&history), "Preamble is not a dictionary.");
}

#[test]
fn test_grow_without_type() {
    let yeasts = yeasts();
    let mut history = History::new();

    let grown = Grower::new(&yeasts).grow(b"uid: 7\n...\n", &mut history);

    assert!(grown.is_none());
    assert_eq!(last(&history), "Preamble does not have a type.");
}

#[test]
fn test_grow_type_not_a_string() {
    let yeasts = yeasts();
    let mut history = History::new();

    let grown = Grower::new(&yeasts).grow(b"type: 3\n...\n", &mut history);

    assert!(grown.is_none());
    assert_eq!(last(&history), "Preamble type is not a string.");
}

#[test]
fn test_grow_unknown_type() {
    let yeasts = yeasts();
    let mut history = History::new();

    let grown = Grower::new(&yeasts).grow(b"type: missing\n...\n", &mut history);

    assert!(grown.is_none());
    assert_eq!(last(&history), "Preamble type missing does not exist.");
}

#[test]
fn test_grow_invalid_metadata() {
    let yeasts = yeasts();
    let mut history = History::new();

    let grown = Grower::new(&yeasts).grow(b"type: fail\n...\n", &mut history);

    assert!(grown.is_none());
    assert_eq!(
        last(&history),
        "Preamble does not describe a valid fail: never valid"
    );
}

#[test]
fn test_grow_crlf_unit() {
    let yeasts = yeasts();
    let mut history = History::new();

    let grown = Grower::new(&yeasts)
        .grow(b"type: pass\r\n...\r\nline one\r\nline two", &mut history)
        .unwrap();

    assert!(grown.meta.is_empty());
    assert_eq!(grown.body, "line one\nline two");
}
