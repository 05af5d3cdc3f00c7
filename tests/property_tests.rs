//! Property-based tests for otlp_log_emitter using proptest

use chrono::Utc;
use otlp_log_emitter::core::{format_message, placeholders};
use otlp_log_emitter::prelude::*;
use otlp_log_emitter::MESSAGE_TEMPLATE_KEY;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn level() -> impl Strategy<Value = Level> {
    prop_oneof![
        Just(Level::Debug),
        Just(Level::Info),
        Just(Level::Warning),
        Just(Level::Error),
        Just(Level::Critical),
    ]
}

/// Literal template text without braces
fn literal() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:;!?=-]{0,12}"
}

fn key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

/// Attribute values without braces, so rendered output can be checked for leftovers
fn value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _.-]{0,16}"
}

// ============================================================================
// Level Tests
// ============================================================================

proptest! {
    /// Level string conversions roundtrip
    #[test]
    fn test_level_str_roundtrip(level in level()) {
        let parsed: Level = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// Parsing ignores case
    #[test]
    fn test_level_parse_case_insensitive(level in level(), lower in any::<bool>()) {
        let text = if lower {
            level.to_str().to_lowercase()
        } else {
            level.to_str().to_string()
        };
        prop_assert_eq!(text.parse::<Level>().unwrap(), level);
    }

    /// Severity numbers follow level order
    #[test]
    fn test_severity_number_is_monotonic(a in level(), b in level()) {
        prop_assert_eq!(a <= b, a.severity_number() <= b.severity_number());
    }

    /// Explicit levels always survive resolution
    #[test]
    fn test_explicit_level_wins(level in level()) {
        prop_assert_eq!(UniformRandomLevel.resolve(Some(level)), level);
        prop_assert_eq!(FixedLevel(Level::Debug).resolve(Some(level)), level);
    }
}

// ============================================================================
// Formatter Tests
// ============================================================================

proptest! {
    /// Templates whose keys are all present render with no leftover placeholders
    #[test]
    fn test_complete_attributes_render_fully(
        pieces in prop::collection::vec((literal(), key()), 1..6),
        tail in literal(),
        values in prop::collection::vec(value(), 6),
    ) {
        let mut template = String::new();
        let mut attrs = Attributes::new();
        let mut expected = String::new();
        let mut assigned: BTreeMap<String, String> = BTreeMap::new();

        for (i, (text, name)) in pieces.iter().enumerate() {
            let v = assigned.entry(name.clone()).or_insert_with(|| values[i].clone()).clone();
            attrs.insert(name.as_str(), v.as_str());
            template.push_str(text);
            template.push('{');
            template.push_str(name);
            template.push('}');
            expected.push_str(text);
            expected.push_str(&v);
        }
        template.push_str(&tail);
        expected.push_str(&tail);

        let rendered = format_message(&template, &attrs).unwrap();
        prop_assert!(!rendered.contains('{') && !rendered.contains('}'), "rendered output contains a brace: {:?}", rendered);
        prop_assert_eq!(rendered, expected);
    }

    /// A template referencing an absent key fails and builds no record
    #[test]
    fn test_missing_key_is_format_error(
        prefix in literal(),
        name in key(),
        present in prop::collection::btree_map(key(), value(), 0..4),
    ) {
        prop_assume!(!present.contains_key(&name));
        let attrs: Attributes = present.into();
        let template = format!("{}{{{}}}", prefix, name);

        let is_format_error = matches!(
            format_message(&template, &attrs),
            Err(EmitterError::Format { .. })
        );
        prop_assert!(is_format_error);
    }

    /// Doubled braces are literal and never treated as placeholders
    #[test]
    fn test_escaped_braces_are_literal(inner in literal()) {
        let template = format!("{{{{{}}}}}", inner);
        prop_assert_eq!(format_message(&template, &Attributes::new()).unwrap(), format!("{{{}}}", inner));
        prop_assert!(placeholders(&template).unwrap().is_empty());
    }

    /// placeholders() lists referenced names in order
    #[test]
    fn test_placeholders_in_order(names in prop::collection::vec(key(), 0..6)) {
        let template: String = names.iter().map(|n| format!("<{{{}}}>", n)).collect();
        prop_assert_eq!(placeholders(&template).unwrap(), names);
    }

    /// Building a record always stores the template under the reserved key
    #[test]
    fn test_record_keeps_template(
        template in literal(),
        attrs in prop::collection::btree_map(key(), value(), 0..4),
        level in level(),
    ) {
        let attributes: Attributes = attrs.into();
        let message = format_message(&template, &attributes).unwrap();
        let record = LogRecord::build(message.clone(), level, &template, attributes, Utc::now());

        prop_assert_eq!(record.message(), message.as_str());
        prop_assert_eq!(record.template(), Some(template.as_str()));
        prop_assert!(record.attributes().contains_key(MESSAGE_TEMPLATE_KEY));
    }
}
