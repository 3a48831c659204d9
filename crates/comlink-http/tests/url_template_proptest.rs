// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property: substituting a known `{placeholder}` never leaves template
//! syntax in the output, and literal text around the placeholder survives
//! untouched (spec §8's URL-substitution invariant).

use std::collections::BTreeMap;

use comlink_error::AstPath;
use comlink_http::request::substitute_path_template;
use comlink_variables::Variable;
use proptest::prelude::*;

fn literal_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9/_.-]{0,8}"
}

fn placeholder_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,5}"
}

fn placeholder_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{0,6}"
}

proptest! {
    #[test]
    fn prop_known_placeholder_is_fully_resolved(
        prefix in literal_text(),
        suffix in literal_text(),
        name in placeholder_name(),
        value in placeholder_value(),
    ) {
        let template = format!("{prefix}{{{name}}}{suffix}");
        let mut scope_fields = BTreeMap::new();
        scope_fields.insert(name.clone(), Variable::String(value.clone()));
        let scope = Variable::Object(scope_fields);

        let rendered = substitute_path_template(
            &template,
            &scope,
            &Variable::empty_object(),
            &Variable::empty_object(),
            &AstPath::root(),
        )
        .expect("known placeholder resolves");

        prop_assert_eq!(&rendered, &format!("{prefix}{value}{suffix}"));
        prop_assert!(!rendered.contains('{'), "rendered contains an open brace");
        prop_assert!(!rendered.contains('}'), "rendered contains a close brace");
    }

    #[test]
    fn prop_unresolved_placeholder_is_an_error_not_a_panic(
        prefix in literal_text(),
        name in placeholder_name(),
    ) {
        let template = format!("{prefix}{{{name}}}");
        let empty = Variable::empty_object();
        let result = substitute_path_template(&template, &empty, &empty, &empty, &AstPath::root());
        prop_assert!(result.is_err());
    }

    #[test]
    fn prop_template_with_no_placeholders_is_identity(text in literal_text()) {
        // Text free of braces has nothing to substitute.
        let empty = Variable::empty_object();
        let rendered = substitute_path_template(&text, &empty, &empty, &empty, &AstPath::root())
            .expect("no placeholders means nothing can fail to resolve");
        prop_assert_eq!(rendered, text);
    }
}
