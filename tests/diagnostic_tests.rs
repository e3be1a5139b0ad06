//! Diagnostic rendering: errors carry codes, spans, and attached source so
//! miette can point at the offending form.

use miette::Diagnostic;
use sedra::compile_src;

#[test]
fn syntax_errors_point_at_the_offending_form() {
    let src = "(defvars x :uint256)\n(defn broken [y] :external (pass))";
    let err = compile_src(src, None).unwrap_err();

    assert_eq!(err.kind.code(), "sedra::type_annotation");
    assert!(err.source_code.is_some());

    let labels: Vec<_> = err.labels().expect("span label").collect();
    assert_eq!(labels.len(), 1);
    // the label lands on the untyped argument, on the second line
    let offset = labels[0].offset();
    assert!(offset > src.find('\n').unwrap());
}

#[test]
fn diagnostic_codes_are_namespaced() {
    let err = compile_src("(defn f [", None).unwrap_err();
    assert_eq!(
        err.code().expect("diagnostic code").to_string(),
        "sedra::read"
    );
}

#[test]
fn circular_dependency_help_lists_the_stack() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/cycle_a.sedra");
    let err = sedra::compiler::compile_file(&path).unwrap_err();
    let help = err.help().expect("help text").to_string();
    assert!(help.contains("cycle_a"));
}

#[test]
fn rendered_report_includes_the_source_snippet() {
    let err = compile_src("(defvars x :uint256) (+ 1 2)", None).unwrap_err();
    let report = miette::Report::new(err);
    let rendered = format!("{report:?}");
    assert!(rendered.contains("sedra::syntax"));
}
