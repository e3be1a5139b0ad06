//! File-macro tests: include! splicing, cycle detection, and interface!
//! synthesis against the fixture contracts.

use std::path::{Path, PathBuf};

use sedra::ast::NodeKind;
use sedra::compiler::compile_file;
use sedra::ErrorKind;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn include_splices_the_target_forms() {
    let compiled = compile_file(&fixture("b.sedra")).unwrap();
    let NodeKind::Module { body, .. } = compiled.module.kind else {
        panic!("expected Module");
    };
    // d.sedra only contributes a constant, so b's own declaration is all
    // that lands in the body.
    assert_eq!(body.len(), 1);
    assert!(matches!(body[0].kind, NodeKind::VariableDecl { .. }));
}

#[test]
fn included_constants_reach_the_including_module() {
    let compiled = compile_file(&fixture("c.sedra")).unwrap();
    let NodeKind::Module { body, .. } = compiled.module.kind else {
        panic!("expected Module");
    };
    let NodeKind::FunctionDef { body: fn_body, .. } = &body[0].kind else {
        panic!("expected FunctionDef");
    };
    let NodeKind::Return { value: Some(value) } = &fn_body[0].kind else {
        panic!("expected Return");
    };
    assert!(matches!(value.kind, NodeKind::Int { value: 100 }));
}

#[test]
fn diamond_includes_are_not_a_cycle() {
    let compiled = compile_file(&fixture("a.sedra")).unwrap();
    let NodeKind::Module { body, .. } = compiled.module.kind else {
        panic!("expected Module");
    };
    // b's variable, c's function, a's function
    assert_eq!(body.len(), 3);
    assert!(matches!(body[0].kind, NodeKind::VariableDecl { .. }));
    assert!(matches!(body[1].kind, NodeKind::FunctionDef { .. }));
    assert!(matches!(body[2].kind, NodeKind::FunctionDef { .. }));
}

#[test]
fn mutual_includes_are_a_cycle() {
    let err = compile_file(&fixture("cycle_a.sedra")).unwrap_err();
    let ErrorKind::CircularDependency { path, stack } = &err.kind else {
        panic!("expected CircularDependency, got {:?}", err.kind);
    };
    assert!(path.to_string_lossy().contains("cycle_a"));
    assert!(!stack.is_empty());
}

#[test]
fn self_include_is_a_cycle() {
    let err = compile_file(&fixture("self_cycle.sedra")).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CircularDependency { .. }));
}

#[test]
fn missing_include_target_is_a_macro_error() {
    let src = "(include! \"no_such_file.sedra\")";
    let err = sedra::compile_src(src, Some(&fixture("ghost.sedra"))).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Macro { .. }));
}

#[test]
fn interface_macro_synthesizes_the_external_surface() {
    let compiled = compile_file(&fixture("importer.sedra")).unwrap();
    let NodeKind::Module { body, .. } = compiled.module.kind else {
        panic!("expected Module");
    };

    let NodeKind::InterfaceDef { name, body: fns } = &body[0].kind else {
        panic!("expected InterfaceDef first, got {:?}", body[0].kind);
    };
    assert_eq!(name, "token");

    let names: Vec<&str> = fns
        .iter()
        .map(|f| {
            let NodeKind::FunctionDef { name, .. } = &f.kind else {
                panic!("expected FunctionDef");
            };
            name.as_str()
        })
        .collect();
    // constructor omitted, externals kept in declaration order
    assert_eq!(names, vec!["balanceOf", "transfer"]);

    let NodeKind::FunctionDef { decorators, .. } = &fns[0].kind else {
        panic!("expected FunctionDef");
    };
    assert!(decorators
        .iter()
        .any(|d| matches!(&d.kind, NodeKind::Name { id } if id == "view")));
}

#[test]
fn interface_functions_have_no_bodies() {
    let compiled = compile_file(&fixture("importer.sedra")).unwrap();
    let NodeKind::Module { body, .. } = compiled.module.kind else {
        panic!("expected Module");
    };
    let NodeKind::InterfaceDef { body: fns, .. } = &body[0].kind else {
        panic!("expected InterfaceDef");
    };
    for f in fns {
        let NodeKind::FunctionDef { body, .. } = &f.kind else {
            panic!("expected FunctionDef");
        };
        assert!(body.is_empty());
    }
}
