//! Module graph shapes as seen by a full relocation run.

use relo_common::Module;
use relo_conformance::{read_class, ClassSpec, JarBuilder, Workspace};
use relo_graph::{resolve_graph, Component, GraphError};
use relo_remap::{Outcome, OutputKind};

fn m(name: &str) -> Module {
    Module::new("org.demo", name, "1")
}

fn jar_with(class: &str) -> JarBuilder {
    JarBuilder::new().class(&ClassSpec::new(class))
}

#[test]
fn cycle_is_rejected_with_its_path() {
    let mut ws = Workspace::new();
    ws.library(&m("a"), &jar_with("org/demo/a/A"), &[m("b")]);
    ws.library(&m("b"), &jar_with("org/demo/b/B"), &[m("c")]);
    ws.library(&m("c"), &jar_with("org/demo/c/C"), &[m("a")]);

    let err = resolve_graph(ws.resolver(), &[m("a")]).unwrap_err();
    match &err {
        GraphError::CircularDependency { cycle } => {
            assert_eq!(cycle.first(), cycle.last());
            assert_eq!(cycle.len(), 4);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().starts_with("circular dependency: "));
    assert!(!ws.repository().exists());
}

#[test]
fn diamond_relocates_shared_module_once() {
    let mut ws = Workspace::new();
    ws.library(
        &m("top"),
        &JarBuilder::new().class(
            &ClassSpec::new("org/demo/top/Top")
                .field("left", "Lorg/demo/left/Left;")
                .field("base", "Lorg/demo/base/Base;"),
        ),
        &[m("left"), m("right")],
    );
    ws.library(&m("left"), &jar_with("org/demo/left/Left"), &[m("base")]);
    ws.library(&m("right"), &jar_with("org/demo/right/Right"), &[m("base")]);
    ws.library(&m("base"), &jar_with("org/demo/base/Base"), &[]);

    let graph = resolve_graph(ws.resolver(), &[m("top")]).unwrap();
    assert_eq!(graph.len(), 4);

    let relocator = ws.relocator("ns");
    let report = relocator.relocate(&graph).unwrap();
    assert_eq!(report.modules.len(), 4);
    let base_reports = report
        .modules
        .iter()
        .filter(|r| r.module == m("base"))
        .count();
    assert_eq!(base_reports, 1);

    // Transitive classes are part of the top module's map.
    let class = read_class(
        &relocator.layout().artifact_path(&m("top")),
        "ns/org/demo/top/Top.class",
    );
    let descriptors: Vec<String> = class
        .fields
        .iter()
        .map(|f| class.member_signature(f).unwrap().1)
        .collect();
    assert_eq!(
        descriptors,
        vec!["Lns/org/demo/left/Left;", "Lns/org/demo/base/Base;"]
    );
}

#[test]
fn unrelated_module_classes_are_not_renamed() {
    let mut ws = Workspace::new();
    ws.library(
        &m("app"),
        &JarBuilder::new().class(
            &ClassSpec::new("org/demo/app/App").field("other", "Lorg/demo/other/Other;"),
        ),
        &[],
    );
    ws.library(&m("other"), &jar_with("org/demo/other/Other"), &[]);

    let graph = resolve_graph(ws.resolver(), &[m("app"), m("other")]).unwrap();
    let relocator = ws.relocator("ns");
    relocator.relocate(&graph).unwrap();

    let class = read_class(
        &relocator.layout().artifact_path(&m("app")),
        "ns/org/demo/app/App.class",
    );
    let (_, descriptor) = class.member_signature(&class.fields[0]).unwrap();
    assert_eq!(descriptor, "Lorg/demo/other/Other;");
}

#[test]
fn platform_nodes_produce_no_output() {
    let mut ws = Workspace::new();
    ws.library(&m("lib"), &jar_with("org/demo/lib/Lib"), &[m("bom")]);
    ws.register(Component::platform(m("bom")));

    let graph = resolve_graph(ws.resolver(), &[m("lib")]).unwrap();
    assert_eq!(graph.len(), 1);

    let relocator = ws.relocator("ns");
    let report = relocator.relocate(&graph).unwrap();
    let lib = report.module(&m("lib")).unwrap();
    assert!(lib.dependencies.is_empty());
    assert_eq!(lib.outcome(OutputKind::Binary), Some(Outcome::Written));
    assert!(report.module(&m("bom")).is_none());
}

#[test]
fn missing_artifact_aborts_resolution() {
    let mut ws = Workspace::new();
    ws.library(&m("lib"), &jar_with("org/demo/lib/Lib"), &[m("ghost")]);
    let mut ghost = Component::platform(m("ghost"));
    ghost.platform = false;
    ws.register(ghost);

    let err = resolve_graph(ws.resolver(), &[m("lib")]).unwrap_err();
    assert!(
        matches!(&err, GraphError::MissingArtifact { module } if module == &m("ghost")),
        "{err}"
    );
}

#[test]
fn unknown_dependency_names_its_parent() {
    let mut ws = Workspace::new();
    ws.library(&m("lib"), &jar_with("org/demo/lib/Lib"), &[m("nowhere")]);

    let err = resolve_graph(ws.resolver(), &[m("lib")]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unknown component org.demo:nowhere:1 (required by org.demo:lib:1)"
    );
}

#[test]
fn dedicated_worker_pool_gives_same_result() {
    let mut ws = Workspace::new();
    for name in ["a", "b", "c", "d"] {
        ws.library(&m(name), &jar_with(&format!("org/demo/{name}/Type")), &[]);
    }
    let roots: Vec<Module> = ["a", "b", "c", "d"].into_iter().map(m).collect();
    let graph = resolve_graph(ws.resolver(), &roots).unwrap();

    let mut options = relo_remap::RelocationOptions::new(
        relo_common::Namespace::new("ns").unwrap(),
        ws.repository(),
    );
    options.jobs = Some(2);
    let report = relo_remap::Relocator::new(options).relocate(&graph).unwrap();
    assert_eq!(report.count(Outcome::Written), 8);
}
