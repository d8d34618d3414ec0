//! Source archive relocation.

use relo_cache::{HashAlgorithm, IntegrityCache};
use relo_common::{Module, Namespace};
use relo_conformance::{entry_names, read_entry, ClassSpec, JarBuilder, Workspace};
use relo_graph::resolve_graph;
use relo_remap::{
    plan_archives, transform_artifact, ArtifactKind, Outcome, OutputKind, SourceRemapper,
    TransformRequest,
};

const A_JAVA: &str = "\
package com.acme.a;

import com.acme.b.B;
import com.acme.b.util.*;
import java.util.List;

/** Uses {@link com.acme.b.B}. */
public class A {
    private final com.acme.b.util.Helper helper = new com.acme.b.util.Helper();
    static final String NAME = \"com.acme.b.B\";
    List<B> all;
}
";

fn a() -> Module {
    Module::new("com.acme", "a", "1.0")
}

fn b() -> Module {
    Module::new("com.acme", "b", "1.0")
}

fn workspace() -> Workspace {
    let mut ws = Workspace::new();
    ws.library(
        &a(),
        &JarBuilder::new().class(&ClassSpec::new("com/acme/a/A")),
        &[b()],
    );
    ws.library(
        &b(),
        &JarBuilder::new()
            .class(&ClassSpec::new("com/acme/b/B"))
            .class(&ClassSpec::new("com/acme/b/util/Helper")),
        &[],
    );
    ws.sources(
        &a(),
        &JarBuilder::new()
            .manifest()
            .dir("com/acme/a/")
            .source("com/acme/a/A.java", A_JAVA),
    );
    ws.sources(
        &b(),
        &JarBuilder::new()
            .source("com/acme/b/B.java", "package com.acme.b;\npublic class B {}\n")
            .source(
                "com/acme/b/util/Helper.java",
                "package com.acme.b.util;\npublic class Helper {}\n",
            ),
    );
    ws
}

#[test]
fn source_archive_is_relocated_alongside_classes() {
    let ws = workspace();
    let graph = resolve_graph(ws.resolver(), &[a()]).unwrap();
    let relocator = ws.relocator("ns");
    let report = relocator.relocate(&graph).unwrap();
    assert_eq!(
        report.module(&a()).unwrap().outcome(OutputKind::Sources),
        Some(Outcome::Written)
    );

    let jar = relocator.layout().sources_path(&a());
    assert!(jar.ends_with("ns/com/acme/a/1.0/a-1.0-sources.jar"));
    assert_eq!(
        entry_names(&jar),
        vec![
            "META-INF/",
            "META-INF/MANIFEST.MF",
            "ns/com/acme/a/",
            "ns/com/acme/a/A.java",
        ]
    );

    let text = String::from_utf8(read_entry(&jar, "ns/com/acme/a/A.java")).unwrap();
    assert!(text.starts_with("package ns.com.acme.a;\n"));
    assert!(text.contains("import ns.com.acme.b.B;"));
    assert!(text.contains("import ns.com.acme.b.util.*;"));
    assert!(text.contains("import java.util.List;"));
    assert!(text.contains("{@link ns.com.acme.b.B}"));
    assert!(text.contains("new ns.com.acme.b.util.Helper()"));
    // Literals are text like any other.
    assert!(text.contains("\"ns.com.acme.b.B\""));
    assert!(text.contains("List<B> all;"));
}

#[test]
fn relocated_source_is_stable_under_a_second_rewrite() {
    let ws = workspace();
    let map = plan_archives(
        &Namespace::new("ns").unwrap(),
        &[
            ws.path("inputs/a-1.0-sources.jar"),
            ws.path("inputs/b-1.0-sources.jar"),
        ],
    )
    .unwrap();
    let remapper = SourceRemapper::new(&map);

    let once = remapper.rewrite("com/acme/a/A.java", A_JAVA.as_bytes().to_vec());
    let twice = remapper.rewrite("com/acme/a/A.java", once.clone());
    assert_eq!(
        String::from_utf8(twice).unwrap(),
        String::from_utf8(once).unwrap()
    );
}

#[test]
fn longer_package_wins_over_its_prefix() {
    let ws = Workspace::new();
    let jar = ws.path("inputs/lib-sources.jar");
    JarBuilder::new()
        .source("com/acme/Api.java", "package com.acme;\npublic class Api {}\n")
        .source(
            "com/acme/ApiImpl.java",
            "package com.acme;\npublic class ApiImpl extends com.acme.Api {}\n",
        )
        .write(&jar);

    let map = plan_archives(&Namespace::new("ns").unwrap(), &[jar]).unwrap();
    let remapper = SourceRemapper::new(&map);
    let out = remapper.rewrite(
        "com/acme/Use.java",
        b"package com.acme;\nclass Use { com.acme.ApiImpl impl; com.acme.ApiX other; }\n".to_vec(),
    );
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "package ns.com.acme;\nclass Use { ns.com.acme.ApiImpl impl; com.acme.ApiX other; }\n"
    );
}

#[test]
fn sources_can_be_excluded() {
    let ws = workspace();
    let graph = resolve_graph(ws.resolver(), &[a()]).unwrap();
    let mut options = relo_remap::RelocationOptions::new(
        Namespace::new("ns").unwrap(),
        ws.repository(),
    );
    options.include_sources = false;
    let relocator = relo_remap::Relocator::new(options);
    let report = relocator.relocate(&graph).unwrap();

    assert_eq!(
        report.module(&a()).unwrap().outcome(OutputKind::Sources),
        Some(Outcome::Skipped)
    );
    assert!(!relocator.layout().sources_path(&a()).exists());
}

#[test]
fn single_source_archive_transform() {
    let ws = workspace();
    let output = ws.path("out/a-sources.jar");
    let request = TransformRequest {
        namespace: Namespace::new("ns").unwrap(),
        kind: ArtifactKind::Sources,
        input: ws.path("inputs/a-1.0-sources.jar"),
        dependencies: vec![ws.path("inputs/b-1.0-sources.jar")],
        output: output.clone(),
    };
    let cache = IntegrityCache::new(HashAlgorithm::Sha256);

    assert_eq!(transform_artifact(&request, &cache).unwrap(), Outcome::Written);
    assert!(cache.sidecar_path(&output).is_file());
    let text = String::from_utf8(read_entry(&output, "ns/com/acme/a/A.java")).unwrap();
    assert!(text.contains("import ns.com.acme.b.B;"));

    assert_eq!(transform_artifact(&request, &cache).unwrap(), Outcome::UpToDate);
}
