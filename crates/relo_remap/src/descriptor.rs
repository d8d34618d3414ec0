//! Ivy dependency descriptors for relocated modules.

use std::fmt::Write;

use relo_common::Module;

/// Renders an Ivy 2.0 module descriptor for `module` listing `dependencies`.
///
/// Both are expected to be relocated coordinates.
pub fn ivy_descriptor(module: &Module, dependencies: &[Module]) -> String {
    let mut xml = String::with_capacity(512 + dependencies.len() * 96);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        "<ivy-module version=\"2.0\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xsi:noNamespaceSchemaLocation=\"http://ant.apache.org/ivy/schemas/ivy.xsd\">\n",
    );
    // Writing into a String cannot fail.
    let _ = writeln!(
        xml,
        "  <info organisation=\"{}\" module=\"{}\" revision=\"{}\" status=\"release\"/>",
        escape(&module.group),
        escape(&module.name),
        escape(&module.version)
    );
    if dependencies.is_empty() {
        xml.push_str("  <dependencies/>\n");
    } else {
        xml.push_str("  <dependencies>\n");
        for dep in dependencies {
            let _ = writeln!(
                xml,
                "    <dependency org=\"{}\" name=\"{}\" rev=\"{}\"/>",
                escape(&dep.group),
                escape(&dep.name),
                escape(&dep.version)
            );
        }
        xml.push_str("  </dependencies>\n");
    }
    xml.push_str("</ivy-module>\n");
    xml
}

/// Escapes a string for use inside a double-quoted XML attribute.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
