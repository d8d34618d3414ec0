//! Source text rewriting.
//!
//! Qualified names are matched in a single left-to-right pass over the bytes
//! with a trie of every relocated class and package name. Matching starts only
//! at a token boundary, picks the longest key that ends at a word boundary, and
//! skips tokens that are already under the namespace. Text between matches is
//! copied as whole ranges.

use std::collections::{HashMap, HashSet};

use relo_common::Namespace;

use crate::plan::{RenameMap, SOURCE_SUFFIX};

/// Rewrites `.java` entries against one [`RenameMap`].
#[derive(Debug, Clone)]
pub struct SourceRemapper {
    namespace: Namespace,
    trie: NameTrie,
    /// Relocated `.java` entries at the archive root.
    default_package: HashSet<String>,
}

impl SourceRemapper {
    /// Builds the substitution trie from the map's class and package names.
    pub fn new(map: &RenameMap) -> Self {
        let mut trie = NameTrie::default();
        for (old, new) in map.class_names() {
            trie.insert(old.as_bytes(), KeyKind::Class, new.into_bytes());
        }
        for (old, new) in map.package_names() {
            trie.insert(old.as_bytes(), KeyKind::Package, new.into_bytes());
        }
        let default_package = map
            .iter()
            .filter(|(old, _)| old.ends_with(SOURCE_SUFFIX) && !old.contains('/'))
            .map(|(old, _)| old.to_string())
            .collect();
        Self {
            namespace: map.namespace().clone(),
            trie,
            default_package,
        }
    }

    /// Rewrites one source file. `path` is the entry's original path and
    /// determines the package declaration to relocate. Returns `text` itself
    /// when nothing changed.
    pub fn rewrite(&self, path: &str, text: Vec<u8>) -> Vec<u8> {
        let text = match declared_package(path) {
            Some(package) => self.rewrite_package(&package, text),
            None if self.default_package.contains(path) => self.declare_namespace(text),
            None => text,
        };
        self.substitute(text)
    }

    /// A default-package file moves into the namespace package itself, so it
    /// gains a `package` declaration unless it already has one.
    fn declare_namespace(&self, text: Vec<u8>) -> Vec<u8> {
        let declaration = format!("package {};", self.namespace.dotted()).into_bytes();
        if find(&text, &declaration).is_some() {
            return text;
        }
        let mut out = Vec::with_capacity(declaration.len() + 2 + text.len());
        out.extend_from_slice(&declaration);
        out.extend_from_slice(b"\n\n");
        out.extend_from_slice(&text);
        out
    }

    fn rewrite_package(&self, package: &str, text: Vec<u8>) -> Vec<u8> {
        let needle = format!("package {package}").into_bytes();
        let replacement = format!("package {}.{package}", self.namespace.dotted()).into_bytes();

        let mut out: Option<Vec<u8>> = None;
        let mut copied = 0;
        let mut from = 0;
        while let Some(at) = find(&text[from..], &needle).map(|i| i + from) {
            let end = at + needle.len();
            let bounded = text.get(end).map_or(true, |&b| !is_word_byte(b) && b != b'.')
                && (at == 0 || !is_token_byte(text[at - 1]));
            if bounded {
                let buf = out.get_or_insert_with(|| Vec::with_capacity(text.len() + 64));
                buf.extend_from_slice(&text[copied..at]);
                buf.extend_from_slice(&replacement);
                copied = end;
            }
            from = end;
        }
        match out {
            Some(mut buf) => {
                buf.extend_from_slice(&text[copied..]);
                buf
            }
            None => text,
        }
    }

    fn substitute(&self, text: Vec<u8>) -> Vec<u8> {
        let mut out: Option<Vec<u8>> = None;
        let mut copied = 0;
        let mut i = 0;
        while i < text.len() {
            if !is_token_byte(text[i]) {
                i += 1;
                continue;
            }
            let end = token_end(&text, i);
            if let Some((matched, replacement)) = self.match_token(&text, i, end) {
                let buf = out.get_or_insert_with(|| Vec::with_capacity(text.len() + 256));
                buf.extend_from_slice(&text[copied..i]);
                buf.extend_from_slice(replacement);
                copied = matched;
            }
            i = end;
        }
        match out {
            Some(mut buf) => {
                buf.extend_from_slice(&text[copied..]);
                buf
            }
            None => text,
        }
    }

    /// Finds the substitution for the token `text[start..end]`, returning the
    /// end of the matched prefix and its replacement.
    fn match_token<'a>(
        &'a self,
        text: &[u8],
        start: usize,
        end: usize,
    ) -> Option<(usize, &'a [u8])> {
        let ns = self.namespace.dotted().as_bytes();
        let token = &text[start..end];
        if token.len() > ns.len() && token.starts_with(ns) && token[ns.len()] == b'.' {
            let rest = start + ns.len() + 1;
            if self.trie.longest(text, rest, end).is_some() {
                return None;
            }
        }
        self.trie.longest(text, start, end)
    }
}

/// The dotted package of a source entry, e.g. `com/acme/Foo.java` to `com.acme`.
fn declared_package(path: &str) -> Option<String> {
    let stem = path.strip_suffix(SOURCE_SUFFIX)?;
    let slash = stem.rfind('/')?;
    Some(stem[..slash].replace('/', "."))
}

/// Letters, digits, `_`, `$` and any non-ASCII byte.
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Word bytes plus `.`, i.e. anything that can continue a qualified name.
fn is_token_byte(b: u8) -> bool {
    is_word_byte(b) || b == b'.'
}

fn token_end(text: &[u8], start: usize) -> usize {
    text[start..]
        .iter()
        .position(|&b| !is_token_byte(b))
        .map_or(text.len(), |n| start + n)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    /// Matches when followed by a non-word byte.
    Class,
    /// Matches only when followed by `.*`.
    Package,
}

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: HashMap<u8, usize>,
    class: Option<usize>,
    package: Option<usize>,
}

#[derive(Debug, Clone)]
struct NameTrie {
    nodes: Vec<TrieNode>,
    replacements: Vec<Vec<u8>>,
}

impl Default for NameTrie {
    fn default() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            replacements: Vec::new(),
        }
    }
}

impl NameTrie {
    fn insert(&mut self, key: &[u8], kind: KeyKind, replacement: Vec<u8>) {
        let mut node = 0;
        for &b in key {
            node = match self.nodes[node].children.get(&b) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(b, next);
                    next
                }
            };
        }
        let slot = self.replacements.len();
        self.replacements.push(replacement);
        let target = &mut self.nodes[node];
        match kind {
            KeyKind::Class => target.class = Some(slot),
            KeyKind::Package => target.package = Some(slot),
        }
    }

    /// Longest key matching `text` from `start` without passing `end`.
    fn longest(&self, text: &[u8], start: usize, end: usize) -> Option<(usize, &[u8])> {
        let mut node = 0;
        let mut best = None;
        for (offset, &b) in text[start..end].iter().enumerate() {
            match self.nodes[node].children.get(&b) {
                Some(&next) => node = next,
                None => break,
            }
            let at = start + offset + 1;
            let entry = &self.nodes[node];
            let next = text.get(at).copied();
            if let Some(slot) = entry.class {
                if next.map_or(true, |b| !is_word_byte(b)) {
                    best = Some((at, slot));
                }
            }
            if let Some(slot) = entry.package {
                if next == Some(b'.') && text.get(at + 1) == Some(&b'*') {
                    best = Some((at, slot));
                }
            }
        }
        best.map(|(at, slot)| (at, self.replacements[slot].as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ArchiveScan;
    use relo_common::ContentHash;
    use std::path::PathBuf;

    fn remapper(entries: &[&str]) -> SourceRemapper {
        let scan = ArchiveScan {
            path: PathBuf::from("src.jar"),
            entries: entries.iter().map(|s| s.to_string()).collect(),
            fingerprint: ContentHash::from_bytes(b""),
        };
        SourceRemapper::new(&RenameMap::build(&Namespace::new("ns").unwrap(), [&scan]))
    }

    fn rewrite(r: &SourceRemapper, path: &str, text: &str) -> String {
        String::from_utf8(r.rewrite(path, text.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn rewrites_package_and_references() {
        let r = remapper(&["com/acme/Foo.java", "com/acme/util/Bar.java"]);
        let src = "package com.acme;\n\nimport com.acme.util.Bar;\n\nclass Foo { com.acme.util.Bar b; }\n";
        assert_eq!(
            rewrite(&r, "com/acme/Foo.java", src),
            "package ns.com.acme;\n\nimport ns.com.acme.util.Bar;\n\nclass Foo { ns.com.acme.util.Bar b; }\n"
        );
    }

    #[test]
    fn rewrite_is_idempotent() {
        let r = remapper(&["com/acme/Foo.java", "com/acme/util/Bar.java"]);
        let src = "package com.acme;\nimport com.acme.util.Bar;\nimport com.acme.util.*;\n";
        let once = rewrite(&r, "com/acme/Foo.java", src);
        let twice = rewrite(&r, "com/acme/Foo.java", &once);
        assert_eq!(once, twice);
        assert!(!twice.contains("ns.ns."));
    }

    #[test]
    fn longest_match_wins() {
        let r = remapper(&["com/acme/Foo.java", "com/acme/Foo/Inner.java"]);
        let out = rewrite(&r, "Main.java", "x = com.acme.Foo.Inner.VALUE;");
        assert_eq!(out, "x = ns.com.acme.Foo.Inner.VALUE;");
    }

    #[test]
    fn prefix_of_longer_identifier_is_not_matched() {
        let r = remapper(&["com/acme/Foo.java"]);
        assert_eq!(
            rewrite(&r, "Main.java", "com.acme.FooBar x; com.acme.Foo y;"),
            "com.acme.FooBar x; ns.com.acme.Foo y;"
        );
    }

    #[test]
    fn match_requires_token_start() {
        let r = remapper(&["com/acme/Foo.java"]);
        assert_eq!(
            rewrite(&r, "Main.java", "org.com.acme.Foo a; xcom.acme.Foo b;"),
            "org.com.acme.Foo a; xcom.acme.Foo b;"
        );
    }

    #[test]
    fn member_access_after_class_still_matches() {
        let r = remapper(&["com/acme/Foo.java"]);
        assert_eq!(
            rewrite(&r, "Main.java", "com.acme.Foo.create();"),
            "ns.com.acme.Foo.create();"
        );
    }

    #[test]
    fn wildcard_imports_use_package_keys() {
        let r = remapper(&["com/acme/Foo.java"]);
        assert_eq!(
            rewrite(&r, "Main.java", "import com.acme.*;\nint acme = com.acme;"),
            "import ns.com.acme.*;\nint acme = com.acme;"
        );
    }

    #[test]
    fn string_literals_with_qualified_names_are_rewritten() {
        let r = remapper(&["com/acme/Foo.java"]);
        assert_eq!(
            rewrite(&r, "Main.java", "Class.forName(\"com.acme.Foo\")"),
            "Class.forName(\"ns.com.acme.Foo\")"
        );
    }

    #[test]
    fn package_declaration_needs_a_boundary() {
        let r = remapper(&["com/acme/Foo.java"]);
        let out = rewrite(&r, "com/acme/Foo.java", "package com.acmetools;\n");
        assert_eq!(out, "package com.acmetools;\n");
    }

    #[test]
    fn unchanged_text_is_returned_as_is() {
        let r = remapper(&["com/acme/Foo.java"]);
        let text = b"class Nothing { int x; }".to_vec();
        let ptr = text.as_ptr();
        let out = r.rewrite("Nothing.java", text);
        assert_eq!(out.as_ptr(), ptr);
    }

    #[test]
    fn non_ascii_bytes_are_preserved() {
        let r = remapper(&["com/acme/Foo.java"]);
        let src = "// caf\u{e9}\ncom.acme.Foo f; // \u{2603}";
        assert_eq!(
            rewrite(&r, "Main.java", src),
            "// caf\u{e9}\nns.com.acme.Foo f; // \u{2603}"
        );
    }

    #[test]
    fn default_package_file_gains_namespace_declaration() {
        let r = remapper(&["Foo.java", "com/acme/Bar.java"]);
        let src = "public class Foo { Foo() {} com.acme.Bar bar; }\n";
        let once = rewrite(&r, "Foo.java", src);
        assert_eq!(
            once,
            "package ns;\n\npublic class Foo { Foo() {} ns.com.acme.Bar bar; }\n"
        );
        assert_eq!(rewrite(&r, "Foo.java", &once), once);
    }

    #[test]
    fn default_package_names_are_not_qualified_keys() {
        let r = remapper(&["Foo.java", "Foo.class"]);
        assert_eq!(
            rewrite(&r, "Main.java", "class Main { Foo foo; String s = \"Foo\"; }"),
            "class Main { Foo foo; String s = \"Foo\"; }"
        );
    }

    #[test]
    fn declared_package_from_path() {
        assert_eq!(declared_package("com/acme/Foo.java").as_deref(), Some("com.acme"));
        assert_eq!(declared_package("Foo.java"), None);
        assert_eq!(declared_package("com/acme/Foo.class"), None);
    }
}
