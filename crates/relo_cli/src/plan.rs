//! `relo plan`: print the entry rename map.

use std::collections::BTreeMap;
use std::io::Write;

use relo_remap::{plan_archives, RenameMap};

use crate::pipeline::parse_namespace;
use crate::{GlobalArgs, PlanArgs, ReportFormat};

/// Runs the `relo plan` command, writing the map to stdout.
pub fn run(args: &PlanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let namespace = parse_namespace(&args.namespace)?;
    let map = plan_archives(&namespace, &args.archives)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(render(&map, args.format)?.as_bytes())?;
    if !global.quiet {
        eprintln!(
            "     Planned {} renames across {} archives",
            map.len(),
            args.archives.len()
        );
    }
    Ok(0)
}

fn render(map: &RenameMap, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => {
            let mut out = String::new();
            for (old, new) in map.iter() {
                out.push_str(old);
                out.push_str(" -> ");
                out.push_str(new);
                out.push('\n');
            }
            Ok(out)
        }
        ReportFormat::Json => {
            let entries: BTreeMap<&str, &str> = map.iter().collect();
            let mut json = serde_json::to_string_pretty(&entries)?;
            json.push('\n');
            Ok(json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relo_common::Namespace;

    fn map() -> RenameMap {
        let mut map = RenameMap::new(Namespace::new("ns").unwrap());
        map.add_entry("a/A.class");
        map.add_entry("META-INF/MANIFEST.MF");
        map
    }

    #[test]
    fn text_lists_pairs() {
        assert_eq!(render(&map(), ReportFormat::Text).unwrap(), "a/A.class -> ns/a/A.class\n");
    }

    #[test]
    fn json_is_an_object() {
        let json: serde_json::Value =
            serde_json::from_str(&render(&map(), ReportFormat::Json).unwrap()).unwrap();
        assert_eq!(json["a/A.class"], "ns/a/A.class");
    }
}
