//! `relo relocate`: relocate every library of the manifest.

use std::io::Write;

use relo_graph::resolve_graph;
use relo_remap::{Outcome, OutputKind, RelocationOptions, RelocationReport, Relocator};

use crate::pipeline::{manifest_dir, manifest_resolver, resolve_manifest_path};
use crate::{GlobalArgs, RelocateArgs};

/// Runs the `relo relocate` command.
///
/// Loads the manifest, resolves the module graph, relocates it and optionally
/// writes the JSON report. Returns exit code 0 on success.
pub fn run(args: &RelocateArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let manifest = resolve_manifest_path(global)?;
    let config = relo_config::load_config_file(&manifest)?;
    let relocation = relo_config::resolve_relocation(&config, &manifest_dir(&manifest))?;
    tracing::debug!(
        manifest = %manifest.display(),
        libraries = relocation.libraries.len(),
        roots = relocation.roots.len(),
        "loaded manifest"
    );

    if !global.quiet {
        eprintln!(
            "   Relocating {} libraries into {}",
            relocation.libraries.len(),
            relocation.namespace
        );
    }

    let resolver = manifest_resolver(&relocation);
    let graph = resolve_graph(&resolver, &relocation.roots)?;

    let options = RelocationOptions {
        namespace: relocation.namespace.clone(),
        scheme: relocation.scheme.clone(),
        repository: args.output.clone().unwrap_or_else(|| relocation.output.clone()),
        include_sources: relocation.include_sources && !args.no_sources,
        hash: relocation.hash,
        jobs: args.jobs.or(relocation.jobs),
    };
    let report = Relocator::new(options).relocate(&graph)?;

    if !global.quiet {
        print_summary(&report, global.verbose);
    }
    if let Some(target) = &args.report {
        write_report(&report, target)?;
    }
    Ok(0)
}

fn print_summary(report: &RelocationReport, verbose: bool) {
    for module in &report.modules {
        let status = match module.outcome(OutputKind::Binary) {
            Some(Outcome::Written) => "Relocated",
            Some(Outcome::UpToDate) => "Fresh",
            _ => "Skipped",
        };
        if verbose || status != "Fresh" {
            eprintln!("{status:>12} {} -> {}", module.module, module.remapped);
        }
    }
    eprintln!(
        "    Finished {} written, {} up to date in {} ms",
        report.count(Outcome::Written),
        report.count(Outcome::UpToDate),
        report.elapsed_ms
    );
}

fn write_report(report: &RelocationReport, target: &str) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(report)?;
    if target == "-" {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{json}")?;
    } else {
        std::fs::write(target, json + "\n")?;
    }
    Ok(())
}
