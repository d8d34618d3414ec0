//! `relo transform`: relocate a single archive.

use relo_cache::{HashAlgorithm, IntegrityCache};
use relo_remap::{transform_artifact, ArtifactKind, Outcome, TransformRequest};

use crate::pipeline::parse_namespace;
use crate::{ArchiveKind, GlobalArgs, TransformArgs};

/// Runs the `relo transform` command.
pub fn run(args: &TransformArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let hash: HashAlgorithm = args.hash.parse()?;
    let request = TransformRequest {
        namespace: parse_namespace(&args.namespace)?,
        kind: match args.kind {
            ArchiveKind::Binary => ArtifactKind::Binary,
            ArchiveKind::Sources => ArtifactKind::Sources,
        },
        input: args.input.clone(),
        dependencies: args.dependencies.clone(),
        output: args.output.clone(),
    };

    let outcome = transform_artifact(&request, &IntegrityCache::new(hash))?;
    if !global.quiet {
        let status = match outcome {
            Outcome::Written => "Relocated",
            Outcome::UpToDate => "Fresh",
            Outcome::Skipped => "Skipped",
        };
        eprintln!(
            "{status:>12} {} -> {}",
            request.input.display(),
            request.output.display()
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_hash_is_an_error() {
        let args = TransformArgs {
            input: "a.jar".into(),
            output: "b.jar".into(),
            namespace: "ns".into(),
            dependencies: Vec::new(),
            kind: ArchiveKind::Binary,
            hash: "md5".into(),
        };
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: None,
        };
        assert!(run(&args, &global).is_err());
    }
}
