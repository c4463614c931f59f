//! Shader dependency resolver
//!
//! Joins a set of requested shader names against every shader script of
//! the content tree. The matched definitions are copied, verbatim, into one
//! aggregated script that replaces the original scripts in the archive.

use std::collections::{BTreeSet, HashSet};

use arenapack_core::types::{has_image_extension, Warning, DEFAULT_IMAGE_EXTENSION};
use arenapack_parsers::shader::{find_clamp_collisions, parse_shader_source, ClampCollision, ShaderScript};
use arenapack_vfs::path::join_paths;
use arenapack_vfs::FileStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ResolveResult;

/// Name given to the aggregated script when the caller does not pick one
pub const DEFAULT_SCRIPT_NAME: &str = "scripts/aggregated.shader";

const SHADER_SUFFIX: &str = ".shader";

/// Shader script built from the matched definitions of a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedScript {
    /// Archive path of the script
    pub name: String,
    /// Concatenated definition texts
    pub body: String,
}

impl AggregatedScript {
    /// Whether no definition matched
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Outcome of a resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyResult {
    /// Script file names holding at least one matched definition
    pub contributing_scripts: BTreeSet<String>,
    /// Images referenced by the matched definitions
    pub textures: BTreeSet<String>,
    /// Requested names without a definition
    pub unresolved: BTreeSet<String>,
    /// Requested names with a definition
    pub matched: BTreeSet<String>,
    /// The aggregated script
    pub script: AggregatedScript,
    /// Non-fatal problems
    pub warnings: Vec<Warning>,
}

/// Parsed shader scripts of one directory, in file name order
#[derive(Debug, Clone, Default)]
pub struct ScriptCorpus {
    scripts: Vec<(String, ShaderScript)>,
    warnings: Vec<Warning>,
}

impl ScriptCorpus {
    /// Parse every `.shader` file directly inside `script_root`.
    ///
    /// A script that cannot be read is skipped with a warning. A missing
    /// script directory is an empty corpus.
    pub fn load(store: &dyn FileStore, script_root: &str) -> ResolveResult<Self> {
        let mut corpus = Self::default();

        if !store.is_dir(script_root) {
            warn!(dir = script_root, "Shader script directory not found");
            return Ok(corpus);
        }

        for file_name in store.list_files_with_suffix(script_root, SHADER_SUFFIX)? {
            let path = join_paths(script_root, &file_name);
            let source = match store.read_to_string(&path) {
                Ok(source) => source,
                Err(e) => {
                    warn!(script = %path, error = %e, "Shader script not readable");
                    corpus.warnings.push(Warning::UnreadableScript {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let script = parse_shader_source(&source);
            if let Some(name) = &script.dropped {
                corpus.warnings.push(Warning::DroppedShader {
                    script: path.clone(),
                    name: name.clone(),
                });
            }

            debug!(script = %path, shaders = script.len(), "Parsed shader script");
            corpus.scripts.push((file_name, script));
        }

        Ok(corpus)
    }

    /// Build a corpus from already parsed scripts
    pub fn from_scripts(scripts: Vec<(String, ShaderScript)>) -> Self {
        Self {
            scripts,
            warnings: Vec::new(),
        }
    }

    /// Number of scripts
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether no script was loaded
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Scripts with their file names
    pub fn scripts(&self) -> impl Iterator<Item = (&str, &ShaderScript)> {
        self.scripts.iter().map(|(name, script)| (name.as_str(), script))
    }

    /// Resolve requested shader names against the corpus.
    ///
    /// Names are compared trimmed and lowercased. Every script defining a
    /// requested name contributes, so a name defined twice contributes both
    /// definitions.
    pub fn resolve<I, S>(&self, requested: I, default_extension: &str) -> DependencyResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested = normalize_requests(requested);
        let mut result = DependencyResult {
            script: AggregatedScript {
                name: DEFAULT_SCRIPT_NAME.to_string(),
                body: String::new(),
            },
            warnings: self.warnings.clone(),
            ..Default::default()
        };

        for (file_name, script) in &self.scripts {
            for name in &requested {
                let Some(definition) = script.get(name) else {
                    continue;
                };

                result.contributing_scripts.insert(file_name.clone());
                result.matched.insert(name.clone());
                result.script.body.push_str(&definition.text);
                for texture in &definition.textures {
                    result.textures.insert(with_extension(texture, default_extension));
                }
            }
        }

        for name in &requested {
            if !result.matched.contains(name) {
                debug!(shader = %name, "Shader not found");
                result.unresolved.insert(name.clone());
                result.warnings.push(Warning::UnresolvedShader { name: name.clone() });
            }
        }

        info!(
            requested = requested.len(),
            matched = result.matched.len(),
            scripts = result.contributing_scripts.len(),
            textures = result.textures.len(),
            "Resolved shader dependencies"
        );

        result
    }

    /// Images used with both wrap modes across the corpus
    pub fn clamp_collisions(&self) -> Vec<ClampCollision> {
        find_clamp_collisions(
            self.scripts
                .iter()
                .map(|(name, script)| (name.as_str(), script.to_source())),
        )
    }
}

/// Lowercase, trim and deduplicate names, keeping first-seen order
fn normalize_requests<I, S>(requested: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    requested
        .into_iter()
        .map(|name| name.as_ref().trim().to_lowercase())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}

fn with_extension(texture: &str, default_extension: &str) -> String {
    if has_image_extension(texture) {
        texture.to_string()
    } else {
        format!("{texture}.{default_extension}")
    }
}

/// Resolve shader names against the scripts in `script_root`
pub fn resolve_shader_dependencies<I, S>(
    requested: I,
    script_root: &str,
    store: &dyn FileStore,
) -> ResolveResult<DependencyResult>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let corpus = ScriptCorpus::load(store, script_root)?;
    Ok(corpus.resolve(requested, DEFAULT_IMAGE_EXTENSION))
}

/// Images used by both `map` and `clampMap` stages of the scripts in `script_root`.
///
/// Works on the raw script text, so scripts that fail to parse completely
/// are still checked.
pub fn lint_clamp_collisions(store: &dyn FileStore, script_root: &str) -> ResolveResult<Vec<ClampCollision>> {
    let mut sources = Vec::new();
    for file_name in store.list_files_with_suffix(script_root, SHADER_SUFFIX)? {
        let path = join_paths(script_root, &file_name);
        match store.read_to_string(&path) {
            Ok(source) => sources.push((file_name, source)),
            Err(e) => warn!(script = %path, error = %e, "Shader script not readable"),
        }
    }
    Ok(find_clamp_collisions(sources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenapack_vfs::MemoryStore;
    use proptest::prelude::*;

    const BASE: &str = "textures/base/metal1\n{\n\t{\n\t\tmap textures/base/metal1_d.tga\n\t}\n}\n\
textures/base/glow\n{\n\t{\n\t\tmap textures/base/glow\n\t}\n\t{\n\t\tclampmap textures/base/glow_blend.jpg\n\t}\n}\n";

    const SFX: &str = "textures/sfx/flame\n{\n\t{\n\t\tanimMap 8 textures/sfx/f1.tga textures/sfx/f2.tga\n\t}\n}\n\
textures/base/metal1\n{\n\t{\n\t\tmap textures/base/metal1_alt.tga\n\t}\n}\n";

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_file("scripts/base.shader", BASE)
            .with_file("scripts/sfx.shader", SFX)
            .with_file("scripts/readme.txt", "textures/sfx/flame\n{\n}\n")
            .with_file("scripts/nested/extra.shader", "textures/nested\n{\n}\n")
    }

    #[test]
    fn test_resolve_matches_and_aggregates() {
        let store = store();
        let result = resolve_shader_dependencies(
            ["Textures/Base/Metal1", "textures/sfx/flame", "textures/base/metal1", "textures/none", ""],
            "scripts",
            &store,
        )
        .unwrap();

        assert_eq!(result.contributing_scripts, BTreeSet::from(["base.shader".to_string(), "sfx.shader".to_string()]));
        assert_eq!(
            result.matched,
            BTreeSet::from(["textures/base/metal1".to_string(), "textures/sfx/flame".to_string()])
        );
        assert_eq!(result.unresolved, BTreeSet::from(["textures/none".to_string()]));
        assert_eq!(
            result.textures,
            BTreeSet::from([
                "textures/base/metal1_alt.tga".to_string(),
                "textures/base/metal1_d.tga".to_string(),
                "textures/sfx/f1.tga".to_string(),
                "textures/sfx/f2.tga".to_string(),
            ])
        );
        assert_eq!(result.warnings, vec![Warning::UnresolvedShader { name: "textures/none".into() }]);

        // Script order first (base, sfx), then request order within a script.
        let body = &result.script.body;
        let base_metal = body.find("metal1_d.tga").unwrap();
        let alt_metal = body.find("metal1_alt.tga").unwrap();
        let flame = body.find("animMap").unwrap();
        assert!(base_metal < alt_metal && alt_metal < flame);
        assert_eq!(result.script.name, DEFAULT_SCRIPT_NAME);
    }

    #[test]
    fn test_extension_less_stage_texture_gets_default() {
        let result = resolve_shader_dependencies(["textures/base/glow"], "scripts", &store()).unwrap();
        // The extension-less "map textures/base/glow" line carries no image token.
        assert_eq!(result.textures, BTreeSet::from(["textures/base/glow_blend.jpg".to_string()]));

        let corpus = ScriptCorpus::from_scripts(vec![(
            "x.shader".to_string(),
            parse_shader_source("a\n{\n{\nmap textures/plain.tga\n}\n}\n"),
        )]);
        assert_eq!(with_extension("textures/plain", "jpg"), "textures/plain.jpg");
        assert_eq!(corpus.resolve(["a"], "jpg").textures.len(), 1);
    }

    #[test]
    fn test_missing_script_dir_is_empty() {
        let result = resolve_shader_dependencies(["textures/a"], "shaders", &store()).unwrap();
        assert!(result.contributing_scripts.is_empty());
        assert!(result.script.is_empty());
        assert_eq!(result.unresolved.len(), 1);
    }

    #[test]
    fn test_dropped_shader_warning() {
        let store = MemoryStore::new().with_file("scripts/broken.shader", "textures/open\n{\n{\n");
        let corpus = ScriptCorpus::load(&store, "scripts").unwrap();
        let result = corpus.resolve(["textures/open"], "tga");

        assert!(result.warnings.contains(&Warning::DroppedShader {
            script: "scripts/broken.shader".into(),
            name: "textures/open".into(),
        }));
        assert!(result.unresolved.contains("textures/open"));
    }

    #[test]
    fn test_clamp_lint() {
        let store = MemoryStore::new()
            .with_file("scripts/a.shader", BASE)
            .with_file("scripts/b.shader", "x\n{\n{\n\tmap textures/base/glow_blend.jpg\n}\n}\n");

        let collisions = lint_clamp_collisions(&store, "scripts").unwrap();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].texture, "textures/base/glow_blend.jpg");
        assert_eq!(collisions[0].map_script, "b.shader");
        assert_eq!(collisions[0].clamp_script, "a.shader");

        let corpus = ScriptCorpus::load(&store, "scripts").unwrap();
        assert_eq!(corpus.clamp_collisions(), collisions);
    }

    proptest! {
        #[test]
        fn prop_matched_and_unresolved_partition_requests(
            picks in prop::collection::vec(prop::sample::select(vec![
                "textures/base/metal1", "TEXTURES/SFX/FLAME", "textures/base/glow",
                "textures/missing", "models/x", "textures/sfx/flame ",
            ]), 0..12)
        ) {
            let store = store();
            let result = resolve_shader_dependencies(picks.iter().copied(), "scripts", &store).unwrap();

            let requested: BTreeSet<String> = picks.iter().map(|p| p.trim().to_lowercase()).collect();
            let union: BTreeSet<String> = result.matched.union(&result.unresolved).cloned().collect();
            prop_assert_eq!(union, requested);
            prop_assert!(result.matched.is_disjoint(&result.unresolved));
        }
    }
}
