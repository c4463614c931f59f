//! Dependency closures
//!
//! A closure is everything a client needs to render one top-level asset:
//! the asset itself, its skins, one aggregated shader script and every
//! image the shaders (or the asset directly) reference.
//!
//! ```text
//! map    -> textures + effects --------------------+
//! model  -> surface shaders  --+                   +--> resolver --> files
//! skins  -> shader names     --+--> shader names --+
//! ```
//!
//! Names that no script defines are implicit images: the engine loads the
//! image of that name directly.

use std::collections::{BTreeSet, HashSet};

use arenapack_core::ResultExt;
use arenapack_core::types::{
    has_image_extension, strip_image_extension, AssetKind, FileRef, JobKind, Warning,
};
use arenapack_export::{ArchiveWriter, ImageCodec, PackReport, Packer};
use arenapack_parsers::{parse_map_dependencies, parse_model_shader_refs, parse_skin};
use arenapack_vfs::path::{file_stem, filename, glob_match, join_paths, normalize_path, parent_path};
use arenapack_vfs::FileStore;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::CollectorConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::resolver::{AggregatedScript, ScriptCorpus};

/// The resolved content of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Closure {
    /// Kind of top-level asset
    pub job: JobKind,
    /// Job name (map name, model stem or player name)
    pub name: String,
    /// Files to ship, generated script included, in packing order
    pub files: Vec<FileRef>,
    /// The generated script
    pub script: AggregatedScript,
    /// Scripts the generated one was built from
    pub contributing_scripts: BTreeSet<String>,
    /// Entity classes of a map that imply extra models (not packed)
    pub entities: BTreeSet<String>,
    /// Requested names without a shader definition
    pub unresolved: BTreeSet<String>,
    /// Non-fatal problems
    pub warnings: Vec<Warning>,
}

impl Closure {
    /// Files that come from the content tree (everything but the script)
    pub fn content_files(&self) -> impl Iterator<Item = &FileRef> {
        self.files.iter().filter(move |f| f.path != self.script.name)
    }

    /// Number of image files
    pub fn texture_count(&self) -> usize {
        self.files.iter().filter(|f| f.kind == AssetKind::Texture).count()
    }
}

/// Ordered, duplicate-free file list
#[derive(Default)]
struct FileList {
    files: Vec<FileRef>,
    seen: HashSet<String>,
}

impl FileList {
    fn push(&mut self, file: FileRef) {
        if self.seen.insert(file.path.clone()) {
            self.files.push(file);
        }
    }

    fn push_path(&mut self, path: impl Into<String>) {
        self.push(FileRef::new(path));
    }
}

/// Requests gathered from a model or player directory
#[derive(Default)]
struct ModelRequests {
    files: Vec<String>,
    names: Vec<String>,
    warnings: Vec<Warning>,
}

/// Computes closures against a content store
pub struct DependencyCollector<'a> {
    store: &'a dyn FileStore,
    config: &'a CollectorConfig,
}

impl<'a> DependencyCollector<'a> {
    /// Collector reading from `store` with the given settings
    pub fn new(store: &'a dyn FileStore, config: &'a CollectorConfig) -> Self {
        Self { store, config }
    }

    /// Settings this collector was built with
    pub fn config(&self) -> &CollectorConfig {
        self.config
    }

    /// Closure of any job kind, failures tagged with the input path
    pub fn collect(&self, job: JobKind, input: &str) -> arenapack_core::Result<Closure> {
        let closure = match job {
            JobKind::Map => self.collect_map(input),
            JobKind::Model => self.collect_model(input),
            JobKind::Player => self.collect_player(input),
        };
        closure.with_context(|| format!("Failed to resolve {input}"))
    }

    /// Closure of a map (`maps/<name>.bsp`)
    pub fn collect_map(&self, map_path: &str) -> ResolveResult<Closure> {
        let map_path = normalize_path(map_path);
        let data = self.read_input(&map_path)?;
        let deps = parse_map_dependencies(&data, &self.config.map)
            .map_err(|e| ResolveError::parse(&map_path, e))?;

        info!(
            map = %map_path,
            textures = deps.texture_names.len(),
            effects = deps.effect_names.len(),
            entities = deps.entity_class_names.len(),
            "Collecting map"
        );

        let requests: Vec<&str> = deps
            .texture_names
            .iter()
            .chain(deps.effect_names.iter())
            .map(String::as_str)
            .collect();

        let mut closure = self.finish(JobKind::Map, file_stem(&map_path), vec![map_path.clone()], &requests)?;
        closure.entities = deps.entity_class_names;
        Ok(closure)
    }

    /// Closure of a single model and the skins next to it
    pub fn collect_model(&self, model_path: &str) -> ResolveResult<Closure> {
        let model_path = normalize_path(model_path);
        let mut requests = ModelRequests::default();
        self.add_model(&model_path, &mut requests)?;

        let dir = parent_path(&model_path).unwrap_or_default();
        let pattern = format!("{}_*.skin", file_stem(&model_path));
        if self.store.is_dir(&dir) {
            for node in self.store.list_dir(&dir)? {
                if node.is_file() && glob_match(&pattern, &node.name) {
                    self.add_skin(&join_paths(&dir, &node.name), &mut requests);
                }
            }
        }

        info!(model = %model_path, files = requests.files.len(), "Collecting model");
        let mut closure = self.finish(JobKind::Model, file_stem(&model_path), requests.files, &requests.names)?;
        closure.warnings.extend(requests.warnings);
        Ok(closure)
    }

    /// Closure of a player directory: every model and skin in it
    pub fn collect_player(&self, player_dir: &str) -> ResolveResult<Closure> {
        let player_dir = normalize_path(player_dir);
        if !self.store.is_dir(&player_dir) {
            return Err(ResolveError::MissingInput { path: player_dir });
        }

        let mut requests = ModelRequests::default();
        for node in self.store.list_dir(&player_dir)? {
            if !node.is_file() {
                continue;
            }
            let path = join_paths(&player_dir, &node.name);
            if node.has_extension("md3") {
                self.add_model(&path, &mut requests)?;
            } else if node.has_extension("skin") {
                self.add_skin(&path, &mut requests);
            }
        }

        info!(player = %player_dir, files = requests.files.len(), "Collecting player");
        let mut closure = self.finish(JobKind::Player, filename(&player_dir), requests.files, &requests.names)?;
        closure.warnings.extend(requests.warnings);
        Ok(closure)
    }

    fn read_input(&self, path: &str) -> ResolveResult<Vec<u8>> {
        match self.store.read(path) {
            Ok(data) => Ok(data),
            Err(e) if e.is_not_found() => Err(ResolveError::MissingInput { path: path.to_string() }),
            Err(e) => Err(e.into()),
        }
    }

    fn add_model(&self, path: &str, requests: &mut ModelRequests) -> ResolveResult<()> {
        let data = self.read_input(path)?;
        let refs = parse_model_shader_refs(&data).map_err(|e| ResolveError::parse(path, e))?;
        debug!(model = %path, shaders = refs.len(), "Read model shaders");

        requests.files.push(path.to_string());
        // Models name their shaders with an image extension; shaders are
        // looked up without it.
        requests
            .names
            .extend(refs.into_iter().map(|r| strip_image_extension(&r.name).to_string()));
        Ok(())
    }

    fn add_skin(&self, path: &str, requests: &mut ModelRequests) {
        match self.store.read_to_string(path) {
            Ok(source) => {
                let names = parse_skin(&source);
                debug!(skin = %path, shaders = names.len(), "Read skin");
                requests.files.push(path.to_string());
                requests
                    .names
                    .extend(names.iter().map(|n| strip_image_extension(n).to_string()));
            }
            Err(e) => {
                warn!(skin = %path, error = %e, "Skin not readable");
                requests.warnings.push(Warning::MissingSkin { path: path.to_string() });
            }
        }
    }

    /// Resolve the requests and assemble the file list
    fn finish<S: AsRef<str>>(
        &self,
        job: JobKind,
        name: &str,
        inputs: Vec<String>,
        requests: &[S],
    ) -> ResolveResult<Closure> {
        let corpus = ScriptCorpus::load(self.store, &self.config.scripts_dir)?;
        let mut result = corpus.resolve(requests, &self.config.default_image_extension);
        result.script.name = self.config.script_path(name);

        let mut files = FileList::default();
        for input in inputs {
            files.push_path(input);
        }
        files.push(FileRef {
            path: result.script.name.clone(),
            kind: AssetKind::ShaderScript,
        });
        for texture in &result.textures {
            files.push_path(texture.clone());
        }

        // Unresolved names are implicit images, in request order. Lookup is
        // by lowercase key; the path keeps the first spelling seen.
        let mut implicit = HashSet::new();
        for request in requests {
            let original = request.as_ref().trim();
            let key = original.to_lowercase();
            if result.unresolved.contains(&key) && implicit.insert(key) {
                files.push(FileRef {
                    path: self.implicit_image(original),
                    kind: AssetKind::Texture,
                });
            }
        }

        // Every unresolved name became an implicit image; a missing image
        // surfaces as a texture warning when packing.
        let warnings = result
            .warnings
            .into_iter()
            .filter(|w| !matches!(w, Warning::UnresolvedShader { .. }))
            .collect();

        info!(
            job = %job,
            name,
            files = files.files.len(),
            implicit = implicit.len(),
            "Closure complete"
        );

        Ok(Closure {
            job,
            name: name.to_string(),
            files: files.files,
            script: result.script,
            contributing_scripts: result.contributing_scripts,
            entities: BTreeSet::new(),
            unresolved: result.unresolved,
            warnings,
        })
    }

    fn implicit_image(&self, name: &str) -> String {
        if has_image_extension(name) {
            name.to_string()
        } else {
            format!("{name}.{}", self.config.default_image_extension)
        }
    }
}

/// Write a closure into an archive: content files first, then the script
pub fn pack_closure(
    closure: &Closure,
    store: &dyn FileStore,
    codec: &dyn ImageCodec,
    archive: &mut dyn ArchiveWriter,
) -> ResolveResult<PackReport> {
    let packer = Packer::new(store, codec);
    let content: Vec<FileRef> = closure.content_files().cloned().collect();

    let mut report = PackReport::default();
    packer.pack_into(&content, archive, &mut report)?;
    packer.add_generated(archive, &closure.script.name, closure.script.body.as_bytes(), &mut report)?;
    archive.finish()?;

    info!(
        job = %closure.job,
        name = %closure.name,
        entries = report.entries.len(),
        warnings = report.warnings.len(),
        "Packed"
    );
    Ok(report)
}
