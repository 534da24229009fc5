//! Steps 4 and 6: naming, the buffered artifact set and the entry document.
//!
//! Nothing here touches the output directory until [`commit`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::{BuildError, BuildStep, clean::empty_dir};
use crate::config::ProjectConfig;
use crate::core::{BuildMode, SourceKind};
use crate::debug;
use crate::embed::build::{INDEX_HTML, ShellVars};
use crate::output::{
    ArtifactRole, ArtifactSet, Category, ContentHash, DocumentPlan, ENTRY_DOCUMENT, OutputArtifact,
    entry, namer,
};
use crate::resolve::ModuleGraph;
use crate::transform::{Emission, Link, Unit};

/// Names transformed units and collects their bytes.
pub struct Emitter<'a> {
    config: &'a ProjectConfig,
    mode: BuildMode,
    graph: &'a ModuleGraph,
    entry_styles: BTreeSet<&'a Path>,
    set: ArtifactSet,
    /// Public URL of every emitted script, injector and stylesheet.
    urls: BTreeMap<PathBuf, String>,
}

impl<'a> Emitter<'a> {
    pub fn new(config: &'a ProjectConfig, mode: BuildMode, graph: &'a ModuleGraph) -> Self {
        Self {
            config,
            mode,
            graph,
            entry_styles: graph.entry_styles(),
            set: ArtifactSet::new(),
            urls: BTreeMap::new(),
        }
    }

    /// Name one unit, buffer its bytes and return how importers refer to it.
    pub fn emit(&mut self, unit: Unit) -> Result<Link, BuildError> {
        let Unit {
            source,
            kind,
            bytes,
            class_map,
            emission,
        } = unit;
        let logical = self.graph.logical_name(&source);
        let hash = ContentHash::of(&bytes);

        match emission {
            Emission::Inline(url) => Ok(Link::Asset { url }),
            Emission::File => {
                let ext = extension(&source);
                let (category, role) = match kind {
                    SourceKind::Font => (Category::Font { ext: &ext }, ArtifactRole::Font),
                    _ => (Category::Image { ext: &ext }, ArtifactRole::Image),
                };
                let url = self.insert(&logical, hash, category, role, source, None, bytes)?;
                Ok(Link::Asset { url })
            }
            Emission::Stylesheet => {
                let category = Category::Stylesheet {
                    entry: self.entry_styles.contains(source.as_path()),
                };
                let role = ArtifactRole::Stylesheet;
                if namer::name(&logical, &hash, self.mode, category).is_some() {
                    let url = self.insert(&logical, hash, category, role, source.clone(), None, bytes)?;
                    self.urls.insert(source, url);
                }
                Ok(Link::Stylesheet { class_map })
            }
            Emission::Script | Emission::StyleInjector => {
                let role = if emission == Emission::Script {
                    ArtifactRole::Script
                } else {
                    ArtifactRole::StyleInjector
                };
                let id = self.graph.module_id(&source);
                let url = self.insert(
                    &logical,
                    hash,
                    Category::Script,
                    role,
                    source.clone(),
                    Some(id.clone()),
                    bytes,
                )?;
                self.set.register_module(id.clone(), url.clone());
                self.urls.insert(source, url);
                Ok(Link::Module { id })
            }
            Emission::Pending => unreachable!("run_chain rejects units without an emission"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn insert(
        &mut self,
        logical: &str,
        hash: ContentHash,
        category: Category<'_>,
        role: ArtifactRole,
        source_path: PathBuf,
        module_id: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<String, BuildError> {
        let output_path = namer::name(logical, &hash, self.mode, category).ok_or_else(|| {
            BuildError::io(
                BuildStep::Emit,
                &source_path,
                std::io::Error::other(format!("no output name for {role:?} in {}", self.mode)),
            )
        })?;
        let url = format!("{}{}", self.config.build.public_path, output_path);
        debug!("emit"; "{} -> {}", self.config.root_relative(&source_path).display(), output_path);

        self.set.insert(
            OutputArtifact {
                source_path,
                output_path,
                content_hash: hash,
                role,
                module_id,
            },
            bytes,
        )?;
        Ok(url)
    }

    /// Template the entry document and return the complete set.
    pub fn finish(mut self) -> Result<ArtifactSet, BuildError> {
        let plan = self.plan();
        let template = self.load_template()?;
        let document = entry::render(&template, &plan);

        let hash = ContentHash::of(&document);
        self.set.set_signature(self.signature(&plan));
        self.set.insert(
            OutputArtifact {
                source_path: self.config.build.template.clone(),
                output_path: ENTRY_DOCUMENT.to_string(),
                content_hash: hash,
                role: ArtifactRole::Document,
                module_id: None,
            },
            document,
        )?;
        Ok(self.set)
    }

    /// Stylesheets, preloads and entries in dependency order.
    fn plan(&self) -> DocumentPlan {
        let mut plan = DocumentPlan {
            import_map: self.set.modules().clone(),
            ..DocumentPlan::default()
        };
        for (specifier, url) in &self.config.resolve.externals {
            plan.import_map.insert(specifier.clone(), url.clone());
        }

        for path in self.graph.dependency_order() {
            let (Some(node), Some(url)) = (self.graph.get(path), self.urls.get(path)) else {
                continue;
            };
            match node.kind {
                SourceKind::Style | SourceKind::CssModule if self.mode.policy().extract_styles => {
                    plan.stylesheets.push(url.clone());
                }
                SourceKind::Script if self.graph.entry_name(path).is_none() => {
                    plan.preloads.push(url.clone());
                }
                _ => {}
            }
        }
        for (_, path) in self.graph.entries() {
            if let Some(url) = self.urls.get(path) {
                plan.entries.push(url.clone());
            }
        }
        plan
    }

    /// Document structure by module id, without any hash.
    fn signature(&self, plan: &DocumentPlan) -> Vec<String> {
        let ids: BTreeMap<&str, &str> = self
            .set
            .modules()
            .iter()
            .map(|(id, url)| (url.as_str(), id.as_str()))
            .collect();
        let by_url = |url: &String| -> String {
            ids.get(url.as_str()).map_or_else(|| url.clone(), |id| (*id).to_string())
        };
        let stylesheet_ids: BTreeMap<&String, String> = self
            .urls
            .iter()
            .map(|(path, url)| (url, self.graph.module_id(path)))
            .collect();

        let mut signature = Vec::new();
        for url in &plan.stylesheets {
            let id = stylesheet_ids.get(url).cloned().unwrap_or_else(|| url.clone());
            signature.push(format!("stylesheet {id}"));
        }
        signature.extend(plan.preloads.iter().map(|u| format!("preload {}", by_url(u))));
        signature.extend(plan.entries.iter().map(|u| format!("entry {}", by_url(u))));
        signature.extend(self.set.modules().keys().map(|id| format!("module {id}")));
        signature.extend(
            self.config
                .resolve
                .externals
                .iter()
                .map(|(spec, url)| format!("external {spec}={url}")),
        );
        signature
    }

    /// Project template, or the built-in shell titled after the project.
    fn load_template(&self) -> Result<String, BuildError> {
        let path = &self.config.build.template;
        if path.is_file() {
            return fs::read_to_string(path)
                .map_err(|e| BuildError::io(BuildStep::EntryDocument, path, e));
        }
        let title = self
            .config
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_string());
        Ok(INDEX_HTML.render(&ShellVars { title: &title }))
    }
}

/// Lowercased extension of a source file.
fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Write every artifact under `output`, which [`super::clean`] emptied.
///
/// A failed write empties `output` again so no partial set is left behind.
pub fn commit(output: &Path, set: &ArtifactSet) -> Result<(), BuildError> {
    let write_all = || -> Result<(), (PathBuf, std::io::Error)> {
        for artifact in set.iter() {
            let path = output.join(&artifact.meta.output_path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| (parent.to_path_buf(), e))?;
            }
            fs::write(&path, &artifact.bytes).map_err(|e| (path.clone(), e))?;
        }
        Ok(())
    };

    write_all().map_err(|(path, source)| {
        if let Err(e) = empty_dir(output) {
            debug!("commit"; "cannot empty {} after failed write: {e}", output.display());
        }
        BuildError::Io {
            step: BuildStep::Commit,
            path,
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config_at;
    use crate::resolve::ModuleNode;

    fn unit(path: &Path, kind: SourceKind, bytes: &[u8], emission: Emission) -> Unit {
        let mut unit = Unit::new(path.to_path_buf(), kind, bytes.to_vec());
        unit.emission = emission;
        unit
    }

    fn fixture(root: &Path) -> (ProjectConfig, ModuleGraph) {
        let config = test_config_at(root);
        let mut graph = ModuleGraph::new(&config.root, &config.build.entries);
        for (rel, kind) in [
            ("src/index.js", SourceKind::Script),
            ("src/App.jsx", SourceKind::Script),
            ("src/index.css", SourceKind::Style),
            ("src/logo.png", SourceKind::Image),
        ] {
            graph.insert(ModuleNode::new(config.root.join(rel), kind));
        }
        (config, graph)
    }

    #[test]
    fn test_emit_links() {
        let dir = tempfile::tempdir().unwrap();
        let (config, graph) = fixture(dir.path());
        let root = config.root.clone();
        let mut emitter = Emitter::new(&config, BuildMode::Production, &graph);

        let logo = emitter
            .emit(unit(&root.join("src/logo.png"), SourceKind::Image, b"png", Emission::File))
            .unwrap();
        let hash = ContentHash::of(b"png").short();
        assert_eq!(logo, Link::Asset { url: format!("/assets/images/logo.{hash}.png") });

        let app = emitter
            .emit(unit(&root.join("src/App.jsx"), SourceKind::Script, b"x", Emission::Script))
            .unwrap();
        assert_eq!(app, Link::Module { id: "/@module/src/App.jsx".into() });

        let inline = emitter
            .emit(unit(
                &root.join("src/logo.png"),
                SourceKind::Image,
                b"png",
                Emission::Inline("data:image/png;base64,cG5n".into()),
            ))
            .unwrap();
        assert_eq!(inline, Link::Asset { url: "data:image/png;base64,cG5n".into() });

        let set = emitter.finish().unwrap();
        assert_eq!(set.count(ArtifactRole::Image), 1);
        assert_eq!(set.count(ArtifactRole::Document), 1);
        assert!(set.modules().contains_key("/@module/src/App.jsx"));
    }

    #[test]
    fn test_dev_stylesheet_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let (config, graph) = fixture(dir.path());
        let mut emitter = Emitter::new(&config, BuildMode::Development, &graph);

        let link = emitter
            .emit(unit(
                &config.root.join("src/index.css"),
                SourceKind::Style,
                b"body{}",
                Emission::Stylesheet,
            ))
            .unwrap();
        assert_eq!(link, Link::Stylesheet { class_map: None });
        assert_eq!(emitter.finish().unwrap().count(ArtifactRole::Stylesheet), 0);
    }

    #[test]
    fn test_commit_failure_empties_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("dist");
        fs::create_dir_all(&output).unwrap();
        // a file where a directory is needed makes the second write fail
        fs::write(output.join("assets"), b"").unwrap();

        let mut set = ArtifactSet::new();
        for (path, role) in [("a.html", ArtifactRole::Document), ("assets/js/x.js", ArtifactRole::Script)] {
            set.insert(
                OutputArtifact {
                    source_path: PathBuf::from(path),
                    output_path: path.to_string(),
                    content_hash: ContentHash::of(b"x"),
                    role,
                    module_id: None,
                },
                b"x".to_vec(),
            )
            .unwrap();
        }

        let err = commit(&output, &set).unwrap_err();
        assert!(matches!(err, BuildError::Io { step: BuildStep::Commit, .. }));
        assert_eq!(fs::read_dir(&output).unwrap().count(), 0);
    }
}
