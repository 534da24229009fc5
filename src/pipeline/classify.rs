//! Step 2: walk the source tree, classify files and resolve script imports.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use super::{BuildError, BuildStep};
use crate::config::ProjectConfig;
use crate::core::SourceKind;
use crate::debug;
use crate::resolve::{
    Import, ImportResolver, ImportTarget, ModuleGraph, ModuleNode, ResolveError, Resolved,
    scan_imports,
};
use crate::transform::{StepName, TransformError};

const IGNORED_DIRS: &[&str] = &["node_modules"];

/// Build the module graph for one build.
///
/// Files reached through imports but outside the walked tree (aliases
/// pointing elsewhere) are classified and added as they are found.
pub fn classify(config: &ProjectConfig) -> Result<ModuleGraph, BuildError> {
    let mut graph = ModuleGraph::new(&config.root, &config.build.entries);

    for path in collect_source_files(&config.build.source) {
        match SourceKind::from_path(&path) {
            Some(kind) => graph.insert(ModuleNode::new(path, kind)),
            None => debug!("classify"; "skipping {}", config.root_relative(&path).display()),
        }
    }

    for (name, entry) in config.build.entries.iter() {
        if graph.get(entry).map(|n| n.kind) != Some(SourceKind::Script) {
            return Err(BuildError::io(
                BuildStep::Classify,
                entry,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("entry `{name}` is not a script in the source tree"),
                ),
            ));
        }
    }

    let resolver = ImportResolver::from_config(&config.resolve);
    let mut queue: VecDeque<PathBuf> = graph
        .of_kind(SourceKind::Script)
        .map(|n| n.path.clone())
        .collect();

    while let Some(path) = queue.pop_front() {
        let source = fs::read_to_string(&path)
            .map_err(|e| BuildError::io(BuildStep::Classify, &path, e))?;

        let statements = scan_imports(&path, &source)
            .map_err(|e| TransformError::new(&path, StepName::CompileScript, e))?;
        let mut imports = Vec::with_capacity(statements.len());
        for statement in statements {
            let target = resolve_target(&resolver, &path, &statement.specifier, &mut graph, &mut queue)?;
            imports.push(Import { statement, target });
        }

        if let Some(node) = graph.get_mut(&path) {
            node.source = Some(source);
            node.imports = imports;
        }
    }

    debug!("classify"; "{} units", graph.len());
    Ok(graph)
}

fn resolve_target(
    resolver: &ImportResolver,
    importer: &Path,
    specifier: &str,
    graph: &mut ModuleGraph,
    queue: &mut VecDeque<PathBuf>,
) -> Result<ImportTarget, BuildError> {
    let resolved = match resolver.resolve(importer, specifier) {
        Ok(resolved) => resolved,
        Err(ResolveError::UnknownAlias(source)) => {
            return Err(BuildError::UnknownAlias {
                file: importer.to_path_buf(),
                specifier: specifier.to_string(),
                source,
            });
        }
        Err(e @ ResolveError::NotFound { .. }) => {
            return Err(TransformError::new(importer, StepName::ResolveImports, e).into());
        }
    };

    let path = match resolved {
        Resolved::External => return Ok(ImportTarget::External),
        Resolved::Local(path) => path,
    };

    if graph.contains(&path) {
        return Ok(ImportTarget::Local(path));
    }
    if has_extension(&path, "json") {
        return Ok(ImportTarget::Json(path));
    }

    match SourceKind::from_path(&path) {
        Some(kind) => {
            debug!("classify"; "adding {} (imported from {})", path.display(), importer.display());
            graph.insert(ModuleNode::new(path.clone(), kind));
            if kind == SourceKind::Script {
                queue.push_back(path.clone());
            }
            Ok(ImportTarget::Local(path))
        }
        None => Err(TransformError::new(
            importer,
            StepName::ResolveImports,
            format!(
                "`{specifier}` resolves to `{}`, which is not a script, style, image, font or JSON file",
                path.display()
            ),
        )
        .into()),
    }
}

/// Every file under `dir`, sorted, skipping dependency directories.
fn collect_source_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .sort(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|path| {
            !path
                .strip_prefix(dir)
                .unwrap_or(path)
                .components()
                .any(|c| IGNORED_DIRS.iter().any(|d| c.as_os_str() == *d))
        })
        .collect();
    files.sort();
    files
}

#[inline]
fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config_at;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_classify_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/index.js", "import App from './App';\nimport './index.css';\nimport data from './data.json';\nimport React from 'react';\n");
        write(root, "src/App.jsx", "import Button from '@components/Button';\nexport default () => null;\n");
        write(root, "src/components/Button.jsx", "export default () => null;\n");
        write(root, "src/index.css", "body {}");
        write(root, "src/data.json", "{}");
        write(root, "src/logo.svg", "<svg/>");
        write(root, "src/node_modules/pkg/index.js", "");

        let config = test_config_at(root);
        let graph = classify(&config).unwrap();
        let root = &config.root;

        assert_eq!(graph.len(), 4);
        assert!(!graph.contains(&root.join("src/logo.svg")));
        assert!(!graph.contains(&root.join("src/node_modules/pkg/index.js")));

        let entry = graph.get(&root.join("src/index.js")).unwrap();
        let targets: Vec<_> = entry.imports.iter().map(|i| i.target.clone()).collect();
        assert_eq!(
            targets,
            [
                ImportTarget::Local(root.join("src/App.jsx")),
                ImportTarget::Local(root.join("src/index.css")),
                ImportTarget::Json(root.join("src/data.json")),
                ImportTarget::External,
            ]
        );

        let app = graph.get(&root.join("src/App.jsx")).unwrap();
        assert_eq!(
            app.imports[0].target,
            ImportTarget::Local(root.join("src/components/Button.jsx"))
        );
    }

    #[test]
    fn test_unknown_alias_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "import x from '@utils/x';\n");

        let err = classify(&test_config_at(dir.path())).unwrap_err();
        match err {
            BuildError::UnknownAlias { specifier, source, .. } => {
                assert_eq!(specifier, "@utils/x");
                assert_eq!(source.alias, "@utils");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_import_is_transform_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "import x from './nope';\n");

        let err = classify(&test_config_at(dir.path())).unwrap_err();
        match err {
            BuildError::Transform(e) => assert_eq!(e.step, StepName::ResolveImports),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_commented_out_import_is_not_resolved() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "/*\nimport Old from './Old';\n*/\nconsole.log(1);\n");

        let config = test_config_at(dir.path());
        let graph = classify(&config).unwrap();
        let entry = graph.get(&config.root.join("src/index.js")).unwrap();
        assert!(entry.imports.is_empty());
    }

    #[test]
    fn test_syntax_error_names_compile_step() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "import App from './App';
");
        write(dir.path(), "src/App.jsx", "export default function App( {\n");

        let config = test_config_at(dir.path());
        match classify(&config).unwrap_err() {
            BuildError::Transform(e) => {
                assert_eq!(e.step, StepName::CompileScript);
                assert_eq!(e.file, config.root.join("src/App.jsx"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unclassified_import_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "import icon from './icon.svg';\n");
        write(dir.path(), "src/icon.svg", "<svg/>");

        let err = classify(&test_config_at(dir.path())).unwrap_err();
        assert!(err.to_string().contains("not a script, style, image, font or JSON file"));
    }

    #[test]
    fn test_imports_outside_source_are_added() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", "import '../shared/theme.css';\nimport u from '../shared/util';\n");
        write(dir.path(), "shared/theme.css", "a {}");
        write(dir.path(), "shared/util.js", "import './more.css';\nexport default 1;\n");
        write(dir.path(), "shared/more.css", "b {}");

        let config = test_config_at(dir.path());
        let graph = classify(&config).unwrap();
        assert!(graph.contains(&config.root.join("shared/theme.css")));
        assert!(graph.contains(&config.root.join("shared/more.css")));
        assert_eq!(graph.count(SourceKind::Script), 2);
    }
}
