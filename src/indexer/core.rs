use super::IndexError;
use super::go_parser::{GoParser, ParsedUnit};
use super::languages::{LanguageConfig, is_std_lib};
use super::symbols::{Package, SymbolIndex};
use ignore::WalkBuilder;
use std::path::{Component, Path};
use tracing::{debug, info, warn};

/// How a source directory becomes a package ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageIdStrategy {
    /// Every path segment of the directory.
    Full,
    /// Only the last `n` segments. Short, but two deep trees can collide.
    Truncated(usize),
}

impl Default for PackageIdStrategy {
    fn default() -> Self {
        PackageIdStrategy::Truncated(3)
    }
}

impl PackageIdStrategy {
    /// `0` selects the full path.
    pub fn from_depth(depth: usize) -> Self {
        if depth == 0 {
            PackageIdStrategy::Full
        } else {
            PackageIdStrategy::Truncated(depth)
        }
    }

    pub fn package_id(&self, dir: &Path) -> String {
        let segments: Vec<String> = dir
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                _ => None,
            })
            .collect();

        if segments.is_empty() {
            return ".".to_string();
        }

        match self {
            PackageIdStrategy::Truncated(n) if segments.len() > *n => {
                segments[segments.len() - n..].join("/")
            }
            _ => segments.join("/"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub package_ids: PackageIdStrategy,
    /// Directory names pruned from the walk.
    pub skip_dirs: Vec<String>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            package_ids: PackageIdStrategy::default(),
            skip_dirs: ["vendor", "node_modules", ".git", "bin"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Builds a [`SymbolIndex`] one unit at a time; `finish` freezes it.
pub struct SymbolIndexer {
    options: IndexOptions,
    language: LanguageConfig,
    parser: GoParser,
    index: SymbolIndex,
}

/// Indexes every primary Go unit under `root`.
pub fn index<P: AsRef<Path>>(root: P, options: &IndexOptions) -> Result<SymbolIndex, IndexError> {
    let mut indexer = SymbolIndexer::new(options.clone())?;
    indexer.index_directory(root)?;
    Ok(indexer.finish())
}

impl SymbolIndexer {
    pub fn new(options: IndexOptions) -> Result<Self, IndexError> {
        Ok(Self {
            options,
            language: LanguageConfig::go(),
            parser: GoParser::new()?,
            index: SymbolIndex::default(),
        })
    }

    /// Walks `root` and indexes every primary unit. The first unreadable or
    /// malformed unit aborts the walk.
    pub fn index_directory<P: AsRef<Path>>(&mut self, root: P) -> Result<(), IndexError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(IndexError::MissingRoot(root.to_path_buf()));
        }

        let skip_dirs = self.options.skip_dirs.clone();
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !skip_dirs.iter().any(|skip| skip.as_str() == name.as_ref())
            })
            .build();

        let before = self.index.units;
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !self.language.is_primary_unit(&file_name) {
                continue;
            }

            let source = std::fs::read(path).map_err(|source| IndexError::Read {
                path: display_path(path),
                source,
            })?;
            let dir = path.parent().unwrap_or(root);
            self.add_source(dir, &display_path(path), &source)?;
        }

        let summary = self.index.summary();
        info!(
            "Indexed {} units under {}: {} packages, {} types, {} functions, {} methods",
            self.index.units - before,
            root.display(),
            summary.packages,
            summary.types,
            summary.functions,
            summary.methods
        );
        Ok(())
    }

    /// Indexes one unit that lives in `dir`. `file` is recorded as the
    /// declaring file of its symbols.
    pub fn add_source(&mut self, dir: &Path, file: &str, source: &[u8]) -> Result<(), IndexError> {
        let package_id = self.options.package_ids.package_id(dir);
        let unit = self.parser.parse_unit(source, &package_id, file)?;
        debug!(
            "Parsed {file}: package {package_id}, {} types, {} functions, {} methods",
            unit.types.len(),
            unit.functions.len(),
            unit.methods.len()
        );
        self.register(&package_id, dir, unit);
        self.index.units += 1;
        Ok(())
    }

    pub fn finish(self) -> SymbolIndex {
        self.index
    }

    fn register(&mut self, package_id: &str, dir: &Path, unit: ParsedUnit) {
        let package = self
            .index
            .packages
            .entry(package_id.to_string())
            .or_insert_with(|| Package {
                id: package_id.to_string(),
                name: unit.package_name.clone(),
                dir: dir.to_path_buf(),
                imports: Vec::new(),
            });

        for import in &unit.imports {
            if is_std_lib(&import.path) || package.imports.contains(&import.path) {
                continue;
            }
            package.imports.push(import.path.clone());
        }

        for symbol in unit.types {
            if let Some(previous) = self.index.types.insert(symbol.id(), symbol) {
                warn!("Type {}.{} declared twice; keeping the later one", previous.package, previous.name);
            }
        }
        for symbol in unit.functions {
            if let Some(previous) = self.index.functions.insert(symbol.id(), symbol) {
                warn!("Function {} declared twice; keeping the later one", previous.id());
            }
        }
        for symbol in unit.methods {
            if let Some(previous) = self.index.methods.insert(symbol.id(), symbol) {
                warn!("Method {} declared twice; keeping the later one", previous.id());
            }
        }
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
