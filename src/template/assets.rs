// src/template/assets.rs
use include_dir::{include_dir, Dir};
use std::collections::BTreeMap;

static TEMPLATES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Where raw template text comes from.
///
/// Names are `/`-separated. The first component is the role (`master` or
/// `node`); the rest is the output path inside that role's bundle.
pub trait TemplateSource: Send + Sync {
    /// Every template name, sorted.
    fn names(&self) -> Vec<String>;

    fn load(&self, name: &str) -> Option<&[u8]>;
}

/// Templates compiled into the binary from the `templates/` directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplates;

impl EmbeddedTemplates {
    pub fn new() -> Self {
        Self
    }
}

fn collect_names(dir: &Dir<'_>, names: &mut Vec<String>) {
    for file in dir.files() {
        names.push(asset_name(file.path()));
    }
    for sub in dir.dirs() {
        collect_names(sub, names);
    }
}

fn asset_name(path: &std::path::Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl TemplateSource for EmbeddedTemplates {
    fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_names(&TEMPLATES, &mut names);
        names.sort();
        names
    }

    fn load(&self, name: &str) -> Option<&[u8]> {
        TEMPLATES.get_file(name).map(|f| f.contents())
    }
}

/// Templates held in memory, mainly for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    templates: BTreeMap<String, Vec<u8>>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn insert(&mut self, name: &str, contents: impl Into<Vec<u8>>) {
        self.templates.insert(name.to_string(), contents.into());
    }
}

impl TemplateSource for MemoryTemplates {
    fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    fn load(&self, name: &str) -> Option<&[u8]> {
        self.templates.get(name).map(Vec::as_slice)
    }
}
