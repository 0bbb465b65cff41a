use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use crate::ir::ClassDecl;

/// Black-box lookup for classes missing from a pool's primary set.
///
/// A pool consults its source at most once per name; hits, misses, and
/// failures are all cached in the shared class set afterwards.
pub trait ClasspathSource {
    /// Decoded class for `name`, or `None` when the environment has none.
    /// Errors come from the external decoder and make the pool fall back to
    /// a placeholder.
    fn load(&mut self, name: &str) -> Result<Option<ClassDecl>>;
}

/// Source that never finds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyClasspath;

impl ClasspathSource for EmptyClasspath {
    fn load(&mut self, _name: &str) -> Result<Option<ClassDecl>> {
        Ok(None)
    }
}

/// In-memory source backed by a name → declaration map.
#[derive(Debug, Default)]
pub struct MemoryClasspath {
    classes: FxHashMap<String, ClassDecl>,
}

impl MemoryClasspath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `decl` under its own name for later lookup.
    pub fn insert(&mut self, decl: ClassDecl) {
        self.classes.insert(decl.name.clone(), decl);
    }
}

impl ClasspathSource for MemoryClasspath {
    fn load(&mut self, name: &str) -> Result<Option<ClassDecl>> {
        Ok(self.classes.get(name).cloned())
    }
}

/// Source rooted at a directory of `.class` files, decoded by a
/// caller-supplied class-file reader.
pub struct DirectoryClasspath {
    root: PathBuf,
    decoder: Box<dyn FnMut(&[u8]) -> Result<ClassDecl>>,
}

impl DirectoryClasspath {
    pub fn new(
        root: impl Into<PathBuf>,
        decoder: impl FnMut(&[u8]) -> Result<ClassDecl> + 'static,
    ) -> Self {
        DirectoryClasspath {
            root: root.into(),
            decoder: Box::new(decoder),
        }
    }
}

impl ClasspathSource for DirectoryClasspath {
    fn load(&mut self, name: &str) -> Result<Option<ClassDecl>> {
        let path = self.root.join(format!("{}.class", name));
        if !path.is_file() {
            return Ok(None);
        }

        let data = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let decl = (self.decoder)(&data)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        Ok(Some(decl))
    }
}
