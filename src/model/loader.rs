//! Model payloads and the loaders that produce them.
//!
//! A loader turns a path into a [`ModelData`]: a small node tree with mesh
//! bounds and any animation clips. Loading is asynchronous so hosts can plug in
//! loaders that wait on I/O; the built-in loaders finish immediately.
//!
//! # Supported Formats
//!
//! | Format | Extension | Loader |
//! |--------|-----------|--------|
//! | STL    | `.stl`    | [`StlLoader`], binary and ASCII, single mesh |
//! | any    | any       | [`MemoryLoader`], payloads registered in advance |

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use glam::Vec3;

use super::animation::Clip;
use crate::error::LoadError;
use crate::graph::{Aabb, Transform};

/// A boxed, non-`Send` future. Everything in this crate runs on one thread.
pub type BoxFuture<'a, T> = futures::future::LocalBoxFuture<'a, T>;

/// One node of a loaded model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    /// Local-space bounds of the mesh at this node, if it has one.
    pub mesh: Option<Aabb>,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn mesh(mut self, bounds: Aabb) -> Self {
        self.mesh = Some(bounds);
        self
    }

    pub fn child(mut self, child: ModelNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Everything a loader hands back: the node tree and its clips.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelData {
    pub root: ModelNode,
    /// Animation clips in file order.
    pub clips: Vec<Clip>,
}

impl ModelData {
    pub fn new(root: ModelNode) -> Self {
        Self {
            root,
            clips: Vec::new(),
        }
    }

    pub fn with_clip(mut self, clip: Clip) -> Self {
        self.clips.push(clip);
        self
    }
}

/// Source of model payloads.
pub trait AssetLoader {
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<ModelData, LoadError>>;
}

/// Loads `.stl` files from disk as a root node with one mesh child.
#[derive(Clone, Copy, Debug, Default)]
pub struct StlLoader;

impl StlLoader {
    /// Parse STL data already in memory. `name` becomes the root node name.
    pub fn parse_bytes(name: &str, bytes: &[u8]) -> Result<ModelData, LoadError> {
        let mut cursor = std::io::Cursor::new(bytes);
        Self::parse_stl(name, &mut cursor)
    }

    fn load_file(path: &Path) -> Result<ModelData, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        if ext != "stl" {
            return Err(LoadError::UnknownFormat(ext));
        }

        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model");
        Self::parse_bytes(name, &bytes)
    }

    fn parse_stl<R: Read + Seek>(name: &str, reader: &mut R) -> Result<ModelData, LoadError> {
        let stl = stl_io::read_stl(reader)
            .map_err(|e| LoadError::Parse(format!("STL parse error: {}", e)))?;

        let bounds = Aabb::from_points(stl.vertices.iter().map(|v| {
            let position: [f32; 3] = (*v).into();
            Vec3::from(position)
        }));

        let mut mesh = ModelNode::new("mesh");
        if !bounds.is_empty() {
            mesh = mesh.mesh(bounds);
        }
        Ok(ModelData::new(ModelNode::new(name).child(mesh)))
    }
}

impl AssetLoader for StlLoader {
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<ModelData, LoadError>> {
        Box::pin(async move { Self::load_file(path) })
    }
}

/// Serves payloads registered up front, keyed by path.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    payloads: HashMap<PathBuf, ModelData>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, data: ModelData) {
        self.payloads.insert(path.into(), data);
    }

    pub fn with(mut self, path: impl Into<PathBuf>, data: ModelData) -> Self {
        self.insert(path, data);
        self
    }
}

impl AssetLoader for MemoryLoader {
    fn load<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<ModelData, LoadError>> {
        Box::pin(async move {
            self.payloads
                .get(path)
                .cloned()
                .ok_or_else(|| LoadError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such payload"),
                })
        })
    }
}
