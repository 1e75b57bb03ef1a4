//! Load configuration.

use std::path::PathBuf;

/// Environment variable that overrides [`LoadConfig::asset_root`].
pub const ASSET_ROOT_ENV: &str = "SCENE_PACK_ASSET_ROOT";

/// Settings for a single [`load_scene`](crate::resources::load_scene) call.
#[derive(Clone, Debug)]
pub struct LoadConfig {
    /// Directory that asset paths are resolved against.
    pub asset_root: PathBuf,
    /// Deepest node nesting accepted before the document is rejected.
    pub max_node_depth: usize,
    /// Share one GPU texture between materials that reference the same image.
    pub dedup_textures: bool,
    /// Prefix for GPU resource labels. Falls back to the asset file name.
    pub label: Option<String>,
}

impl LoadConfig {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            ..Default::default()
        }
    }

    /// Default configuration with the asset root taken from `SCENE_PACK_ASSET_ROOT` if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(root) = std::env::var_os(ASSET_ROOT_ENV) {
            config.asset_root = PathBuf::from(root);
        }
        config
    }

    pub fn with_max_node_depth(mut self, depth: usize) -> Self {
        self.max_node_depth = depth;
        self
    }

    pub fn with_dedup_textures(mut self, dedup: bool) -> Self {
        self.dedup_textures = dedup;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("./assets"),
            max_node_depth: 64,
            dedup_textures: true,
            label: None,
        }
    }
}
