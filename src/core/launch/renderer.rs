// ─── Renderers ───
// Graphics backends the game can be started with, and the environment
// each one needs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};

use super::native::find_in_path;

/// Renderer shipped as a plugin directory instead of in the native lib dir.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RendererPlugin {
    pub path: PathBuf,
    /// Loaded from `path`, in order, before the main graphics library.
    #[serde(default)]
    pub dlopen: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Renderer {
    pub id: String,
    pub name: String,
    /// Main graphics library, handed to LWJGL as `org.lwjgl.opengl.libname`.
    pub gl_library: String,
    #[serde(default)]
    pub egl_library: Option<String>,
    /// Loaded from the native lib dir when present.
    #[serde(default)]
    pub required_libraries: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub plugin: Option<RendererPlugin>,
}

impl Renderer {
    fn preset(id: &str, name: &str, env: &[(&str, &str)]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            gl_library: "libGL.so.1".to_string(),
            egl_library: Some("libEGL_mesa.so".to_string()),
            required_libraries: Vec::new(),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            plugin: None,
        }
    }

    pub fn is_gles(&self) -> bool {
        self.id.starts_with("opengles")
    }

    pub fn is_gl4es(&self) -> bool {
        self.id.contains("gl4es")
    }

    /// Main graphics library: inside the plugin directory for plugins,
    /// a bare name resolved through the library path otherwise.
    pub fn gl_library_path(&self) -> PathBuf {
        match &self.plugin {
            Some(plugin) => plugin.path.join(&self.gl_library),
            None => PathBuf::from(&self.gl_library),
        }
    }

    /// Whether the main graphics library can be found on this device.
    pub fn is_available(&self, search_path: &[PathBuf]) -> bool {
        match &self.plugin {
            Some(plugin) => plugin.path.join(&self.gl_library).is_file(),
            None => find_in_path(&self.gl_library, search_path).is_some(),
        }
    }

    /// Environment for a launch with this renderer.
    pub fn launch_env(&self, cache_dir: &Path, ram_mb: u32, gles_version: u32) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();

        if self.is_gles() {
            env.insert("LIBGL_ES".into(), gles_version.to_string());
            env.insert("LIBGL_GL".into(), (gles_version + 10).to_string());
        }

        env.extend(self.env.clone());
        env.insert("POJAV_RENDERER".into(), self.id.clone());

        if !self.is_gles() {
            env.insert("MESA_LOADER_DRIVER_OVERRIDE".into(), "zink".into());
            env.insert(
                "MESA_GLSL_CACHE_DIR".into(),
                cache_dir.to_string_lossy().to_string(),
            );
            env.insert("MESA_GL_VERSION_OVERRIDE".into(), "4.6".into());
            env.insert("MESA_GLSL_VERSION_OVERRIDE".into(), "460".into());
            env.insert("force_glsl_extensions_warn".into(), "true".into());
            env.insert("allow_higher_compat_version".into(), "true".into());
            env.insert(
                "allow_glsl_extension_directive_midshader".into(),
                "true".into(),
            );
        }

        if self.is_gl4es() {
            env.insert("LIBGL_MIPMAP".into(), "3".into());
            env.insert("LIBGL_NORMALIZE".into(), "1".into());
            env.insert("LIBGL_NOINTOVLHACK".into(), "1".into());
            env.insert("LIBGL_NOERROR".into(), "1".into());
            if self.id.split('_').any(|part| part == "ng") {
                env.insert("LIBGL_USE_MC_COLOR".into(), "1".into());
                env.insert("DLOPEN".into(), "libspirv-cross-c-shared.so".into());
            }
        }

        env.insert("POJAV_MAX_RAM".into(), format!("{}M", ram_mb));
        env
    }
}

/// Known renderers, built-in presets first, then registered plugins.
#[derive(Debug, Clone)]
pub struct RendererRegistry {
    renderers: Vec<Renderer>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RendererRegistry {
    pub fn empty() -> Self {
        Self {
            renderers: Vec::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut vulkan = Renderer::preset(
            "vulkan_zink",
            "Vulkan (Zink)",
            &[("GALLIUM_DRIVER", "zink")],
        );
        vulkan.gl_library = "libOSMesa.so".to_string();
        vulkan.egl_library = None;

        Self {
            renderers: vec![
                Renderer::preset("opengles2", "OpenGL ES 2.0", &[("LIBGL_ES", "2")]),
                Renderer::preset("opengles3", "OpenGL ES 3.0", &[("LIBGL_ES", "3")]),
                Renderer::preset("gl4es", "GL4ES", &[("LIBGL_GL", "21")]),
                Renderer::preset(
                    "zink",
                    "Zink (Vulkan)",
                    &[("GALLIUM_DRIVER", "zink")],
                ),
                vulkan,
            ],
        }
    }

    /// Add a renderer; an existing one with the same id is replaced.
    pub fn register(&mut self, renderer: Renderer) {
        match self.renderers.iter_mut().find(|r| r.id == renderer.id) {
            Some(existing) => *existing = renderer,
            None => self.renderers.push(renderer),
        }
    }

    pub fn all(&self) -> &[Renderer] {
        &self.renderers
    }

    pub fn compatible(&self, search_path: &[PathBuf]) -> Vec<&Renderer> {
        self.renderers
            .iter()
            .filter(|r| r.is_available(search_path))
            .collect()
    }

    /// The requested renderer when usable, else the first compatible one.
    pub fn select(&self, requested: Option<&str>, search_path: &[PathBuf]) -> LauncherResult<Renderer> {
        let compatible = self.compatible(search_path);

        if let Some(id) = requested.map(str::trim).filter(|id| !id.is_empty()) {
            if let Some(renderer) = compatible.iter().find(|r| r.id == id) {
                return Ok((*renderer).clone());
            }
            warn!("Renderer {} is not available, falling back", id);
        }

        let renderer = compatible
            .first()
            .ok_or(LauncherError::NoCompatibleRenderer)?;
        info!("Auto-selected renderer: {}", renderer.name);
        Ok((*renderer).clone())
    }
}
