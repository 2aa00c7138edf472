//! Preview export: textures as PNG, meshes as Wavefront OBJ.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use meridian_world::{MapPreview, MeshBuffers, PreviewOutput, TerrainSettings, Texture};

use crate::config::PreviewConfig;

/// Writes a texture as an RGBA PNG.
pub fn save_png(texture: &Texture, path: &Path) -> Result<()> {
    let image = image::RgbaImage::from_raw(
        texture.width() as u32,
        texture.height() as u32,
        texture.as_bytes().to_vec(),
    )
    .context("texture buffer does not match its dimensions")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Renders a mesh as Wavefront OBJ text, scaling X and Z by `world_scale`.
#[must_use]
pub fn mesh_to_obj(mesh: &MeshBuffers, world_scale: f32) -> String {
    let mut obj = String::with_capacity(mesh.vertex_count() * 64);
    // Writing into a String cannot fail.
    let _ = writeln!(obj, "# meridian terrain preview");
    for v in &mesh.vertices {
        let _ = writeln!(obj, "v {} {} {}", v.x * world_scale, v.y, v.z * world_scale);
    }
    for uv in &mesh.uvs {
        let _ = writeln!(obj, "vt {} {}", uv.x, uv.y);
    }
    for n in &mesh.normals {
        let _ = writeln!(obj, "vn {} {} {}", n.x, n.y, n.z);
    }
    for [a, b, c] in &mesh.triangles {
        let (a, b, c) = (a + 1, b + 1, c + 1);
        let _ = writeln!(obj, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}");
    }
    obj
}

/// Renders every configured preview mode into `config.output_dir`.
///
/// Returns the written file paths.
pub fn export_previews(settings: &TerrainSettings, config: &PreviewConfig) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;

    let preview = MapPreview::new(settings.clone(), config.ramp.clone());
    let mut written = Vec::with_capacity(config.modes.len());
    for &mode in &config.modes {
        let output = preview
            .render(mode, config.lod)
            .with_context(|| format!("failed to render {} preview", mode.name()))?;
        let path = match output {
            PreviewOutput::Texture(texture) => {
                let path = config.output_dir.join(format!("{}.png", mode.name()));
                save_png(&texture, &path)?;
                path
            },
            PreviewOutput::Mesh { mesh, world_scale } => {
                let path = config.output_dir.join(format!("{}_lod{}.obj", mode.name(), config.lod));
                fs::write(&path, mesh_to_obj(&mesh, world_scale))
                    .with_context(|| format!("failed to write {}", path.display()))?;
                path
            },
        };
        info!("Exported {} preview to {}", mode.name(), path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};
    use meridian_world::{ColorRamp, PreviewMode};
    use tempfile::TempDir;

    #[test]
    fn test_png_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("gray.png");
        let texture = Texture::from_grayscale(2, 2, [0.0, 0.25, 0.5, 1.0]);
        save_png(&texture, &path).expect("save");

        let loaded = image::open(&path).expect("open").to_rgba8();
        assert_eq!(loaded.dimensions(), (2, 2));
        assert_eq!(loaded.into_raw(), texture.into_bytes());
    }

    #[test]
    fn test_obj_uses_one_based_indices() {
        let mesh = MeshBuffers {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Z],
            normals: vec![Vec3::Y; 3],
            uvs: vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            triangles: vec![[0, 1, 2]],
            vertices_per_line: 0,
        };
        let obj = mesh_to_obj(&mesh, 2.0);
        assert!(obj.contains("v 2 0 0"));
        assert!(obj.contains("f 1/1/1 2/2/2 3/3/3"));
        assert_eq!(obj.lines().filter(|l| l.starts_with("vn ")).count(), 3);
    }

    #[test]
    fn test_export_writes_each_mode() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut settings = TerrainSettings::default();
        settings.mesh.chunk_size_index = 0;
        let config = PreviewConfig {
            enabled: true,
            output_dir: temp_dir.path().join("out"),
            modes: vec![PreviewMode::ColorMap, PreviewMode::Mesh],
            lod: 2,
            ramp: ColorRamp::default(),
        };
        let written = export_previews(&settings, &config).expect("export");
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("color_map.png"));
        assert!(written[1].ends_with("mesh_lod2.obj"));
        assert!(written.iter().all(|p| p.exists()));
    }
}
