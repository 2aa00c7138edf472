//! Map preview: debug textures and single-tile meshes for inspecting settings.

use std::sync::Arc;

use glam::{DVec2, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use meridian_common::{ChunkCoord, TerrainResult};

use crate::falloff::falloff_mask;
use crate::height::{self, HeightFieldSample};
use crate::lod::NUM_SUPPORTED_LODS;
use crate::mesh::{self, MeshBuffers};
use crate::settings::TerrainSettings;
use crate::sinks::RenderSink;

/// What the preview shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewMode {
    /// Grayscale height map
    NoiseMap,
    /// Tile mesh at the preview LOD
    Mesh,
    /// Grayscale falloff mask
    FalloffMap,
    /// Vertex normals encoded as RGB
    NormalMap,
    /// Height bands coloured by a [`ColorRamp`]
    ColorMap,
}

impl PreviewMode {
    /// Every preview mode.
    pub const ALL: [Self; 5] = [
        Self::NoiseMap,
        Self::Mesh,
        Self::FalloffMap,
        Self::NormalMap,
        Self::ColorMap,
    ];

    /// Short lowercase name, used for file names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoiseMap => "noise_map",
            Self::Mesh => "mesh",
            Self::FalloffMap => "falloff_map",
            Self::NormalMap => "normal_map",
            Self::ColorMap => "color_map",
        }
    }
}

/// RGBA8 image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Texture {
    /// Creates a transparent black texture.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }

    /// Builds a grayscale texture; values are clamped to `[0, 1]`.
    #[must_use]
    pub fn from_grayscale(
        width: usize,
        height: usize,
        values: impl IntoIterator<Item = f32>,
    ) -> Self {
        let mut texture = Self::new(width, height);
        for (i, value) in values.into_iter().take(width * height).enumerate() {
            let level = unit_to_byte(value);
            texture.put(i, [level, level, level, u8::MAX]);
        }
        texture
    }

    /// Returns the width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Returns the raw RGBA bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Consumes the texture, returning its RGBA bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// Returns the pixel at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }

    /// Sets the pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        self.put(y * self.width + x, rgba);
    }

    fn put(&mut self, index: usize, rgba: [u8; 4]) {
        self.pixels[index * 4..index * 4 + 4].copy_from_slice(&rgba);
    }
}

fn unit_to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// A base colour that applies from `start_height` upwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorBand {
    /// Linear RGB in `[0, 1]`
    pub color: [f32; 3],
    /// Normalized height where this band begins
    pub start_height: f32,
}

/// Height-banded colour lookup for the colour map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorRamp(Vec<ColorBand>);

impl Default for ColorRamp {
    fn default() -> Self {
        Self(vec![
            ColorBand {
                color: [0.0, 0.0, 0.8],
                start_height: 0.3,
            },
            ColorBand {
                color: [0.1, 0.6, 0.1],
                start_height: 0.55,
            },
            ColorBand {
                color: [0.55, 0.4, 0.25],
                start_height: 0.7,
            },
            ColorBand {
                color: [1.0, 1.0, 1.0],
                start_height: 0.9,
            },
        ])
    }
}

impl ColorRamp {
    /// Creates a ramp, sorting bands by start height.
    #[must_use]
    pub fn new(mut bands: Vec<ColorBand>) -> Self {
        bands.sort_by(|a, b| a.start_height.total_cmp(&b.start_height));
        Self(bands)
    }

    /// Returns the bands in ascending order.
    #[must_use]
    pub fn bands(&self) -> &[ColorBand] {
        &self.0
    }

    /// Colour of the highest band starting at or below `t`; heights below the
    /// first band use the first colour.
    #[must_use]
    pub fn color_at(&self, t: f32) -> [f32; 3] {
        let above = self.0.partition_point(|band| band.start_height <= t);
        self.0
            .get(above.saturating_sub(1))
            .map_or([0.0; 3], |band| band.color)
    }
}

/// Output of a preview render.
#[derive(Debug, Clone)]
pub enum PreviewOutput {
    /// A debug texture
    Texture(Texture),
    /// A tile mesh with its world scale
    Mesh {
        /// Mesh buffers
        mesh: Arc<MeshBuffers>,
        /// Uniform horizontal scale
        world_scale: f32,
    },
}

/// Renders previews of a single tile at the origin.
#[derive(Debug, Clone)]
pub struct MapPreview {
    settings: TerrainSettings,
    ramp: ColorRamp,
}

impl MapPreview {
    /// Creates a new preview for the given settings.
    #[must_use]
    pub fn new(settings: TerrainSettings, ramp: ColorRamp) -> Self {
        Self { settings, ramp }
    }

    /// Returns the settings being previewed.
    #[must_use]
    pub const fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /// Generates the preview tile's bordered height field.
    ///
    /// # Errors
    /// Returns an error if the falloff mask does not fit the field.
    pub fn height_field(&self) -> TerrainResult<HeightFieldSample> {
        let size = self.settings.mesh.mesh_size();
        height::generate(size, size, &self.settings.height, DVec2::ZERO)
    }

    /// Renders `mode` at `lod`, clamped to the supported range.
    ///
    /// # Errors
    /// Returns an error if height generation fails.
    pub fn render(&self, mode: PreviewMode, lod: u32) -> TerrainResult<PreviewOutput> {
        let lod = lod.min(NUM_SUPPORTED_LODS - 1);
        debug!("Rendering {} preview at LOD {lod}", mode.name());
        let output = match mode {
            PreviewMode::NoiseMap => PreviewOutput::Texture(height_texture(&self.height_field()?)),
            PreviewMode::FalloffMap => {
                let mask = falloff_mask(self.settings.mesh.bordered_size());
                PreviewOutput::Texture(Texture::from_grayscale(
                    mask.size(),
                    mask.size(),
                    mask.values().iter().copied(),
                ))
            },
            PreviewMode::Mesh => PreviewOutput::Mesh {
                mesh: Arc::new(mesh::build(
                    &self.height_field()?,
                    lod,
                    self.settings.mesh.flat_shading,
                )),
                world_scale: self.settings.mesh.mesh_scale,
            },
            PreviewMode::NormalMap => {
                let mesh = mesh::build(&self.height_field()?, lod, false);
                PreviewOutput::Texture(normal_texture(&mesh))
            },
            PreviewMode::ColorMap => {
                PreviewOutput::Texture(color_texture(&self.height_field()?, &self.ramp))
            },
        };
        Ok(output)
    }

    /// Renders `mode` and hands the result to `sink`.
    ///
    /// # Errors
    /// Returns an error if height generation fails.
    pub fn draw(
        &self,
        mode: PreviewMode,
        lod: u32,
        sink: &mut dyn RenderSink,
    ) -> TerrainResult<()> {
        match self.render(mode, lod)? {
            PreviewOutput::Texture(texture) => sink.draw_texture(&texture),
            PreviewOutput::Mesh { mesh, world_scale } => {
                sink.draw_mesh(ChunkCoord::new(0, 0), &mesh, world_scale, Vec2::ZERO);
            },
        }
        Ok(())
    }
}

/// Grayscale height texture; each value is divided by the field's height range.
#[must_use]
pub fn height_texture(field: &HeightFieldSample) -> Texture {
    let range = field.max_height() - field.min_height();
    let scale = if range > 0.0 { range.recip() } else { 0.0 };
    Texture::from_grayscale(
        field.width(),
        field.height(),
        field.values().iter().map(|h| h * scale),
    )
}

/// Normal map over the mesh's vertex grid, each component mapped to `(n + 1) / 2`.
///
/// Flat-shaded meshes have no vertex grid and yield an empty texture.
#[must_use]
pub fn normal_texture(mesh: &MeshBuffers) -> Texture {
    let line = mesh.vertices_per_line;
    let mut texture = Texture::new(line, line);
    for (i, normal) in mesh.normals.iter().take(line * line).enumerate() {
        let encoded = (*normal + Vec3::ONE) * 0.5;
        texture.put(
            i,
            [
                unit_to_byte(encoded.x),
                unit_to_byte(encoded.y),
                unit_to_byte(encoded.z),
                u8::MAX,
            ],
        );
    }
    texture
}

/// Colour map of normalized heights.
#[must_use]
pub fn color_texture(field: &HeightFieldSample, ramp: &ColorRamp) -> Texture {
    let (min, max) = (field.min_height(), field.max_height());
    let range = max - min;
    let mut texture = Texture::new(field.width(), field.height());
    for (i, &h) in field.values().iter().enumerate() {
        let t = if range > 0.0 { (h - min) / range } else { 0.0 };
        let [r, g, b] = ramp.color_at(t);
        texture.put(i, [unit_to_byte(r), unit_to_byte(g), unit_to_byte(b), u8::MAX]);
    }
    texture
}
