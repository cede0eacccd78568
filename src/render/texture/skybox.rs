//! Cube-map background sampled by rays that escape the scene

use std::path::{Path, PathBuf};

use crate::core::error::Error;
use crate::core::types::Result;

/// Face file stems in cube layer order
pub const FACE_NAMES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

const FACE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Background used when no skybox images are available
const DEFAULT_SKY: [u8; 4] = [110, 150, 205, 255];

/// Six square RGBA8 faces, concatenated in layer order
#[derive(Clone, Debug, PartialEq)]
pub struct CubeFaces {
    pub size: u32,
    pub pixels: Vec<u8>,
}

impl CubeFaces {
    /// 1x1 faces of a single color
    pub fn solid(color: [u8; 4]) -> Self {
        Self {
            size: 1,
            pixels: color.repeat(6),
        }
    }

    /// Load `px/nx/py/ny/pz/nz` images from `dir`
    ///
    /// All faces must be square and share one size.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut size = None;
        let mut pixels = Vec::new();

        for name in FACE_NAMES {
            let path = find_face(dir, name)?;
            let face = image::open(&path)?.to_rgba8();
            let (w, h) = face.dimensions();
            if w != h {
                return Err(Error::Skybox(format!("skybox face {} is not square ({}x{})", path.display(), w, h)));
            }
            match size {
                None => size = Some(w),
                Some(s) if s != w => {
                    return Err(Error::Skybox(format!(
                        "skybox face {} is {}px, expected {}px", path.display(), w, s
                    )));
                }
                Some(_) => {}
            }
            pixels.extend_from_slice(face.as_raw());
        }

        Ok(Self {
            size: size.unwrap_or(1),
            pixels,
        })
    }

    /// Load from `dir`, falling back to a solid sky on any failure
    pub fn load_or_default(dir: Option<&Path>) -> Self {
        let Some(dir) = dir else {
            return Self::solid(DEFAULT_SKY);
        };
        match Self::load(dir) {
            Ok(faces) => {
                log::info!("Skybox: loaded {}px faces from {}", faces.size, dir.display());
                faces
            }
            Err(e) => {
                log::warn!("Skybox: {} ({}), using solid background", e, dir.display());
                Self::solid(DEFAULT_SKY)
            }
        }
    }
}

fn find_face(dir: &Path, name: &str) -> Result<PathBuf> {
    FACE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("missing skybox face '{}' in {}", name, dir.display()),
            ))
        })
}

/// Cube texture plus the sampler the trace shader reads it with
pub struct Skybox {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl Skybox {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, faces: &CubeFaces) -> Self {
        let size = wgpu::Extent3d {
            width: faces.size,
            height: faces.size,
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("skybox"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &faces.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(faces.size * 4),
                rows_per_image: Some(faces.size),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("skybox_view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("skybox_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self { texture, view, sampler }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}
