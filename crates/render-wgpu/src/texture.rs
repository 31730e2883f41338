//! Image decoding and texture upload.
//!
//! Decoded pixels live only until their upload call returns. Surface maps
//! degrade to a white texel when they cannot be decoded; a cubemap with any
//! bad face is an error.

use cubelight_render::CubemapFaces;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wgpu::util::DeviceExt;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("cannot decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cubemap face {} is {width}x{height}; faces must be square", path.display())]
    NotSquare {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error("cubemap face {} is {found}px wide, expected {expected}px", path.display())]
    FaceSize {
        path: PathBuf,
        expected: u32,
        found: u32,
    },
}

/// Tightly packed RGBA8 pixels.
#[derive(Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn decode_rgba(path: &Path) -> Result<DecodedImage, TextureError> {
    let img = image::open(path)
        .map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba: img.into_raw(),
    })
}

/// How a surface map's bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelEncoding {
    /// Color data, decoded from sRGB when sampled.
    Srgb,
    /// Raw intensities, such as a specular mask.
    Linear,
}

impl TexelEncoding {
    fn format(self) -> wgpu::TextureFormat {
        match self {
            TexelEncoding::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TexelEncoding::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

pub struct Texture2d {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

fn upload_2d(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    image: &DecodedImage,
    encoding: TexelEncoding,
) -> Texture2d {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: encoding.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &image.rgba,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Texture2d { texture, view }
}

/// Load a surface map. A missing or corrupt file yields a 1x1 white texture
/// and a warning.
pub fn load_texture_2d(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
    encoding: TexelEncoding,
) -> Texture2d {
    let label = path.display().to_string();
    let image = match decode_rgba(path) {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!("{e}; using a white texture");
            DecodedImage {
                width: 1,
                height: 1,
                rgba: vec![255, 255, 255, 255],
            }
        }
    };
    let texture = upload_2d(device, queue, &label, &image, encoding);
    tracing::debug!("loaded texture {label} ({}x{})", image.width, image.height);
    texture
}

/// Check a decoded face against the first face's edge length.
pub fn check_face(path: &Path, image: &DecodedImage, expected: Option<u32>) -> Result<u32, TextureError> {
    if image.width != image.height {
        return Err(TextureError::NotSquare {
            path: path.to_path_buf(),
            width: image.width,
            height: image.height,
        });
    }
    match expected {
        Some(expected) if expected != image.width => Err(TextureError::FaceSize {
            path: path.to_path_buf(),
            expected,
            found: image.width,
        }),
        _ => Ok(image.width),
    }
}

pub struct Cubemap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Decode and upload the six faces one at a time, in upload order.
pub fn load_cubemap(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    faces: &CubemapFaces,
) -> Result<Cubemap, TextureError> {
    let order = faces.upload_order();
    let (_, first_path) = order[0];
    let first = decode_rgba(first_path)?;
    let size = check_face(first_path, &first, None)?;

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("skybox_cubemap"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let mut pending = Some(first);
    for (face, path) in order {
        let image = match pending.take() {
            Some(image) => image,
            None => {
                let image = decode_rgba(path)?;
                check_face(path, &image, Some(size))?;
                image
            }
        };
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: face.layer(),
                },
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
        drop(image);
        tracing::debug!("uploaded cubemap face {face:?} from {}", path.display());
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("skybox_cubemap_view"),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    });
    Ok(Cubemap { texture, view })
}

/// Linear filtering, repeat wrap.
pub fn surface_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("surface_sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Linear filtering, clamped on all three axes so face edges do not bleed.
pub fn cubemap_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("cubemap_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32) -> DecodedImage {
        DecodedImage {
            width,
            height,
            rgba: vec![0; (width * height * 4) as usize],
        }
    }

    #[test]
    fn decodes_png_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        let img = decode_rgba(&path).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.rgba.len(), 3 * 2 * 4);
        assert_eq!(&img.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn missing_image_is_decode_error() {
        let err = decode_rgba(Path::new("/nonexistent/face.jpg")).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
    }

    #[test]
    fn faces_must_be_square_and_equal() {
        let p = Path::new("face.png");
        assert_eq!(check_face(p, &solid(8, 8), None).unwrap(), 8);
        assert!(check_face(p, &solid(8, 8), Some(8)).is_ok());
        assert!(matches!(
            check_face(p, &solid(8, 4), None),
            Err(TextureError::NotSquare { .. })
        ));
        assert!(matches!(
            check_face(p, &solid(4, 4), Some(8)),
            Err(TextureError::FaceSize { expected: 8, found: 4, .. })
        ));
    }

    #[test]
    fn shipped_skybox_faces_agree() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/textures/skybox");
        let faces = CubemapFaces::in_dir(dir, "png");
        let mut edge = None;
        for (_, path) in faces.upload_order() {
            let img = decode_rgba(path).unwrap();
            edge = Some(check_face(path, &img, edge).unwrap());
        }
    }
}
