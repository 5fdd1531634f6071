//! Texture decoding and ownership.
//!
//! `TextureStore` owns every texture in an arena of generation-checked slots.
//! Callers hold a `TextureHandle`, the unique owner of one slot. Dropping a
//! handle queues the slot for release; the store frees it (GPU texture
//! included) on the next `collect_released`, so each texture is released
//! exactly once.
//!
//! Pixels are decoded on the CPU when a texture is loaded and uploaded lazily
//! the next time the store is prepared against a device.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Rgba, Rgba32FImage, RgbaImage};

use crate::render::RenderCtx;
use crate::render::color::{linear_to_srgb, srgb_to_linear};

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to load texture {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to decode texture: {0}")]
    Decode(#[from] image::ImageError),

    /// Grey + alpha images have no matching upload format.
    #[error("unsupported channel count {channels}")]
    UnsupportedChannels { channels: u8 },

    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },
}

/// Number of mip levels down to 1×1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    (width.max(height).max(1) as f32).log2().floor() as u32 + 1
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PixelFormat {
    /// Single channel, from 1-channel images.
    R8,
    /// sRGB colour with alpha, from 3- and 4-channel images.
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rgba8 => 4,
        }
    }

    pub fn wgpu(self) -> wgpu::TextureFormat {
        match self {
            PixelFormat::R8 => wgpu::TextureFormat::R8Unorm,
            PixelFormat::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

/// Decoded pixels with a full mip chain (`levels[0]` is the base image).
#[derive(Debug, Clone, PartialEq)]
pub struct TexturePixels {
    width: u32,
    height: u32,
    format: PixelFormat,
    levels: Vec<Vec<u8>>,
}

impl TexturePixels {
    /// Maps the image's channel count to an upload format and builds mips.
    ///
    /// 1 channel → `R8`, 3 or 4 channels → `Rgba8` (opaque alpha added for
    /// RGB). Rows stay in file order: wgpu puts texcoord (0, 0) at the first
    /// row, matching the sphere's north-pole-first layout.
    pub fn from_image(img: DynamicImage) -> Result<Self, TextureError> {
        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return Err(TextureError::ZeroDimensions { width, height });
        }

        let (format, levels) = match img.color().channel_count() {
            1 => (PixelFormat::R8, mip_chain(img.to_luma8())),
            3 | 4 => (PixelFormat::Rgba8, srgb_mip_chain(img.to_rgba8())),
            channels => return Err(TextureError::UnsupportedChannels { channels }),
        };

        Ok(Self {
            width,
            height,
            format,
            levels,
        })
    }

    /// Decodes an encoded image (PNG, JPEG, ...) from memory.
    pub fn decode(bytes: &[u8]) -> Result<Self, TextureError> {
        Self::from_image(image::load_from_memory(bytes)?)
    }

    /// 1×1 texture of a single colour.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            format: PixelFormat::Rgba8,
            levels: vec![rgba.to_vec()],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn mip_level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn level(&self, mip: u32) -> Option<&[u8]> {
        self.levels.get(mip as usize).map(Vec::as_slice)
    }

    pub(crate) fn upload(
        &self,
        ctx: &RenderCtx<'_>,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
    ) -> GpuTexture {
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: self.mip_level_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format.wgpu(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let bpp = self.format.bytes_per_pixel();
        for (mip, data) in self.levels.iter().enumerate() {
            let w = (self.width >> mip).max(1);
            let h = (self.height >> mip).max(1);
            ctx.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(w * bpp),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        GpuTexture {
            _texture: texture,
            _view: view,
            bind_group,
        }
    }
}

/// Halves each level with a triangle filter until 1×1. Used for
/// single-channel data, which is uploaded as linear `R8Unorm`.
fn mip_chain<P>(base: ImageBuffer<P, Vec<u8>>) -> Vec<Vec<u8>>
where
    P: image::Pixel<Subpixel = u8> + 'static,
{
    let count = mip_level_count(base.width(), base.height());
    let mut levels = Vec::with_capacity(count as usize);
    let mut prev = base;
    for _ in 1..count {
        let w = (prev.width() / 2).max(1);
        let h = (prev.height() / 2).max(1);
        let next = image::imageops::resize(&prev, w, h, FilterType::Triangle);
        levels.push(std::mem::replace(&mut prev, next).into_raw());
    }
    levels.push(prev.into_raw());
    levels
}

/// Like [`mip_chain`], but filters colour in linear space so minified
/// levels keep the base image's brightness. Alpha is already linear.
fn srgb_mip_chain(base: RgbaImage) -> Vec<Vec<u8>> {
    let count = mip_level_count(base.width(), base.height());
    let mut linear = Rgba32FImage::from_fn(base.width(), base.height(), |x, y| {
        let Rgba([r, g, b, a]) = *base.get_pixel(x, y);
        let channel = |v: u8| srgb_to_linear(v as f32 / 255.0);
        Rgba([channel(r), channel(g), channel(b), a as f32 / 255.0])
    });

    let mut levels = Vec::with_capacity(count as usize);
    levels.push(base.into_raw());
    for _ in 1..count {
        let w = (linear.width() / 2).max(1);
        let h = (linear.height() / 2).max(1);
        linear = image::imageops::resize(&linear, w, h, FilterType::Triangle);
        levels.push(encode_srgb(&linear));
    }
    levels
}

fn encode_srgb(linear: &Rgba32FImage) -> Vec<u8> {
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    linear
        .pixels()
        .flat_map(|&Rgba([r, g, b, a])| {
            [
                byte(linear_to_srgb(r)),
                byte(linear_to_srgb(g)),
                byte(linear_to_srgb(b)),
                byte(a),
            ]
        })
        .collect()
}

pub(crate) struct GpuTexture {
    _texture: wgpu::Texture,
    _view: wgpu::TextureView,
    pub(crate) bind_group: wgpu::BindGroup,
}

/// Generation-checked slot index into a `TextureStore`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId {
    index: u32,
    generation: u32,
}

impl TextureId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

type ReleaseQueue = Rc<RefCell<Vec<TextureId>>>;

/// Unique owner of one texture in a `TextureStore`.
///
/// Not `Clone`: exactly one handle exists per texture, so a texture is queued
/// for release exactly once.
#[derive(Debug)]
pub struct TextureHandle {
    id: TextureId,
    released: ReleaseQueue,
}

impl TextureHandle {
    pub fn id(&self) -> TextureId {
        self.id
    }
}

impl Drop for TextureHandle {
    fn drop(&mut self) {
        self.released.borrow_mut().push(self.id);
    }
}

struct Entry {
    label: String,
    size: (u32, u32),
    pending: Option<TexturePixels>,
    gpu: Option<GpuTexture>,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
pub struct TextureStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    released: ReleaseQueue,
    live: usize,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the image at `path` and stores it.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<TextureHandle, TextureError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| TextureError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let pixels = TexturePixels::from_image(img)?;

        log::info!(
            "texture loaded: {} ({}x{}, {:?}, {} mips)",
            path.display(),
            pixels.width(),
            pixels.height(),
            pixels.format(),
            pixels.mip_level_count()
        );

        Ok(self.insert(path.display().to_string(), pixels))
    }

    pub fn insert(&mut self, label: impl Into<String>, pixels: TexturePixels) -> TextureHandle {
        let entry = Entry {
            label: label.into(),
            size: (pixels.width(), pixels.height()),
            pending: Some(pixels),
            gpu: None,
        };

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.entry = Some(entry);
        self.live += 1;

        TextureHandle {
            id: TextureId::new(index, slot.generation),
            released: Rc::clone(&self.released),
        }
    }

    /// Frees every texture whose handle has been dropped since the last call.
    ///
    /// Returns the number of textures released.
    pub fn collect_released(&mut self) -> usize {
        let ids: Vec<TextureId> = self.released.borrow_mut().drain(..).collect();
        let mut count = 0;

        for id in ids {
            let Some(slot) = self.slots.get_mut(id.index as usize) else { continue };
            if slot.generation != id.generation {
                continue;
            }
            if let Some(entry) = slot.entry.take() {
                log::debug!("texture released: {}", entry.label);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                self.live -= 1;
                count += 1;
            }
        }

        count
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.entry(id).is_some()
    }

    pub fn size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.entry(id).map(|e| e.size)
    }

    /// Textures decoded but not yet on the GPU.
    pub fn pending_uploads(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|s| s.entry.as_ref())
            .filter(|e| e.pending.is_some())
            .count()
    }

    /// Uploads pending textures and builds their bind groups.
    pub fn prepare(
        &mut self,
        ctx: &RenderCtx<'_>,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
    ) {
        for entry in self.slots.iter_mut().filter_map(|s| s.entry.as_mut()) {
            if let Some(pixels) = entry.pending.take() {
                entry.gpu = Some(pixels.upload(ctx, &entry.label, layout, sampler));
            }
        }
    }

    pub fn bind_group(&self, id: TextureId) -> Option<&wgpu::BindGroup> {
        self.entry(id)?.gpu.as_ref().map(|g| &g.bind_group)
    }

    fn entry(&self, id: TextureId) -> Option<&Entry> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, LumaA, Rgb, RgbImage};

    fn rgb(w: u32, h: u32) -> TexturePixels {
        TexturePixels::from_image(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            w,
            h,
            Rgb([10, 20, 30]),
        )))
        .unwrap()
    }

    #[test]
    fn mip_count_matches_log2() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(1024, 512), 11);
        assert_eq!(mip_level_count(3, 2), 2);
    }

    #[test]
    fn rgb_becomes_opaque_rgba() {
        let px = rgb(2, 2);
        assert_eq!(px.format(), PixelFormat::Rgba8);
        assert_eq!(px.format().wgpu(), wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(&px.level(0).unwrap()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn grey_becomes_single_channel() {
        let px = TexturePixels::from_image(DynamicImage::ImageLuma8(GrayImage::new(4, 4))).unwrap();
        assert_eq!(px.format(), PixelFormat::R8);
        assert_eq!(px.level(0).unwrap().len(), 16);
    }

    #[test]
    fn grey_alpha_is_rejected() {
        let img = image::ImageBuffer::from_pixel(2, 2, LumaA([0u8, 255]));
        let err = TexturePixels::from_image(DynamicImage::ImageLumaA8(img)).unwrap_err();
        assert!(matches!(err, TextureError::UnsupportedChannels { channels: 2 }));
    }

    #[test]
    fn mip_chain_halves_to_one_pixel() {
        let px = rgb(8, 4);
        assert_eq!(px.mip_level_count(), 4);
        let sizes: Vec<usize> = (0..4).map(|m| px.level(m).unwrap().len()).collect();
        // 8x4, 4x2, 2x1, 1x1
        assert_eq!(sizes, vec![8 * 4 * 4, 4 * 2 * 4, 2 * 4, 4]);
    }

    #[test]
    fn colour_mips_average_in_linear_space() {
        // Black/white checkerboard: the 1×1 level is 50% linear light,
        // which is sRGB 188, not the 128 a byte average would give.
        let img = RgbImage::from_fn(2, 2, |x, y| {
            if (x + y) % 2 == 0 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let px = TexturePixels::from_image(DynamicImage::ImageRgb8(img)).unwrap();
        let top = px.level(1).unwrap();
        assert!((186..=190).contains(&top[0]), "got {}", top[0]);
        assert_eq!(top[3], 255);
    }

    #[test]
    fn flat_colour_survives_every_level() {
        let px = rgb(8, 8);
        for m in 0..px.mip_level_count() {
            assert_eq!(&px.level(m).unwrap()[..4], &[10, 20, 30, 255]);
        }
    }

    #[test]
    fn dropping_handles_releases_each_texture_once() {
        let mut store = TextureStore::new();
        let a = store.insert("a", TexturePixels::solid([255; 4]));
        let b = store.insert("b", TexturePixels::solid([0; 4]));
        let c = store.insert("c", TexturePixels::solid([9; 4]));
        assert_eq!(store.live_count(), 3);

        let a_id = a.id();
        drop(a);
        drop(c);
        assert_eq!(store.collect_released(), 2);
        assert_eq!(store.collect_released(), 0);
        assert_eq!(store.live_count(), 1);
        assert!(!store.contains(a_id));
        assert!(store.contains(b.id()));
    }

    #[test]
    fn released_slot_is_reused_with_new_generation() {
        let mut store = TextureStore::new();
        let old = store.insert("old", TexturePixels::solid([1; 4]));
        let old_id = old.id();
        drop(old);
        store.collect_released();

        let new = store.insert("new", TexturePixels::solid([2; 4]));
        assert_ne!(new.id(), old_id);
        assert!(!store.contains(old_id));
        assert_eq!(store.size(new.id()), Some((1, 1)));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let mut store = TextureStore::new();
        let err = store.load("/no/such/texture.jpg").unwrap_err();
        assert!(matches!(err, TextureError::Open { .. }));
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn loads_png_from_disk() {
        let path = std::env::temp_dir().join(format!("orrery-tex-{}.png", std::process::id()));
        RgbImage::from_pixel(4, 2, Rgb([1, 2, 3])).save(&path).unwrap();

        let mut store = TextureStore::new();
        let handle = store.load(&path).unwrap();
        assert_eq!(store.size(handle.id()), Some((4, 2)));
        assert_eq!(store.pending_uploads(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            TexturePixels::decode(b"not an image"),
            Err(TextureError::Decode(_))
        ));
    }
}
