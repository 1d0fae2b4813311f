//! Offscreen framebuffer: a set of float color attachments plus a depth
//! buffer.
//!
//! Both the shadow pass and the G-buffer pass render into an [`Fbo`]; the
//! composite pass then samples the attachments as ordinary textures. Color
//! attachments are `Rgba16Float` (renderable and filterable float format)
//! and depth is `Depth16Unorm`.

use std::cell::Cell;
use std::rc::Rc;

use crate::gpu::GpuContext;
use crate::texture::Texture;

/// Color attachment format for every offscreen target.
pub const FBO_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Depth attachment format for every offscreen target.
pub const FBO_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth16Unorm;

/// Errors raised while creating a framebuffer.
#[derive(Debug)]
pub enum FboError {
    /// Width or height was zero.
    InvalidSize { width: u32, height: u32 },
    /// Attachment count was zero or above the device limit.
    InvalidAttachmentCount { requested: u32, limit: u32 },
}

impl std::fmt::Display for FboError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FboError::InvalidSize { width, height } => {
                write!(f, "framebuffer size {}x{} is invalid", width, height)
            }
            FboError::InvalidAttachmentCount { requested, limit } => {
                write!(
                    f,
                    "framebuffer attachment count {} outside 1..={}",
                    requested, limit
                )
            }
        }
    }
}

impl std::error::Error for FboError {}

/// An offscreen render target with `count` float color attachments and one
/// depth attachment.
///
/// Color attachments are reference-counted so materials can hold them as
/// sampled textures while the framebuffer is still being rendered into on
/// other frames' passes.
pub struct Fbo {
    /// Color attachments in draw-buffer order.
    pub color: Vec<Rc<Texture>>,
    depth: Texture,
    pub width: u32,
    pub height: u32,
    released: Cell<bool>,
}

impl Fbo {
    /// Allocate a framebuffer with `count` color attachments.
    ///
    /// Validation happens before any GPU allocation, so a failed create
    /// leaks nothing.
    pub fn create(
        gpu: &GpuContext,
        width: u32,
        height: u32,
        count: u32,
        label: &str,
    ) -> Result<Self, FboError> {
        if width == 0 || height == 0 {
            return Err(FboError::InvalidSize { width, height });
        }
        let limit = gpu.device.limits().max_color_attachments;
        if count == 0 || count > limit {
            return Err(FboError::InvalidAttachmentCount {
                requested: count,
                limit,
            });
        }

        let color = (0..count)
            .map(|i| {
                Rc::new(Texture::render_target(
                    gpu,
                    width,
                    height,
                    FBO_COLOR_FORMAT,
                    &format!("{} Color {}", label, i),
                ))
            })
            .collect();
        let depth = Texture::render_target(
            gpu,
            width,
            height,
            FBO_DEPTH_FORMAT,
            &format!("{} Depth", label),
        );

        Ok(Self {
            color,
            depth,
            width,
            height,
            released: Cell::new(false),
        })
    }

    /// View of the depth attachment.
    pub(crate) fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    /// Release the attachment memory eagerly.
    ///
    /// Idempotent: repeated calls are no-ops. Sampling a destroyed
    /// attachment is a caller error, the same as sampling a deleted GL
    /// texture.
    pub fn dispose(&self) {
        if !first_release(&self.released) {
            return;
        }
        for attachment in &self.color {
            attachment.destroy();
        }
        self.depth.destroy();
        log::debug!("framebuffer {}x{} disposed", self.width, self.height);
    }
}

/// Flips the release flag, reporting whether this call was the first.
fn first_release(flag: &Cell<bool>) -> bool {
    !flag.replace(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_disposal_releases_only_once() {
        let released = Cell::new(false);
        assert!(first_release(&released));
        assert!(!first_release(&released));
        assert!(!first_release(&released));
    }

    #[test]
    fn errors_describe_the_rejected_parameters() {
        let size = FboError::InvalidSize {
            width: 0,
            height: 600,
        };
        assert_eq!(size.to_string(), "framebuffer size 0x600 is invalid");

        let count = FboError::InvalidAttachmentCount {
            requested: 9,
            limit: 8,
        };
        assert_eq!(
            count.to_string(),
            "framebuffer attachment count 9 outside 1..=8"
        );
    }
}
