//! Depth attachment for the skinning pass

use wgpu::{Device, Extent3d, Texture, TextureView};

/// Depth format used by the skinning pipeline
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Window-sized depth buffer, recreated on resize
pub struct DepthTexture {
    #[allow(dead_code)]
    texture: Texture,
    view: TextureView,
    width: u32,
    height: u32,
}

impl DepthTexture {
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("skinning_depth"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    /// Current resolution
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
