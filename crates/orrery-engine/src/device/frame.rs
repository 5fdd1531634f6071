/// One acquired swapchain image plus the encoder recording into it.
///
/// Hand it back to `Gpu::submit` promptly; while it is alive the next image
/// cannot be acquired.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
