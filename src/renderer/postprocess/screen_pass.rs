use crate::renderer::targets::RenderTargets;

/// Uniform interface for full-screen passes that write the destination.
pub trait ScreenPass {
    /// Encode this pass into `output`.
    fn render(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView);
    /// Re-create bind groups after the render targets were reallocated.
    fn rebind(&mut self, device: &wgpu::Device, targets: &RenderTargets);
}

/// Begin a single-attachment pass on `output` with `load`.
pub(crate) fn begin_output_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    output: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: output,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}
