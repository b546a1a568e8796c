// Render pass and framebuffers for a presentable frame
//
// One color attachment (the swapchain image) and one depth attachment, a
// single subpass, and one external dependency so the implicit layout
// transitions are ordered before the attachment writes.

use ash::vk;

use super::driver::DeviceDriver;
use super::objects::{DeviceObject, DeviceObjects};
use crate::error::{RenderError, Result};

/// Plain description of the color+depth render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderPassLayout {
    pub color: vk::AttachmentDescription,
    pub depth: vk::AttachmentDescription,
    pub color_ref: vk::AttachmentReference,
    pub depth_ref: vk::AttachmentReference,
    pub dependency: vk::SubpassDependency,
}

impl RenderPassLayout {
    pub fn new(color_format: vk::Format, depth_format: vk::Format) -> Self {
        // Color attachment (the swapchain image)
        let color = vk::AttachmentDescription::builder()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build();

        // Depth attachment
        let depth = vk::AttachmentDescription::builder()
            .format(depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE) // Don't need to store depth
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .build();

        let color_ref = vk::AttachmentReference::builder()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .build();

        let depth_ref = vk::AttachmentReference::builder()
            .attachment(1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .build();

        let attachment_stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        let dependency = vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(attachment_stages)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(attachment_stages)
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
            .build();

        Self {
            color,
            depth,
            color_ref,
            depth_ref,
            dependency,
        }
    }
}

/// First candidate whose optimal-tiling features allow depth/stencil
/// attachments on this device.
pub fn choose_depth_format<F>(candidates: &[vk::Format], mut format_properties: F) -> Result<vk::Format>
where
    F: FnMut(vk::Format) -> vk::FormatProperties,
{
    candidates
        .iter()
        .copied()
        .find(|&format| {
            format_properties(format)
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .ok_or_else(|| RenderError::NoSuitableDepthFormat {
            candidates: candidates.to_vec(),
        })
}

/// Aspect covering every plane of a depth(/stencil) format.
pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::DEPTH,
    }
}

pub fn build_render_pass<X: DeviceDriver>(
    objects: &mut DeviceObjects<'_, X>,
    color_format: vk::Format,
    depth_format: vk::Format,
) -> Result<vk::RenderPass> {
    let layout = RenderPassLayout::new(color_format, depth_format);
    let render_pass = objects.device().create_render_pass(&layout)?;
    objects.push(DeviceObject::RenderPass(render_pass));
    Ok(render_pass)
}

/// One framebuffer per color view, all sharing the single depth view.
/// Sharing is sound because only one frame is ever in flight.
pub fn build_frame_buffers<X: DeviceDriver>(
    objects: &mut DeviceObjects<'_, X>,
    render_pass: vk::RenderPass,
    image_views: &[vk::ImageView],
    depth_view: vk::ImageView,
    extent: vk::Extent2D,
) -> Result<Vec<vk::Framebuffer>> {
    let device = objects.device();
    let mut framebuffers = Vec::with_capacity(image_views.len());

    for &image_view in image_views {
        let framebuffer = device.create_framebuffer(render_pass, &[image_view, depth_view], extent)?;
        objects.push(DeviceObject::Framebuffer(framebuffer));
        framebuffers.push(framebuffer);
    }

    Ok(framebuffers)
}
