// Swapchain - Window presentation
//
// Negotiates a surface format from a ranked list and builds the chain of
// presentable images. Surface capabilities are queried fresh on every build.
// Resizing is not handled: an out-of-date swapchain surfaces as an error.

use ash::vk;

use super::driver::{DeviceDriver, Driver};
use super::objects::{DeviceObject, DeviceObjects};
use super::selector::QueueFamilyAssignment;
use crate::error::{RenderError, Result};

/// FIFO is always supported and paces presentation to vblank.
pub const PRESENT_MODE: vk::PresentModeKHR = vk::PresentModeKHR::FIFO;

/// Everything the driver needs to create a swapchain.
#[derive(Debug, Clone)]
pub struct SwapchainDescriptor {
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub min_image_count: u32,
    /// Families allowed to use the images (graphics- and present-capable).
    pub sharing_families: Vec<u32>,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
}

/// A built swapchain: the handle, its images and one color view per image.
#[derive(Debug, Clone)]
pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
}

/// First acceptable format the surface offers, with the color space it
/// is offered in.
pub fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    acceptable: &[vk::Format],
) -> Result<vk::SurfaceFormatKHR> {
    acceptable
        .iter()
        .find_map(|wanted| available.iter().find(|offered| offered.format == *wanted))
        .copied()
        .ok_or_else(|| RenderError::NoSuitableFormat {
            acceptable: acceptable.to_vec(),
            available: available.iter().map(|f| f.format).collect(),
        })
}

/// Surface extent, or the fallback clamped to the surface limits when the
/// surface leaves the choice to the swapchain.
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, fallback: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }

    vk::Extent2D {
        width: fallback
            .width
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: fallback
            .height
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// Negotiates the swapchain parameters against the current surface state.
pub fn describe<D: Driver>(
    driver: &D,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    queue_families: &[QueueFamilyAssignment],
    acceptable_formats: &[vk::Format],
    fallback_extent: vk::Extent2D,
) -> Result<SwapchainDescriptor> {
    let available = driver.surface_formats(physical_device, surface)?;
    let format = choose_surface_format(&available, acceptable_formats)?;
    let caps = driver.surface_capabilities(physical_device, surface)?;

    let sharing_families = queue_families
        .iter()
        .filter(|family| family.can_present_graphics())
        .map(|family| family.family_index)
        .collect();

    Ok(SwapchainDescriptor {
        format,
        extent: choose_extent(&caps, fallback_extent),
        min_image_count: caps.min_image_count,
        sharing_families,
        pre_transform: caps.current_transform,
        present_mode: PRESENT_MODE,
    })
}

/// Builds the swapchain and its image views, registering every handle with
/// `objects` so a failure halfway leaves nothing behind.
pub fn build<D: Driver>(
    driver: &D,
    objects: &mut DeviceObjects<'_, D::Device>,
    physical_device: vk::PhysicalDevice,
    surface: Option<vk::SurfaceKHR>,
    queue_families: &[QueueFamilyAssignment],
    acceptable_formats: &[vk::Format],
    fallback_extent: vk::Extent2D,
) -> Result<Swapchain> {
    let surface = surface.ok_or(RenderError::NoValidSurface)?;
    let descriptor = describe(
        driver,
        physical_device,
        surface,
        queue_families,
        acceptable_formats,
        fallback_extent,
    )?;

    log::info!(
        "Creating swapchain: {}x{} {:?}/{:?}, {} images minimum",
        descriptor.extent.width,
        descriptor.extent.height,
        descriptor.format.format,
        descriptor.format.color_space,
        descriptor.min_image_count
    );

    let device = objects.device();
    let handle = device.create_swapchain(surface, &descriptor)?;
    objects.push(DeviceObject::Swapchain(handle));

    let images = device.swapchain_images(handle)?;
    let mut image_views = Vec::with_capacity(images.len());
    for &image in &images {
        let view = device.create_image_view(
            image,
            descriptor.format.format,
            vk::ImageAspectFlags::COLOR,
        )?;
        objects.push(DeviceObject::ImageView(view));
        image_views.push(view);
    }

    log::info!("Created swapchain with {} images", images.len());

    Ok(Swapchain {
        handle,
        format: descriptor.format,
        extent: descriptor.extent,
        images,
        image_views,
    })
}
