// Vulkan renderer - one logical device on one physical device
//
// Creation is all-or-nothing: the device is created only after its
// extensions check out, and a failure while creating command pools drops the
// device again.

use ash::vk;

use super::device::{self, CommandPool};
use super::driver::{DeviceDriver, Driver};
use super::frame::VulkanFrame;
use super::instance::VulkanBackend;
use super::selector::{PhysicalDeviceCandidate, QueueFamilyAssignment};
use crate::error::Result;
use crate::render::{DeviceInfo, Frame, Renderer};

pub struct VulkanRenderer<'b, D: Driver> {
    backend: &'b VulkanBackend<D>,
    info: DeviceInfo,
    physical_device: vk::PhysicalDevice,
    queue_families: Vec<QueueFamilyAssignment>,
    command_pools: Vec<CommandPool>,
    device: D::Device,
}

impl<'b, D: Driver> VulkanRenderer<'b, D> {
    pub(crate) fn new(backend: &'b VulkanBackend<D>, candidate: &PhysicalDeviceCandidate) -> Result<Self> {
        log::info!(
            "Creating renderer on GPU {} '{}' ({:?})",
            candidate.system_index,
            candidate.name,
            candidate.device_type
        );

        let device = device::create_device(
            backend.driver(),
            candidate.handle,
            &candidate.queue_families,
            &backend.required_device_extensions(),
        )?;
        let command_pools = device::create_command_pools(&device, &candidate.queue_families)?;

        for family in &candidate.queue_families {
            log::debug!(
                "Queue family {}: {} queues, assigned {:?}, present: {}",
                family.family_index,
                family.queue_count,
                family.granted,
                family.present_support
            );
        }

        Ok(Self {
            backend,
            info: DeviceInfo {
                name: candidate.name.clone(),
                system_index: candidate.system_index,
            },
            physical_device: candidate.handle,
            queue_families: candidate.queue_families.clone(),
            command_pools,
            device,
        })
    }

    pub fn backend(&self) -> &'b VulkanBackend<D> {
        self.backend
    }

    pub fn logical_device(&self) -> &D::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_families(&self) -> &[QueueFamilyAssignment] {
        &self.queue_families
    }

    pub fn command_pools(&self) -> &[CommandPool] {
        &self.command_pools
    }

    /// First pool whose family can both draw and present.
    pub fn presentation_pool(&self) -> Option<CommandPool> {
        self.command_pools.iter().copied().find(|pool| {
            self.queue_families
                .iter()
                .any(|family| family.family_index == pool.family_index && family.can_present_graphics())
        })
    }

    pub fn frame(&self) -> Result<VulkanFrame<'_, D>> {
        VulkanFrame::new(self)
    }
}

impl<D: Driver> Drop for VulkanRenderer<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            log::warn!("Device did not go idle before teardown: {}", e);
        }
        for pool in self.command_pools.drain(..).rev() {
            self.device.destroy_command_pool(pool.pool);
        }
    }
}

impl<D: Driver + 'static> Renderer for VulkanRenderer<'_, D> {
    fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    fn create_frame(&self) -> Result<Box<dyn Frame + '_>> {
        Ok(Box::new(self.frame()?))
    }
}
