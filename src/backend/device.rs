// Logical device creation
//
// Responsibilities:
// - Check required device extensions before anything is created
// - One queue request per assigned family, uniform priority
// - One resettable command pool per assigned family

use ash::vk;

use super::capability;
use super::driver::{DeviceDriver, Driver, QueueRequest};
use super::selector::QueueFamilyAssignment;
use crate::error::{CapabilityScope, Result};

/// Every queue is requested at the same priority.
const QUEUE_PRIORITY: f32 = 1.0;

/// A command pool and the queue family it allocates for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPool {
    pub pool: vk::CommandPool,
    pub family_index: u32,
}

pub fn queue_requests(assignments: &[QueueFamilyAssignment]) -> Vec<QueueRequest> {
    assignments
        .iter()
        .map(|family| QueueRequest {
            family_index: family.family_index,
            priorities: vec![QUEUE_PRIORITY; family.queue_count.max(1) as usize],
        })
        .collect()
}

/// Creates the logical device, failing fast on missing extensions.
pub fn create_device<D: Driver>(
    driver: &D,
    physical_device: vk::PhysicalDevice,
    assignments: &[QueueFamilyAssignment],
    required_extensions: &[String],
) -> Result<D::Device> {
    let available = driver.device_extensions(physical_device)?;
    capability::ensure_available(
        CapabilityScope::Device,
        &[],
        &[],
        &available,
        required_extensions,
    )?;

    let requests = queue_requests(assignments);
    log::debug!("Requesting queues: {:?}", requests);

    driver.create_device(physical_device, &requests, required_extensions)
}

/// One pool per assigned family, tagged with its family index. On failure
/// the pools created so far are destroyed again.
pub fn create_command_pools<X: DeviceDriver>(
    device: &X,
    assignments: &[QueueFamilyAssignment],
) -> Result<Vec<CommandPool>> {
    let mut pools = Vec::with_capacity(assignments.len());

    for family in assignments {
        match device.create_command_pool(family.family_index) {
            Ok(pool) => pools.push(CommandPool {
                pool,
                family_index: family.family_index,
            }),
            Err(e) => {
                for created in pools.iter().rev() {
                    device.destroy_command_pool(created.pool);
                }
                return Err(e);
            }
        }
    }

    Ok(pools)
}
