// Physical device selection
//
// Enumeration is never cached: every call asks the driver again, so a
// device picker always sees the current set of GPUs.

use ash::vk;

use super::driver::Driver;
use crate::error::Result;
use crate::hint::SelectionHint;

/// One queue family and the required capability bits it claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueFamilyAssignment {
    pub family_index: u32,
    pub queue_count: u32,
    /// Everything the family supports.
    pub flags: vk::QueueFlags,
    /// The required bits this family was assigned.
    pub granted: vk::QueueFlags,
    pub present_support: bool,
}

impl QueueFamilyAssignment {
    pub fn can_present_graphics(&self) -> bool {
        self.flags.contains(vk::QueueFlags::GRAPHICS) && self.present_support
    }
}

/// Result of scanning a device's queue families against the required bits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueAssignment {
    pub families: Vec<QueueFamilyAssignment>,
    /// Required bits no family claimed, in required order.
    pub unmatched: Vec<vk::QueueFlags>,
}

impl QueueAssignment {
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }

    pub fn any_present(&self) -> bool {
        self.families.iter().any(|family| family.present_support)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDeviceCandidate {
    pub handle: vk::PhysicalDevice,
    /// Position in the driver's enumeration order.
    pub system_index: u32,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub queue_families: Vec<QueueFamilyAssignment>,
}

/// Scans the families once while draining `required` from the front.
///
/// A family claims leading bits for as long as it supports them and stops at
/// the first one it does not; the next family continues from there. Each bit
/// ends up with exactly one family, the first that reached it.
pub fn assign_queue_families<F>(
    families: &[vk::QueueFamilyProperties],
    required: &[vk::QueueFlags],
    mut present_support: F,
) -> Result<QueueAssignment>
where
    F: FnMut(u32) -> Result<bool>,
{
    let mut pending = required.iter().copied().peekable();
    let mut assigned = Vec::new();

    for (index, props) in families.iter().enumerate() {
        let family_index = index as u32;
        let mut granted = vk::QueueFlags::empty();

        while let Some(bit) = pending.next_if(|bit| props.queue_flags.contains(*bit)) {
            granted |= bit;
        }

        if granted.is_empty() {
            continue;
        }

        assigned.push(QueueFamilyAssignment {
            family_index,
            queue_count: props.queue_count,
            flags: props.queue_flags,
            granted,
            present_support: present_support(family_index)?,
        });
    }

    Ok(QueueAssignment {
        families: assigned,
        unmatched: pending.collect(),
    })
}

/// Devices of an acceptable type whose queue families cover every required
/// bit (and can present to `surface`, when given), in enumeration order.
pub fn enumerate_suitable<D: Driver>(
    driver: &D,
    surface: Option<vk::SurfaceKHR>,
    acceptable_types: &[vk::PhysicalDeviceType],
    required: &[vk::QueueFlags],
) -> Result<Vec<PhysicalDeviceCandidate>> {
    let mut candidates = Vec::new();

    for (index, physical_device) in driver.enumerate_physical_devices()?.into_iter().enumerate() {
        let props = driver.device_properties(physical_device);

        if !acceptable_types.contains(&props.device_type) {
            log::debug!(
                "Rejecting GPU {} '{}': type {:?} not acceptable",
                index,
                props.name,
                props.device_type
            );
            continue;
        }

        let families = driver.queue_families(physical_device);
        let assignment = assign_queue_families(&families, required, |family| match surface {
            Some(surface) => driver.surface_support(physical_device, family, surface),
            None => Ok(false),
        })?;

        if !assignment.is_complete() {
            log::debug!(
                "Rejecting GPU {} '{}': no queue family for {:?}",
                index,
                props.name,
                assignment.unmatched
            );
            continue;
        }

        if surface.is_some() && !assignment.any_present() {
            log::debug!(
                "Rejecting GPU {} '{}': no assigned queue family can present",
                index,
                props.name
            );
            continue;
        }

        candidates.push(PhysicalDeviceCandidate {
            handle: physical_device,
            system_index: index as u32,
            name: props.name,
            device_type: props.device_type,
            queue_families: assignment.families,
        });
    }

    Ok(candidates)
}

/// Picks the hinted candidate, or the first one when the hint is absent or
/// matches nothing. `None` only for an empty candidate list.
pub fn choose<'a>(
    candidates: &'a [PhysicalDeviceCandidate],
    hint: Option<&SelectionHint>,
) -> Option<&'a PhysicalDeviceCandidate> {
    let hinted = hint.and_then(|hint| {
        candidates.iter().find(|candidate| match hint {
            SelectionHint::DeviceIndex(index) => candidate.system_index == *index,
            SelectionHint::DeviceName(name) => candidate.name == *name,
        })
    });

    if hint.is_some() && hinted.is_none() {
        log::debug!("Device hint {:?} matched no suitable GPU, using default", hint);
    }

    hinted.or_else(|| candidates.first())
}
