// Synchronization primitives
//
// One fence and two semaphores per frame. Waits on the CPU side are bounded:
// each wait is split into slices and gives up with `Timeout` after a fixed
// number of attempts. Device loss is reported as soon as the driver sees it.

use ash::vk;
use std::time::Duration;

use super::driver::DeviceDriver;
use super::objects::{DeviceObject, DeviceObjects};
use crate::config::SyncConfig;
use crate::error::{RenderError, Result};

/// Frame synchronization - one set per frame in flight (here: exactly one)
#[derive(Debug, Clone, Copy)]
pub struct FrameSync {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub in_flight_fence: vk::Fence,
}

impl FrameSync {
    pub fn new<X: DeviceDriver>(objects: &mut DeviceObjects<'_, X>) -> Result<Self> {
        let device = objects.device();

        let image_available = device.create_semaphore()?;
        objects.push(DeviceObject::Semaphore(image_available));
        let render_finished = device.create_semaphore()?;
        objects.push(DeviceObject::Semaphore(render_finished));
        // Start signaled so the first begin() does not wait
        let in_flight_fence = device.create_fence(true)?;
        objects.push(DeviceObject::Fence(in_flight_fence));

        Ok(Self {
            image_available,
            render_finished,
            in_flight_fence,
        })
    }
}

/// Retry budget for a single CPU-side wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget {
    pub slice: Duration,
    pub attempts: u32,
}

impl WaitBudget {
    /// Saturates instead of overflowing on absurd configured slices.
    pub fn total(&self) -> Duration {
        self.slice.checked_mul(self.attempts).unwrap_or(Duration::MAX)
    }
}

impl From<&SyncConfig> for WaitBudget {
    fn from(config: &SyncConfig) -> Self {
        Self {
            slice: Duration::from_millis(config.wait_slice_ms),
            attempts: config.max_wait_attempts.max(1),
        }
    }
}

/// Polls `attempt` until it yields a value or the budget runs out.
pub fn retry_bounded<T, F>(budget: WaitBudget, waiting_for: &'static str, mut attempt: F) -> Result<T>
where
    F: FnMut(Duration) -> Result<Option<T>>,
{
    for round in 1..=budget.attempts {
        if let Some(value) = attempt(budget.slice)? {
            return Ok(value);
        }
        log::debug!(
            "Still waiting for {} ({}/{})",
            waiting_for,
            round,
            budget.attempts
        );
    }

    Err(RenderError::Timeout {
        waiting_for,
        waited: budget.total(),
    })
}

pub fn wait_for_fence<X: DeviceDriver>(
    device: &X,
    fence: vk::Fence,
    budget: WaitBudget,
    waiting_for: &'static str,
) -> Result<()> {
    retry_bounded(budget, waiting_for, |slice| {
        Ok(device.wait_for_fence(fence, slice)?.then_some(()))
    })
}

pub fn acquire_image<X: DeviceDriver>(
    device: &X,
    swapchain: vk::SwapchainKHR,
    signal: vk::Semaphore,
    budget: WaitBudget,
) -> Result<u32> {
    retry_bounded(budget, "swapchain image", |slice| {
        device.acquire_next_image(swapchain, slice, signal)
    })
}
