// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use ash::vk;

use crate::prelude::*;

/// A binary semaphore owned by one device.  Destroy it before the device.
#[derive(Debug)]
pub struct Semaphore {
    device: vk::Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    pub fn new<B: Backend>(backend: &B, device: &Device) -> Result<Self, VulkanError> {
        let semaphore = backend
            .create_semaphore(device.handle())
            .map_err(VulkanError::SemaphoreCreation)?;
        Ok(Semaphore {
            device: device.handle(),
            semaphore,
        })
    }

    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }

    /// Safe to call more than once.  Only the first call reaches the backend.
    pub fn destroy<B: Backend>(&mut self, backend: &B) {
        if self.semaphore != vk::Semaphore::null() {
            backend.destroy_semaphore(self.device, self.semaphore);
            self.semaphore = vk::Semaphore::null();
        }
    }
}
