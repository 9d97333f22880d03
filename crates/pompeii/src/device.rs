// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Device
//!
//! The logical device.  One queue is requested, from the graphics family, and the only extension
//! enabled is swapchain support.  The present family index is carried along for whoever builds the
//! swapchain.

use ash::vk;
use log::warn;

use crate::backend::DeviceDesc;
use crate::prelude::*;

const QUEUE_PRIORITIES: [f32; 1] = [1.0];

#[derive(Debug)]
pub struct Device {
    pub graphics_index: u32,
    pub present_index: u32,

    device: vk::Device,
}

impl Device {
    pub fn new<B: Backend>(
        backend: &B,
        gpu: &Gpu,
        graphics_index: u32,
        present_index: u32,
    ) -> Result<Self, VulkanError> {
        let extensions = [vk::KHR_SWAPCHAIN_NAME];
        let desc = DeviceDesc {
            graphics_family: graphics_index,
            present_family: present_index,
            queue_priorities: &QUEUE_PRIORITIES,
            extensions: &extensions,
        };
        let device = backend
            .create_device(gpu.instance(), gpu.handle(), &desc)
            .map_err(VulkanError::DeviceCreation)?;

        Ok(Device {
            graphics_index,
            present_index,
            device,
        })
    }

    pub fn handle(&self) -> vk::Device {
        self.device
    }

    /// Block until every queue of the device is idle.
    pub fn wait_idle<B: Backend>(&self, backend: &B) -> Result<(), VulkanError> {
        backend
            .device_wait_idle(self.device)
            .map_err(VulkanError::WaitIdle)
    }

    /// Waits for the device to go idle, then destroys it.  Safe to call more than once.
    pub fn destroy<B: Backend>(&mut self, backend: &B) {
        if self.device == vk::Device::null() {
            return;
        }
        if let Err(e) = self.wait_idle(backend) {
            warn!("destroying device anyway: {e}");
        }
        backend.destroy_device(self.device);
        self.device = vk::Device::null();
    }
}

#[cfg(test)]
mod test {
    use ash::vk::Handle;

    use super::*;
    use crate::fake::{Call, Event, FakeBackend, Kind};

    fn gpu(backend: &FakeBackend) -> (Instance, Gpu) {
        let instance = Instance::new(backend, "device", "test", &[], &[]).unwrap();
        let mut gpus = instance.enumerate_gpus(backend).unwrap();
        (instance, gpus.remove(0))
    }

    #[test]
    fn test_device_request() {
        let backend = FakeBackend::new();
        let (mut instance, gpu) = gpu(&backend);

        let mut device = Device::new(&backend, &gpu, 0, 0).unwrap();
        let request = backend.device_request().unwrap();
        assert_eq!(request.graphics_family, 0);
        assert_eq!(request.present_family, 0);
        assert_eq!(request.queue_priorities, vec![1.0]);
        assert_eq!(request.extensions, vec!["VK_KHR_swapchain".to_string()]);

        device.destroy(&backend);
        instance.destroy(&backend);
        assert!(backend.violations().is_empty());
    }

    #[test]
    fn test_destroy_waits_idle_first() {
        let backend = FakeBackend::new();
        let (mut instance, gpu) = gpu(&backend);
        let mut device = Device::new(&backend, &gpu, 0, 0).unwrap();
        let raw = device.handle().as_raw();

        device.destroy(&backend);
        device.destroy(&backend);

        let tail: Vec<Event> = backend
            .events()
            .into_iter()
            .filter(|e| match e {
                Event::WaitIdle(h) | Event::Destroyed(_, h) => *h == raw,
                _ => false,
            })
            .collect();
        assert_eq!(
            tail,
            vec![Event::WaitIdle(raw), Event::Destroyed(Kind::Device, raw)]
        );
        instance.destroy(&backend);
    }

    #[test]
    fn test_destroy_after_failed_wait() {
        let backend = FakeBackend::new();
        let (mut instance, gpu) = gpu(&backend);
        let mut device = Device::new(&backend, &gpu, 0, 0).unwrap();

        backend.fail(Call::WaitIdle, vk::Result::ERROR_DEVICE_LOST);
        assert!(matches!(
            device.wait_idle(&backend),
            Err(VulkanError::WaitIdle(vk::Result::ERROR_DEVICE_LOST))
        ));
        device.destroy(&backend);
        assert_eq!(backend.destroyed(Kind::Device), 1);
        instance.destroy(&backend);
        assert!(backend.violations().is_empty());
    }

    #[test]
    fn test_device_creation_failure() {
        let backend = FakeBackend::new();
        let (mut instance, gpu) = gpu(&backend);
        backend.fail(Call::CreateDevice, vk::Result::ERROR_EXTENSION_NOT_PRESENT);

        let err = Device::new(&backend, &gpu, 0, 0).unwrap_err();
        assert!(matches!(err, VulkanError::DeviceCreation(_)));
        assert_eq!(err.code(), Some(vk::Result::ERROR_EXTENSION_NOT_PRESENT));
        assert!(err.to_string().starts_with("create device: "));
        instance.destroy(&backend);
    }

    #[test]
    fn test_semaphores() {
        let backend = FakeBackend::new();
        let (mut instance, gpu) = gpu(&backend);
        let mut device = Device::new(&backend, &gpu, 0, 0).unwrap();

        let mut image_available = Semaphore::new(&backend, &device).unwrap();
        let mut render_finished = Semaphore::new(&backend, &device).unwrap();
        assert_ne!(image_available.handle(), render_finished.handle());

        image_available.destroy(&backend);
        image_available.destroy(&backend);
        render_finished.destroy(&backend);
        assert_eq!(backend.destroyed(Kind::Semaphore), 2);

        backend.fail(Call::CreateSemaphore, vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        assert!(matches!(
            Semaphore::new(&backend, &device),
            Err(VulkanError::SemaphoreCreation(vk::Result::ERROR_OUT_OF_HOST_MEMORY))
        ));
        assert_eq!(backend.destroyed(Kind::Semaphore), 2);

        device.destroy(&backend);
        instance.destroy(&backend);
        assert!(backend.violations().is_empty());
        assert_eq!(backend.live(), 0);
    }
}
