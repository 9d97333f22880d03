// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use ash::vk;

use pompeii::prelude::*;

/// The pair of semaphores one frame in flight waits on: the swapchain image is ready, and
/// rendering into it is done.  Destroy before the device.
#[derive(Debug)]
pub struct FrameSync {
    image_available: Semaphore,
    render_finished: Semaphore,
}

impl FrameSync {
    /// Either both semaphores are created or neither is left alive.
    pub fn new<B: Backend>(backend: &B, device: &Device) -> Result<Self, VulkanError> {
        let mut image_available = Semaphore::new(backend, device)?;
        match Semaphore::new(backend, device) {
            Ok(render_finished) => Ok(FrameSync {
                image_available,
                render_finished,
            }),
            Err(e) => {
                image_available.destroy(backend);
                Err(e)
            }
        }
    }

    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available.handle()
    }

    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished.handle()
    }

    pub fn destroy<B: Backend>(&mut self, backend: &B) {
        self.render_finished.destroy(backend);
        self.image_available.destroy(backend);
    }
}

#[cfg(test)]
mod test {
    use pompeii::fake::{Call, FakeBackend, FakeWindow, Kind};

    use super::*;
    use crate::{Myr, MyrConfig};

    fn myr() -> Myr<FakeBackend, FakeWindow> {
        let config = MyrConfig::new("frame", 640, 480).context;
        Myr::with_backend(FakeBackend::new(), FakeWindow, &config).unwrap()
    }

    #[test]
    fn test_first_semaphore_fails() {
        let myr = myr();
        myr.backend()
            .fail(Call::CreateSemaphore, vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);

        assert!(matches!(
            myr.frame_sync(),
            Err(VulkanError::SemaphoreCreation(
                vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
            ))
        ));
        let backend = myr.destroy();
        assert_eq!(backend.destroyed(Kind::Semaphore), 0);
        assert!(backend.violations().is_empty());
        assert_eq!(backend.live(), 0);
    }

    #[test]
    fn test_second_semaphore_fails() {
        let myr = myr();
        myr.backend()
            .fail_after(Call::CreateSemaphore, 1, vk::Result::ERROR_OUT_OF_HOST_MEMORY);

        assert!(myr.frame_sync().is_err());
        assert_eq!(myr.backend().destroyed(Kind::Semaphore), 1);
        let backend = myr.destroy();
        assert!(backend.violations().is_empty());
        assert_eq!(backend.live(), 0);
    }

    #[test]
    fn test_destroy_twice() {
        let myr = myr();
        let mut sync = myr.frame_sync().unwrap();
        sync.destroy(myr.backend());
        sync.destroy(myr.backend());
        assert_eq!(sync.image_available(), vk::Semaphore::null());
        assert_eq!(myr.backend().destroyed(Kind::Semaphore), 2);
        myr.destroy();
    }
}
