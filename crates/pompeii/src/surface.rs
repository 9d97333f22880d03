// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Surface
//!
//! The presentation target of one window, created against one instance.  Destroy it before the
//! instance.

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::prelude::*;

#[derive(Debug)]
pub struct Surface {
    instance: vk::Instance,
    surface: vk::SurfaceKHR,
}

impl Surface {
    /// The window behind `display` and `window` must outlive the surface.
    pub fn new<B: Backend>(
        backend: &B,
        instance: &Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<Self, VulkanError> {
        let surface = backend
            .create_surface(instance.handle(), display, window)
            .map_err(VulkanError::SurfaceCreation)?;
        Ok(Surface {
            instance: instance.handle(),
            surface,
        })
    }

    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Safe to call more than once.  Only the first call reaches the backend.
    pub fn destroy<B: Backend>(&mut self, backend: &B) {
        if self.surface != vk::SurfaceKHR::null() {
            backend.destroy_surface(self.instance, self.surface);
            self.surface = vk::SurfaceKHR::null();
        }
    }
}
