// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Context
//!
//! `VkContext` is the chain of objects needed before a frame can be drawn into a window: instance,
//! chosen GPU, surface, queue family choice and logical device.  It is built in one call and torn
//! down in one call.
//!
//! When a step fails part way, whatever was already created is destroyed in reverse order before
//! the error is returned.  A failed `new` leaves nothing alive.

use log::info;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::gpu::select_gpu;
use crate::queue::select_for_surface;
use crate::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextConfig {
    pub app_name: String,
    pub engine_name: String,
    /// The chosen GPU must support a viewport at least this large.
    pub width: u32,
    pub height: u32,
    /// Request the validation layer and debug reporting.
    pub validation: bool,
    pub present_policy: PresentPolicy,
}

impl ContextConfig {
    /// Validation follows the build profile.
    pub fn new(app_name: &str, width: u32, height: u32) -> Self {
        ContextConfig {
            app_name: app_name.to_string(),
            engine_name: "pompeii".to_string(),
            width,
            height,
            validation: cfg!(debug_assertions),
            present_policy: PresentPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct VkContext {
    instance: Instance,
    gpu: Gpu,
    surface: Surface,
    device: Device,
    selection: QueueSelection,
}

impl VkContext {
    /// Build everything for the window behind `display` and `window`, which must outlive the
    /// context.
    pub fn new<B: Backend>(
        backend: &B,
        config: &ContextConfig,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<Self, VulkanError> {
        let surface_extensions = backend
            .surface_extensions(display)
            .map_err(|r| VulkanError::ConnectionCreate("could not get surface extensions", r))?;

        let mut extensions: Vec<&str> = surface_extensions.iter().map(String::as_str).collect();
        let mut layers = Vec::new();
        if config.validation {
            layers.push(crate::VALIDATION_LAYER);
            extensions.push(crate::DEBUG_REPORT_EXTENSION);
        }

        let mut instance = Instance::new(
            backend,
            &config.app_name,
            &config.engine_name,
            &layers,
            &extensions,
        )?;

        match attach(backend, config, &instance, display, window) {
            Ok((gpu, surface, device, selection)) => Ok(VkContext {
                instance,
                gpu,
                surface,
                device,
                selection,
            }),
            Err(e) => {
                instance.destroy(backend);
                Err(e)
            }
        }
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue_selection(&self) -> QueueSelection {
        self.selection
    }

    /// Device, then surface, then instance.  Anything created from the device must already be
    /// gone.
    pub fn destroy<B: Backend>(mut self, backend: &B) {
        self.device.destroy(backend);
        self.surface.destroy(backend);
        self.instance.destroy(backend);
    }
}

// Everything after the instance.  On error the surface is already gone.
fn attach<B: Backend>(
    backend: &B,
    config: &ContextConfig,
    instance: &Instance,
    display: RawDisplayHandle,
    window: RawWindowHandle,
) -> Result<(Gpu, Surface, Device, QueueSelection), VulkanError> {
    let gpus = instance.enumerate_gpus(backend)?;
    for (i, gpu) in gpus.iter().enumerate() {
        info!("# GPU {i}\n{gpu}");
    }
    let picked = select_gpu(&gpus, config.width, config.height)?;
    let gpu = gpus[picked].clone();
    info!("Picked: {}", gpu.name());

    let mut surface = Surface::new(backend, instance, display, window)?;
    match open_device(backend, config, &gpu, &surface) {
        Ok((device, selection)) => Ok((gpu, surface, device, selection)),
        Err(e) => {
            surface.destroy(backend);
            Err(e)
        }
    }
}

fn open_device<B: Backend>(
    backend: &B,
    config: &ContextConfig,
    gpu: &Gpu,
    surface: &Surface,
) -> Result<(Device, QueueSelection), VulkanError> {
    let families = gpu.queue_families(backend)?;
    let selection = select_for_surface(backend, &families, surface, config.present_policy)?;
    let device = Device::new(backend, gpu, selection.graphics, selection.present)?;
    Ok((device, selection))
}
