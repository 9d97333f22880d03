// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # GPU
//!
//! A `Gpu` is a snapshot of one physical device taken when the instance enumerated it.  The
//! physical device itself belongs to the instance.  Nothing here frees it and nothing refreshes the
//! snapshot.

use std::ffi::c_char;
use std::fmt;

use ash::vk;

use crate::backend::{Backend, GpuSnapshot};
use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuType {
    Other,
    Integrated,
    Discrete,
    Virtual,
    Cpu,
}

impl From<vk::PhysicalDeviceType> for GpuType {
    fn from(ty: vk::PhysicalDeviceType) -> Self {
        match ty {
            vk::PhysicalDeviceType::INTEGRATED_GPU => GpuType::Integrated,
            vk::PhysicalDeviceType::DISCRETE_GPU => GpuType::Discrete,
            vk::PhysicalDeviceType::VIRTUAL_GPU => GpuType::Virtual,
            vk::PhysicalDeviceType::CPU => GpuType::Cpu,
            // Includes values newer than this code.
            _ => GpuType::Other,
        }
    }
}

impl fmt::Display for GpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GpuType::Other => "Other",
            GpuType::Integrated => "Integrated",
            GpuType::Discrete => "Discrete",
            GpuType::Virtual => "Virtual",
            GpuType::Cpu => "CPU",
        };
        f.write_str(name)
    }
}

/// The limits consulted when choosing a GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuLimits {
    pub max_image_dimension_2d: u32,
    pub max_viewports: u32,
    pub max_viewport_dimensions: [u32; 2],
}

#[derive(Clone, Debug)]
pub struct Gpu {
    name: String,
    kind: GpuType,
    limits: GpuLimits,
    api_version: u32,
    driver_version: u32,
    memory: vk::PhysicalDeviceMemoryProperties,
    features: vk::PhysicalDeviceFeatures,

    // Borrowed from the instance that enumerated this device.
    instance: vk::Instance,
    physical_device: vk::PhysicalDevice,
}

impl Gpu {
    pub(crate) fn new(
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        snapshot: GpuSnapshot,
    ) -> Self {
        let props = &snapshot.properties;
        Gpu {
            name: fixed_str(&props.device_name),
            kind: GpuType::from(props.device_type),
            limits: GpuLimits {
                max_image_dimension_2d: props.limits.max_image_dimension2_d,
                max_viewports: props.limits.max_viewports,
                max_viewport_dimensions: props.limits.max_viewport_dimensions,
            },
            api_version: props.api_version,
            driver_version: props.driver_version,
            memory: snapshot.memory,
            features: snapshot.features,
            instance,
            physical_device,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> GpuType {
        self.kind
    }

    pub fn limits(&self) -> &GpuLimits {
        &self.limits
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    pub fn driver_version(&self) -> u32 {
        self.driver_version
    }

    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory
    }

    pub fn features(&self) -> &vk::PhysicalDeviceFeatures {
        &self.features
    }

    pub fn handle(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// The instance this device was enumerated from.
    pub fn instance(&self) -> vk::Instance {
        self.instance
    }

    /// Whether a `width` by `height` viewport fits.
    pub fn matches(&self, width: u32, height: u32) -> bool {
        let [max_width, max_height] = self.limits.max_viewport_dimensions;
        max_width >= width && max_height >= height
    }

    /// Query the device's queue families, in backend order.
    pub fn queue_families<B: Backend>(&self, backend: &B) -> Result<Vec<QueueFamily>, VulkanError> {
        let props = backend
            .queue_family_properties(self.instance, self.physical_device)
            .map_err(|r| VulkanError::GpuEnumeration("could not query queue families", r))?;
        if props.is_empty() {
            return Err(VulkanError::NoQueueFamilies);
        }

        Ok(props
            .iter()
            .enumerate()
            .map(|(i, p)| QueueFamily::new(i as u32, p, self.instance, self.physical_device))
            .collect())
    }
}

impl fmt::Display for Gpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device Name: {}", self.name)?;
        writeln!(f, "Device Type: {}", self.kind)?;
        writeln!(f, "## Backend")?;
        writeln!(f, "Vulkan v{}", Version(self.api_version))?;
        writeln!(f, "Driver v{}", Version(self.driver_version))?;
        writeln!(f, "Max Image Dimension: {}", self.limits.max_image_dimension_2d)?;
        writeln!(f, "Max Viewports: {}", self.limits.max_viewports)?;
        let [w, h] = self.limits.max_viewport_dimensions;
        writeln!(f, "Max Viewport Dimensions: {w} {h}")
    }
}

struct Version(u32);

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            vk::api_version_major(self.0),
            vk::api_version_minor(self.0),
            vk::api_version_patch(self.0)
        )
    }
}

/// Index of the last GPU that fits `width` by `height`.
pub fn select_gpu(gpus: &[Gpu], width: u32, height: u32) -> Result<usize, VulkanError> {
    gpus.iter()
        .rposition(|gpu| gpu.matches(width, height))
        .ok_or(VulkanError::NoMatchingGpu { width, height })
}

/// Decode a NUL padded fixed size name.  The driver may fill the whole buffer.
fn fixed_str(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
