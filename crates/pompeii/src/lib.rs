// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Pompeii
//!
//! Thin owned wrappers over the handful of Vulkan objects every frame needs before anything can be
//! drawn.
//!
//! Core types:
//!
//! - `Instance` (the connection to the loader, plus optional debug reporting)
//! - `Gpu`
//!   * `QueueFamily`
//! - `Surface`
//! - `Device`
//!   * `Semaphore`
//! - `VkContext` (all of the above, built and torn down together)
//!
//! All Vulkan calls go through the `Backend` trait.  `AshBackend` talks to the real loader.  The
//! `fake` feature adds `FakeBackend`, which keeps everything in memory and records teardown
//! ordering mistakes instead of crashing a driver.
//!
//! Wrappers never destroy themselves on drop.  Each has an explicit `destroy` taking the backend,
//! and callers must tear down in reverse creation order.

pub mod backend;
pub mod context;
pub mod debug;
pub mod device;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod gpu;
pub mod instance;
pub mod queue;
pub mod semaphore;
pub mod surface;
pub mod vulkan;

use ash::vk;

pub mod prelude {
    pub use super::VulkanError;
    pub use crate::backend::Backend;
    pub use crate::context::{ContextConfig, VkContext};
    pub use crate::device::Device;
    pub use crate::gpu::{Gpu, GpuType};
    pub use crate::instance::Instance;
    pub use crate::queue::{PresentPolicy, QueueFamily, QueueSelection};
    pub use crate::semaphore::Semaphore;
    pub use crate::surface::Surface;
    pub use crate::vulkan::AshBackend;
}

/// Validation layer requested when validation is enabled.
pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Instance extension that enables the debug report callback.
pub const DEBUG_REPORT_EXTENSION: &str = "VK_EXT_debug_report";

#[derive(thiserror::Error, Debug)]
pub enum VulkanError {
    #[error("could not initialize vulkan: {0}")]
    BackendInit(String),

    #[error("{0}: {1}")]
    ConnectionCreate(&'static str, vk::Result),

    /// Never returned from construction.  Logged when debug reporting cannot be installed.
    #[error("creating debug report: {0}")]
    DiagnosticRegistration(vk::Result),

    #[error("no valid gpus")]
    NoGpus,

    #[error("{0}: {1}")]
    GpuEnumeration(&'static str, vk::Result),

    #[error("no gpu supports {width}x{height}")]
    NoMatchingGpu { width: u32, height: u32 },

    #[error("no queue families")]
    NoQueueFamilies,

    #[error("no graphics capable queue family")]
    NoGraphicsFamily,

    #[error("no graphics queue family can present to the surface")]
    NoPresentFamily,

    #[error("create device: {0}")]
    DeviceCreation(vk::Result),

    #[error("create window surface: {0}")]
    SurfaceCreation(vk::Result),

    #[error("create semaphore: {0}")]
    SemaphoreCreation(vk::Result),

    #[error("wait idle: {0}")]
    WaitIdle(vk::Result),
}

impl VulkanError {
    /// Backend status code, when the failure came from a Vulkan call.
    pub fn code(&self) -> Option<vk::Result> {
        match self {
            VulkanError::ConnectionCreate(_, code)
            | VulkanError::GpuEnumeration(_, code)
            | VulkanError::DiagnosticRegistration(code)
            | VulkanError::DeviceCreation(code)
            | VulkanError::SurfaceCreation(code)
            | VulkanError::SemaphoreCreation(code)
            | VulkanError::WaitIdle(code) => Some(*code),
            _ => None,
        }
    }
}
