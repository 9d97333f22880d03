// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Backend
//!
//! Every call the wrappers make into Vulkan.  Handles go in and out as plain `vk` handles; the
//! function tables needed to make the calls live inside the backend, keyed by those handles.
//!
//! Errors are the raw `vk::Result`.  The wrappers attach what they were trying to do.

use std::ffi::{c_void, CStr};

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// What the instance is created with, after negotiation.
#[derive(Debug)]
pub struct InstanceDesc<'a> {
    pub app_name: &'a str,
    pub engine_name: &'a str,
    pub app_version: u32,
    pub engine_version: u32,
    pub api_version: u32,
    pub layers: &'a [String],
    pub extensions: &'a [String],
}

/// What the logical device is created with.
#[derive(Debug)]
pub struct DeviceDesc<'a> {
    pub graphics_family: u32,
    pub present_family: u32,
    /// One entry per queue requested from the graphics family.
    pub queue_priorities: &'a [f32],
    pub extensions: &'a [&'a CStr],
}

/// Everything captured about a physical device at enumeration time.
#[derive(Clone, Copy, Debug, Default)]
pub struct GpuSnapshot {
    pub properties: vk::PhysicalDeviceProperties,
    pub memory: vk::PhysicalDeviceMemoryProperties,
    pub features: vk::PhysicalDeviceFeatures,
}

pub trait Backend {
    /// Names of the instance layers the loader can enable.
    fn available_layers(&self) -> Result<Vec<String>, vk::Result>;

    /// Names of the instance extensions the loader can enable.
    fn available_extensions(&self) -> Result<Vec<String>, vk::Result>;

    /// Instance extensions required to create a surface on `display`.
    fn surface_extensions(&self, display: RawDisplayHandle) -> Result<Vec<String>, vk::Result>;

    /// Create an instance and load every instance level function table for it.
    fn create_instance(&self, desc: &InstanceDesc<'_>) -> Result<vk::Instance, vk::Result>;

    fn destroy_instance(&self, instance: vk::Instance);

    /// Install [`crate::debug::debug_report_callback`] for error and warning reports, handing it
    /// `user_data` on every call.
    fn create_debug_report(
        &self,
        instance: vk::Instance,
        user_data: *mut c_void,
    ) -> Result<vk::DebugReportCallbackEXT, vk::Result>;

    fn destroy_debug_report(&self, instance: vk::Instance, callback: vk::DebugReportCallbackEXT);

    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
    ) -> Result<Vec<vk::PhysicalDevice>, vk::Result>;

    fn physical_device_snapshot(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<GpuSnapshot, vk::Result>;

    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::QueueFamilyProperties>, vk::Result>;

    fn surface_support(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::Result>;

    fn create_surface(
        &self,
        instance: vk::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<vk::SurfaceKHR, vk::Result>;

    fn destroy_surface(&self, instance: vk::Instance, surface: vk::SurfaceKHR);

    /// Create a logical device and load its function table.
    fn create_device(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc<'_>,
    ) -> Result<vk::Device, vk::Result>;

    /// Blocks until all work submitted to `device` has completed.  No timeout.
    fn device_wait_idle(&self, device: vk::Device) -> Result<(), vk::Result>;

    fn destroy_device(&self, device: vk::Device);

    fn create_semaphore(&self, device: vk::Device) -> Result<vk::Semaphore, vk::Result>;

    fn destroy_semaphore(&self, device: vk::Device, semaphore: vk::Semaphore);
}
