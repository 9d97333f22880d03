// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Vulkan
//!
//! `AshBackend` is the `Backend` that calls the real loader through `ash`.
//!
//! `ash` wants a loaded function table for every instance and device call.  Tables are built right
//! after the object is created and kept here, keyed by the raw handle, until the object is
//! destroyed.  Application code that needs calls the wrappers don't cover can borrow them through
//! `instance_fns`, `surface_fns` and `device_fns`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr, CString};

use ash::vk;
use log::{debug, warn};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::backend::{Backend, DeviceDesc, GpuSnapshot, InstanceDesc};
use crate::debug::debug_report_callback;
use crate::VulkanError;

struct InstanceFns {
    instance: ash::Instance,
    surface: ash::khr::surface::Instance,
    debug_report: Option<ash::ext::debug_report::Instance>,
}

pub struct AshBackend {
    entry: ash::Entry,
    instances: RefCell<HashMap<vk::Instance, InstanceFns>>,
    devices: RefCell<HashMap<vk::Device, ash::Device>>,
}

impl AshBackend {
    /// Load the system Vulkan library.
    pub fn load() -> Result<Self, VulkanError> {
        let entry =
            unsafe { ash::Entry::load() }.map_err(|e| VulkanError::BackendInit(e.to_string()))?;
        Ok(AshBackend {
            entry,
            instances: RefCell::new(HashMap::new()),
            devices: RefCell::new(HashMap::new()),
        })
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Instance level functions for an instance created through this backend.
    pub fn instance_fns(&self, instance: vk::Instance) -> Option<ash::Instance> {
        self.instances
            .borrow()
            .get(&instance)
            .map(|fns| fns.instance.clone())
    }

    pub fn surface_fns(&self, instance: vk::Instance) -> Option<ash::khr::surface::Instance> {
        self.instances
            .borrow()
            .get(&instance)
            .map(|fns| fns.surface.clone())
    }

    /// Device level functions for a device created through this backend.
    pub fn device_fns(&self, device: vk::Device) -> Option<ash::Device> {
        self.devices.borrow().get(&device).cloned()
    }

    fn with_instance<T>(
        &self,
        instance: vk::Instance,
        f: impl FnOnce(&InstanceFns) -> Result<T, vk::Result>,
    ) -> Result<T, vk::Result> {
        match self.instances.borrow().get(&instance) {
            Some(fns) => f(fns),
            None => Err(vk::Result::ERROR_INITIALIZATION_FAILED),
        }
    }

    fn with_device<T>(
        &self,
        device: vk::Device,
        f: impl FnOnce(&ash::Device) -> Result<T, vk::Result>,
    ) -> Result<T, vk::Result> {
        match self.devices.borrow().get(&device) {
            Some(fns) => f(fns),
            None => Err(vk::Result::ERROR_INITIALIZATION_FAILED),
        }
    }
}

fn c_string(s: &str) -> Result<CString, vk::Result> {
    CString::new(s).map_err(|_| vk::Result::ERROR_INITIALIZATION_FAILED)
}

fn c_strings(names: &[String]) -> Result<Vec<CString>, vk::Result> {
    names.iter().map(|n| c_string(n)).collect()
}

fn owned(name: Result<&CStr, std::ffi::FromBytesUntilNulError>) -> Option<String> {
    name.ok().map(|n| n.to_string_lossy().into_owned())
}

impl Backend for AshBackend {
    fn available_layers(&self) -> Result<Vec<String>, vk::Result> {
        let props = unsafe { self.entry.enumerate_instance_layer_properties()? };
        Ok(props
            .iter()
            .filter_map(|p| owned(p.layer_name_as_c_str()))
            .collect())
    }

    fn available_extensions(&self) -> Result<Vec<String>, vk::Result> {
        let props = unsafe { self.entry.enumerate_instance_extension_properties(None)? };
        Ok(props
            .iter()
            .filter_map(|p| owned(p.extension_name_as_c_str()))
            .collect())
    }

    fn surface_extensions(&self, display: RawDisplayHandle) -> Result<Vec<String>, vk::Result> {
        let names = ash_window::enumerate_required_extensions(display)?;
        Ok(names
            .iter()
            .map(|&p| unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
            .collect())
    }

    fn create_instance(&self, desc: &InstanceDesc<'_>) -> Result<vk::Instance, vk::Result> {
        let app_name = c_string(desc.app_name)?;
        let engine_name = c_string(desc.engine_name)?;
        let layers = c_strings(desc.layers)?;
        let extensions = c_strings(desc.extensions)?;
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(desc.app_version)
            .engine_name(&engine_name)
            .engine_version(desc.engine_version)
            .api_version(desc.api_version);
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);

        let instance = unsafe { self.entry.create_instance(&create_info, None)? };
        let surface = ash::khr::surface::Instance::new(&self.entry, &instance);
        let debug_report = desc
            .extensions
            .iter()
            .any(|e| e == crate::DEBUG_REPORT_EXTENSION)
            .then(|| ash::ext::debug_report::Instance::new(&self.entry, &instance));

        let handle = instance.handle();
        self.instances.borrow_mut().insert(
            handle,
            InstanceFns {
                instance,
                surface,
                debug_report,
            },
        );
        Ok(handle)
    }

    fn destroy_instance(&self, instance: vk::Instance) {
        match self.instances.borrow_mut().remove(&instance) {
            Some(fns) => unsafe { fns.instance.destroy_instance(None) },
            None => warn!("destroy of unknown instance {instance:?}"),
        }
    }

    fn create_debug_report(
        &self,
        instance: vk::Instance,
        user_data: *mut c_void,
    ) -> Result<vk::DebugReportCallbackEXT, vk::Result> {
        self.with_instance(instance, |fns| {
            let loader = fns
                .debug_report
                .as_ref()
                .ok_or(vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
            let info = vk::DebugReportCallbackCreateInfoEXT::default()
                .flags(vk::DebugReportFlagsEXT::ERROR | vk::DebugReportFlagsEXT::WARNING)
                .pfn_callback(Some(debug_report_callback))
                .user_data(user_data);
            // Debug report is superseded by debug utils, and ash marks it deprecated.
            #[allow(deprecated)]
            let callback = unsafe { loader.create_debug_report_callback(&info, None) };
            callback
        })
    }

    fn destroy_debug_report(&self, instance: vk::Instance, callback: vk::DebugReportCallbackEXT) {
        let result = self.with_instance(instance, |fns| {
            let loader = fns
                .debug_report
                .as_ref()
                .ok_or(vk::Result::ERROR_EXTENSION_NOT_PRESENT)?;
            #[allow(deprecated)]
            unsafe {
                loader.destroy_debug_report_callback(callback, None)
            };
            Ok(())
        });
        if let Err(e) = result {
            warn!("could not remove debug report: {e}");
        }
    }

    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
    ) -> Result<Vec<vk::PhysicalDevice>, vk::Result> {
        self.with_instance(instance, |fns| unsafe {
            fns.instance.enumerate_physical_devices()
        })
    }

    fn physical_device_snapshot(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<GpuSnapshot, vk::Result> {
        self.with_instance(instance, |fns| unsafe {
            Ok(GpuSnapshot {
                properties: fns.instance.get_physical_device_properties(physical_device),
                memory: fns
                    .instance
                    .get_physical_device_memory_properties(physical_device),
                features: fns.instance.get_physical_device_features(physical_device),
            })
        })
    }

    fn queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::QueueFamilyProperties>, vk::Result> {
        self.with_instance(instance, |fns| unsafe {
            Ok(fns
                .instance
                .get_physical_device_queue_family_properties(physical_device))
        })
    }

    fn surface_support(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::Result> {
        self.with_instance(instance, |fns| unsafe {
            fns.surface
                .get_physical_device_surface_support(physical_device, family_index, surface)
        })
    }

    fn create_surface(
        &self,
        instance: vk::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<vk::SurfaceKHR, vk::Result> {
        self.with_instance(instance, |fns| unsafe {
            ash_window::create_surface(&self.entry, &fns.instance, display, window, None)
        })
    }

    fn destroy_surface(&self, instance: vk::Instance, surface: vk::SurfaceKHR) {
        let result = self.with_instance(instance, |fns| {
            unsafe { fns.surface.destroy_surface(surface, None) };
            Ok(())
        });
        if let Err(e) = result {
            warn!("could not destroy surface: {e}");
        }
    }

    fn create_device(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc<'_>,
    ) -> Result<vk::Device, vk::Result> {
        let queue_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(desc.graphics_family)
            .queue_priorities(desc.queue_priorities)];
        let extension_ptrs: Vec<*const c_char> =
            desc.extensions.iter().map(|e| e.as_ptr()).collect();
        let device_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs);

        let device = self.with_instance(instance, |fns| unsafe {
            fns.instance
                .create_device(physical_device, &device_info, None)
        })?;
        debug!(
            "device created; graphics family {} present family {}",
            desc.graphics_family, desc.present_family
        );

        let handle = device.handle();
        self.devices.borrow_mut().insert(handle, device);
        Ok(handle)
    }

    fn device_wait_idle(&self, device: vk::Device) -> Result<(), vk::Result> {
        self.with_device(device, |fns| unsafe { fns.device_wait_idle() })
    }

    fn destroy_device(&self, device: vk::Device) {
        match self.devices.borrow_mut().remove(&device) {
            Some(fns) => unsafe { fns.destroy_device(None) },
            None => warn!("destroy of unknown device {device:?}"),
        }
    }

    fn create_semaphore(&self, device: vk::Device) -> Result<vk::Semaphore, vk::Result> {
        let info = vk::SemaphoreCreateInfo::default();
        self.with_device(device, |fns| unsafe { fns.create_semaphore(&info, None) })
    }

    fn destroy_semaphore(&self, device: vk::Device, semaphore: vk::Semaphore) {
        let result = self.with_device(device, |fns| {
            unsafe { fns.destroy_semaphore(semaphore, None) };
            Ok(())
        });
        if let Err(e) = result {
            warn!("could not destroy semaphore: {e}");
        }
    }
}
