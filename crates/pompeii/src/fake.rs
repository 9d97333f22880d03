// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Fake
//!
//! An in-memory `Backend`.  GPUs, queue families, layers and extensions are whatever the test
//! says they are, and any call can be made to fail with a chosen `vk::Result`.
//!
//! Every object handed out is tracked together with the object that owns it.  Destroying an object
//! while something it owns is still alive, or destroying a handle that is not alive, is recorded as
//! a violation rather than a panic so tests can assert on either outcome.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::ffi::{c_char, c_void, CStr};

use ash::vk::{self, Handle};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle,
    RawWindowHandle, WindowHandle, XlibDisplayHandle, XlibWindowHandle,
};

use crate::backend::{Backend, DeviceDesc, GpuSnapshot, InstanceDesc};
use crate::debug::debug_report_callback;

// Physical devices are not created or destroyed, so they live outside the minted range.
const GPU_HANDLE_BASE: u64 = 0x1000_0000;

/// Backend calls that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Call {
    AvailableLayers,
    AvailableExtensions,
    SurfaceExtensions,
    CreateInstance,
    CreateDebugReport,
    EnumerateGpus,
    GpuSnapshot,
    QueueFamilies,
    SurfaceSupport,
    CreateSurface,
    CreateDevice,
    WaitIdle,
    CreateSemaphore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Instance,
    DebugReport,
    Surface,
    Device,
    Semaphore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Created(Kind, u64),
    WaitIdle(u64),
    Destroyed(Kind, u64),
}

#[derive(Clone, Debug)]
pub struct FakeFamily {
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
    /// Answer to every present support query against this family.
    pub present: bool,
}

impl FakeFamily {
    pub fn new(flags: vk::QueueFlags, present: bool) -> Self {
        Self {
            flags,
            queue_count: 1,
            present,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FakeGpu {
    pub name: String,
    pub kind: vk::PhysicalDeviceType,
    pub max_viewport: [u32; 2],
    pub max_image_dimension_2d: u32,
    pub families: Vec<FakeFamily>,
}

impl FakeGpu {
    /// A discrete GPU with one family that can do everything, presentation included.
    pub fn new(name: &str, max_viewport: [u32; 2]) -> Self {
        Self {
            name: name.to_string(),
            kind: vk::PhysicalDeviceType::DISCRETE_GPU,
            max_viewport,
            max_image_dimension_2d: 16384,
            families: vec![FakeFamily::new(
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                true,
            )],
        }
    }

    pub fn kind(mut self, kind: vk::PhysicalDeviceType) -> Self {
        self.kind = kind;
        self
    }

    pub fn families(mut self, families: Vec<FakeFamily>) -> Self {
        self.families = families;
        self
    }
}

/// The last instance creation request, as the backend saw it.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceRequest {
    pub app_name: String,
    pub engine_name: String,
    pub api_version: u32,
    pub layers: Vec<String>,
    pub extensions: Vec<String>,
}

/// The last device creation request, as the backend saw it.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceRequest {
    pub graphics_family: u32,
    pub present_family: u32,
    pub queue_priorities: Vec<f32>,
    pub extensions: Vec<String>,
}

struct Live {
    kind: Kind,
    owner: Option<u64>,
}

struct Failure {
    // Calls that still succeed before the failure kicks in.
    skip: usize,
    result: vk::Result,
}

struct Callback {
    handle: u64,
    user_data: *mut c_void,
}

#[derive(Default)]
struct State {
    next_handle: u64,
    gpus: Vec<FakeGpu>,
    layers: Vec<String>,
    extensions: Vec<String>,
    failures: HashMap<Call, Failure>,
    live: HashMap<u64, Live>,
    events: Vec<Event>,
    violations: Vec<String>,
    callbacks: Vec<Callback>,
    instance_request: Option<InstanceRequest>,
    device_request: Option<DeviceRequest>,
}

/// Clones share one set of objects, so a test can keep a handle on a backend it gave away.
#[derive(Clone)]
pub struct FakeBackend {
    state: Rc<RefCell<State>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// One capable GPU, the validation layer, and the surface and debug report extensions.
    pub fn new() -> Self {
        Self::empty()
            .with_gpu(FakeGpu::new("Fake Discrete", [16384, 16384]))
            .with_layers(&[crate::VALIDATION_LAYER])
            .with_extensions(&[
                "VK_KHR_surface",
                "VK_KHR_xlib_surface",
                crate::DEBUG_REPORT_EXTENSION,
            ])
    }

    /// No GPUs, no layers, no extensions.
    pub fn empty() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::default())),
        }
    }

    pub fn with_gpu(self, gpu: FakeGpu) -> Self {
        self.state.borrow_mut().gpus.push(gpu);
        self
    }

    pub fn without_gpus(self) -> Self {
        self.state.borrow_mut().gpus.clear();
        self
    }

    pub fn with_layers(self, layers: &[&str]) -> Self {
        self.state.borrow_mut().layers = layers.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_extensions(self, extensions: &[&str]) -> Self {
        self.state.borrow_mut().extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Make every subsequent `call` fail with `result`.
    pub fn fail(&self, call: Call, result: vk::Result) {
        self.fail_after(call, 0, result);
    }

    /// Let `skip` more `call`s succeed, then fail every one after with `result`.
    pub fn fail_after(&self, call: Call, skip: usize, result: vk::Result) {
        self.state
            .borrow_mut()
            .failures
            .insert(call, Failure { skip, result });
    }

    pub fn succeed(&self, call: Call) {
        self.state.borrow_mut().failures.remove(&call);
    }

    /// Change what the backend reports for a GPU from now on.
    pub fn set_max_viewport(&self, gpu: usize, max_viewport: [u32; 2]) {
        self.state.borrow_mut().gpus[gpu].max_viewport = max_viewport;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn violations(&self) -> Vec<String> {
        self.state.borrow().violations.clone()
    }

    /// Number of objects created and not yet destroyed.
    pub fn live(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Number of destroy calls made for objects of `kind`.
    pub fn destroyed(&self, kind: Kind) -> usize {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Destroyed(k, _) if *k == kind))
            .count()
    }

    pub fn instance_request(&self) -> Option<InstanceRequest> {
        self.state.borrow().instance_request.clone()
    }

    pub fn device_request(&self) -> Option<DeviceRequest> {
        self.state.borrow().device_request.clone()
    }

    /// Deliver a report to every installed debug report callback.  Returns how many received it.
    pub fn emit(
        &self,
        flags: vk::DebugReportFlagsEXT,
        code: i32,
        layer: &CStr,
        message: &CStr,
    ) -> usize {
        // Copied out so the callback can run without the state borrowed.
        let targets: Vec<*mut c_void> = self
            .state
            .borrow()
            .callbacks
            .iter()
            .map(|c| c.user_data)
            .collect();
        for user_data in &targets {
            unsafe {
                debug_report_callback(
                    flags,
                    vk::DebugReportObjectTypeEXT::UNKNOWN,
                    0,
                    0,
                    code,
                    layer.as_ptr(),
                    message.as_ptr(),
                    *user_data,
                );
            }
        }
        targets.len()
    }

    fn check(&self, call: Call) -> Result<(), vk::Result> {
        match self.state.borrow_mut().failures.get_mut(&call) {
            Some(failure) if failure.skip > 0 => {
                failure.skip -= 1;
                Ok(())
            }
            Some(failure) => Err(failure.result),
            None => Ok(()),
        }
    }

    fn require(&self, kind: Kind, raw: u64) -> Result<(), vk::Result> {
        match self.state.borrow().live.get(&raw) {
            Some(live) if live.kind == kind => Ok(()),
            _ => Err(vk::Result::ERROR_INITIALIZATION_FAILED),
        }
    }

    fn mint(&self, kind: Kind, owner: Option<u64>) -> u64 {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let raw = state.next_handle;
        state.live.insert(raw, Live { kind, owner });
        state.events.push(Event::Created(kind, raw));
        raw
    }

    fn retire(&self, kind: Kind, raw: u64) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.events.push(Event::Destroyed(kind, raw));
        match state.live.get(&raw) {
            Some(live) if live.kind == kind => {}
            Some(live) => {
                let msg = format!("destroyed {raw:#x} as {kind:?} but it is a {:?}", live.kind);
                state.violations.push(msg);
                return;
            }
            None => {
                let msg = format!("destroyed {kind:?} {raw:#x} which is not alive");
                state.violations.push(msg);
                return;
            }
        }

        let mut dependents: Vec<(u64, Kind)> = state
            .live
            .iter()
            .filter(|(_, live)| live.owner == Some(raw))
            .map(|(handle, live)| (*handle, live.kind))
            .collect();
        dependents.sort_by_key(|(handle, _)| *handle);
        for (handle, child) in dependents {
            let msg = format!("destroyed {kind:?} {raw:#x} while {child:?} {handle:#x} is alive");
            state.violations.push(msg);
        }
        state.live.remove(&raw);
    }

    fn gpu(&self, physical_device: vk::PhysicalDevice) -> Result<FakeGpu, vk::Result> {
        let index = physical_device
            .as_raw()
            .checked_sub(GPU_HANDLE_BASE)
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        self.state
            .borrow()
            .gpus
            .get(index as usize)
            .cloned()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }
}

/// Stand-in window handles for creating surfaces against the fake.
pub fn window_handles() -> (RawDisplayHandle, RawWindowHandle) {
    (
        RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0)),
        RawWindowHandle::Xlib(XlibWindowHandle::new(1)),
    )
}

/// A window that only exists as the handles from [`window_handles`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FakeWindow;

impl HasDisplayHandle for FakeWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        // The fake never dereferences the handle.
        Ok(unsafe { DisplayHandle::borrow_raw(window_handles().0) })
    }
}

impl HasWindowHandle for FakeWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        Ok(unsafe { WindowHandle::borrow_raw(window_handles().1) })
    }
}

impl Backend for FakeBackend {
    fn available_layers(&self) -> Result<Vec<String>, vk::Result> {
        self.check(Call::AvailableLayers)?;
        Ok(self.state.borrow().layers.clone())
    }

    fn available_extensions(&self) -> Result<Vec<String>, vk::Result> {
        self.check(Call::AvailableExtensions)?;
        Ok(self.state.borrow().extensions.clone())
    }

    fn surface_extensions(&self, _display: RawDisplayHandle) -> Result<Vec<String>, vk::Result> {
        self.check(Call::SurfaceExtensions)?;
        Ok(vec![
            "VK_KHR_surface".to_string(),
            "VK_KHR_xlib_surface".to_string(),
        ])
    }

    fn create_instance(&self, desc: &InstanceDesc<'_>) -> Result<vk::Instance, vk::Result> {
        self.check(Call::CreateInstance)?;
        self.state.borrow_mut().instance_request = Some(InstanceRequest {
            app_name: desc.app_name.to_string(),
            engine_name: desc.engine_name.to_string(),
            api_version: desc.api_version,
            layers: desc.layers.to_vec(),
            extensions: desc.extensions.to_vec(),
        });
        Ok(vk::Instance::from_raw(self.mint(Kind::Instance, None)))
    }

    fn destroy_instance(&self, instance: vk::Instance) {
        self.retire(Kind::Instance, instance.as_raw());
    }

    fn create_debug_report(
        &self,
        instance: vk::Instance,
        user_data: *mut c_void,
    ) -> Result<vk::DebugReportCallbackEXT, vk::Result> {
        self.check(Call::CreateDebugReport)?;
        self.require(Kind::Instance, instance.as_raw())?;
        let handle = self.mint(Kind::DebugReport, Some(instance.as_raw()));
        self.state
            .borrow_mut()
            .callbacks
            .push(Callback { handle, user_data });
        Ok(vk::DebugReportCallbackEXT::from_raw(handle))
    }

    fn destroy_debug_report(&self, _instance: vk::Instance, callback: vk::DebugReportCallbackEXT) {
        let raw = callback.as_raw();
        self.state.borrow_mut().callbacks.retain(|c| c.handle != raw);
        self.retire(Kind::DebugReport, raw);
    }

    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
    ) -> Result<Vec<vk::PhysicalDevice>, vk::Result> {
        self.check(Call::EnumerateGpus)?;
        self.require(Kind::Instance, instance.as_raw())?;
        let count = self.state.borrow().gpus.len() as u64;
        Ok((0..count)
            .map(|i| vk::PhysicalDevice::from_raw(GPU_HANDLE_BASE + i))
            .collect())
    }

    fn physical_device_snapshot(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<GpuSnapshot, vk::Result> {
        self.check(Call::GpuSnapshot)?;
        let gpu = self.gpu(physical_device)?;

        let mut properties = vk::PhysicalDeviceProperties {
            api_version: vk::API_VERSION_1_3,
            driver_version: vk::make_api_version(0, 535, 104, 5),
            device_type: gpu.kind,
            ..Default::default()
        };
        properties.limits.max_image_dimension2_d = gpu.max_image_dimension_2d;
        properties.limits.max_viewports = 16;
        properties.limits.max_viewport_dimensions = gpu.max_viewport;
        let name = gpu.name.bytes().take(vk::MAX_PHYSICAL_DEVICE_NAME_SIZE - 1);
        for (dst, src) in properties.device_name.iter_mut().zip(name) {
            *dst = src as c_char;
        }

        let mut memory = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: 1,
            memory_heap_count: 1,
            ..Default::default()
        };
        memory.memory_heaps[0].size = 8 << 30;
        memory.memory_heaps[0].flags = vk::MemoryHeapFlags::DEVICE_LOCAL;

        let features = vk::PhysicalDeviceFeatures {
            geometry_shader: vk::TRUE,
            ..Default::default()
        };

        Ok(GpuSnapshot {
            properties,
            memory,
            features,
        })
    }

    fn queue_family_properties(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::QueueFamilyProperties>, vk::Result> {
        self.check(Call::QueueFamilies)?;
        let gpu = self.gpu(physical_device)?;
        Ok(gpu
            .families
            .iter()
            .map(|f| vk::QueueFamilyProperties {
                queue_flags: f.flags,
                queue_count: f.queue_count,
                ..Default::default()
            })
            .collect())
    }

    fn surface_support(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        family_index: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, vk::Result> {
        self.check(Call::SurfaceSupport)?;
        self.require(Kind::Surface, surface.as_raw())?;
        let gpu = self.gpu(physical_device)?;
        Ok(gpu
            .families
            .get(family_index as usize)
            .is_some_and(|f| f.present))
    }

    fn create_surface(
        &self,
        instance: vk::Instance,
        _display: RawDisplayHandle,
        _window: RawWindowHandle,
    ) -> Result<vk::SurfaceKHR, vk::Result> {
        self.check(Call::CreateSurface)?;
        self.require(Kind::Instance, instance.as_raw())?;
        Ok(vk::SurfaceKHR::from_raw(
            self.mint(Kind::Surface, Some(instance.as_raw())),
        ))
    }

    fn destroy_surface(&self, _instance: vk::Instance, surface: vk::SurfaceKHR) {
        self.retire(Kind::Surface, surface.as_raw());
    }

    fn create_device(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        desc: &DeviceDesc<'_>,
    ) -> Result<vk::Device, vk::Result> {
        self.check(Call::CreateDevice)?;
        self.require(Kind::Instance, instance.as_raw())?;
        self.gpu(physical_device)?;
        self.state.borrow_mut().device_request = Some(DeviceRequest {
            graphics_family: desc.graphics_family,
            present_family: desc.present_family,
            queue_priorities: desc.queue_priorities.to_vec(),
            extensions: desc
                .extensions
                .iter()
                .map(|e| e.to_string_lossy().into_owned())
                .collect(),
        });
        Ok(vk::Device::from_raw(
            self.mint(Kind::Device, Some(instance.as_raw())),
        ))
    }

    fn device_wait_idle(&self, device: vk::Device) -> Result<(), vk::Result> {
        self.require(Kind::Device, device.as_raw())?;
        self.state
            .borrow_mut()
            .events
            .push(Event::WaitIdle(device.as_raw()));
        self.check(Call::WaitIdle)
    }

    fn destroy_device(&self, device: vk::Device) {
        self.retire(Kind::Device, device.as_raw());
    }

    fn create_semaphore(&self, device: vk::Device) -> Result<vk::Semaphore, vk::Result> {
        self.check(Call::CreateSemaphore)?;
        self.require(Kind::Device, device.as_raw())?;
        Ok(vk::Semaphore::from_raw(
            self.mint(Kind::Semaphore, Some(device.as_raw())),
        ))
    }

    fn destroy_semaphore(&self, _device: vk::Device, semaphore: vk::Semaphore) {
        self.retire(Kind::Semaphore, semaphore.as_raw());
    }
}
