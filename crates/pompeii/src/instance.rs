// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Instance
//!
//! The connection to the Vulkan loader.  Everything else is created against an instance and must be
//! destroyed before it.
//!
//! Layers and extensions passed in are wishes.  Each is checked against what the loader offers and
//! dropped with a warning when it is missing, so a machine without the validation layer installed
//! still runs.  Only a failure to ask the loader at all is fatal.

use std::ffi::c_void;
use std::sync::Arc;

use ash::vk;
use log::{error, info, warn};

use crate::backend::InstanceDesc;
use crate::debug::{DiagnosticSink, LogSink};
use crate::prelude::*;

const APP_VERSION: u32 = vk::make_api_version(0, 1, 0, 0);
const ENGINE_VERSION: u32 = vk::make_api_version(0, 0, 0, 1);
const API_VERSION: u32 = vk::API_VERSION_1_1;

pub struct Instance {
    instance: vk::Instance,
    debug_report: Option<vk::DebugReportCallbackEXT>,
    // Boxed so the address handed to the debug report stays put when `Instance` moves.
    sink: Box<Arc<dyn DiagnosticSink>>,
    layers: Vec<String>,
    extensions: Vec<String>,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("instance", &self.instance)
            .field("debug_report", &self.debug_report)
            .field("layers", &self.layers)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl Instance {
    /// Connect, reporting layer diagnostics to the log.
    pub fn new<B: Backend>(
        backend: &B,
        app_name: &str,
        engine_name: &str,
        layers: &[&str],
        extensions: &[&str],
    ) -> Result<Self, VulkanError> {
        Self::with_sink(
            backend,
            app_name,
            engine_name,
            layers,
            extensions,
            Arc::new(LogSink),
        )
    }

    /// Connect, reporting layer diagnostics to `sink`.
    pub fn with_sink<B: Backend>(
        backend: &B,
        app_name: &str,
        engine_name: &str,
        layers: &[&str],
        extensions: &[&str],
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, VulkanError> {
        let layers = negotiate(layers, "layer", || {
            backend
                .available_layers()
                .map_err(|r| VulkanError::ConnectionCreate("could not get layers", r))
        })?;
        let extensions = negotiate(extensions, "extension", || {
            backend.available_extensions().map_err(|r| {
                VulkanError::ConnectionCreate("could not get instance extensions", r)
            })
        })?;

        let desc = InstanceDesc {
            app_name,
            engine_name,
            app_version: APP_VERSION,
            engine_version: ENGINE_VERSION,
            api_version: API_VERSION,
            layers: &layers,
            extensions: &extensions,
        };
        let instance = backend
            .create_instance(&desc)
            .map_err(|r| VulkanError::ConnectionCreate("could not create instance", r))?;
        info!("instance created; layers: {layers:?} exts: {extensions:?}");

        let mut instance = Instance {
            instance,
            debug_report: None,
            sink: Box::new(sink),
            layers,
            extensions,
        };

        if instance.has_extension(crate::DEBUG_REPORT_EXTENSION) {
            let user_data = &*instance.sink as *const Arc<dyn DiagnosticSink> as *mut c_void;
            match backend.create_debug_report(instance.instance, user_data) {
                Ok(callback) => instance.debug_report = Some(callback),
                Err(r) => error!("{}", VulkanError::DiagnosticRegistration(r)),
            }
        }

        Ok(instance)
    }

    pub fn handle(&self) -> vk::Instance {
        self.instance
    }

    /// Layers the instance was created with.
    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    /// Extensions the instance was created with.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e == name)
    }

    /// Whether layer diagnostics are being delivered to the sink.
    pub fn diagnostics_enabled(&self) -> bool {
        self.debug_report.is_some()
    }

    /// Snapshot every physical device, in loader order.
    pub fn enumerate_gpus<B: Backend>(&self, backend: &B) -> Result<Vec<Gpu>, VulkanError> {
        let devices = backend
            .enumerate_physical_devices(self.instance)
            .map_err(|r| VulkanError::GpuEnumeration("could not enumerate gpus", r))?;
        if devices.is_empty() {
            return Err(VulkanError::NoGpus);
        }

        devices
            .into_iter()
            .map(|pd| {
                let snapshot = backend
                    .physical_device_snapshot(self.instance, pd)
                    .map_err(|r| VulkanError::GpuEnumeration("could not query gpu", r))?;
                Ok(Gpu::new(self.instance, pd, snapshot))
            })
            .collect()
    }

    /// Removes the debug report, then the instance.  Safe to call more than once.
    pub fn destroy<B: Backend>(&mut self, backend: &B) {
        if self.instance == vk::Instance::null() {
            return;
        }
        if let Some(callback) = self.debug_report.take() {
            backend.destroy_debug_report(self.instance, callback);
        }
        backend.destroy_instance(self.instance);
        self.instance = vk::Instance::null();
    }
}

/// Keep the wanted names the loader offers.  The loader is not asked when nothing is wanted.
fn negotiate<F>(wanted: &[&str], what: &str, available: F) -> Result<Vec<String>, VulkanError>
where
    F: FnOnce() -> Result<Vec<String>, VulkanError>,
{
    if wanted.is_empty() {
        return Ok(Vec::new());
    }
    let available = available()?;

    let mut kept = Vec::with_capacity(wanted.len());
    for name in wanted {
        if available.iter().any(|a| a == name) {
            if !kept.iter().any(|k: &String| k == name) {
                kept.push(name.to_string());
            }
        } else {
            warn!("missing {what} {name}");
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use super::*;
    use crate::debug::{Diagnostic, Severity};
    use crate::fake::{Call, FakeBackend, FakeGpu, Kind};

    #[derive(Default)]
    struct Collect(Mutex<Vec<Diagnostic>>);

    impl DiagnosticSink for Collect {
        fn diagnostic(&self, d: &Diagnostic) {
            self.0.lock().unwrap().push(d.clone());
        }
    }

    #[test]
    fn test_missing_names_are_skipped() {
        let backend = FakeBackend::new();
        let mut instance = Instance::new(
            &backend,
            "negotiate",
            "test",
            &["VK_LAYER_KHRONOS_validation", "VK_LAYER_nonexistent"],
            &["VK_KHR_surface", "VK_KHR_nonexistent"],
        )
        .unwrap();

        assert_eq!(instance.layers(), ["VK_LAYER_KHRONOS_validation"]);
        assert_eq!(instance.extensions(), ["VK_KHR_surface"]);
        let request = backend.instance_request().unwrap();
        assert_eq!(request.layers, instance.layers());
        assert_eq!(request.extensions, instance.extensions());
        assert_eq!(request.app_name, "negotiate");
        assert_eq!(request.api_version, vk::API_VERSION_1_1);
        instance.destroy(&backend);
    }

    #[test]
    fn test_empty_request_skips_query() {
        let backend = FakeBackend::new();
        backend.fail(Call::AvailableLayers, vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        backend.fail(Call::AvailableExtensions, vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        let mut instance = Instance::new(&backend, "empty", "test", &[], &[]).unwrap();
        assert!(instance.layers().is_empty());
        assert!(!instance.diagnostics_enabled());
        instance.destroy(&backend);
    }

    #[test]
    fn test_query_failure_is_fatal() {
        let backend = FakeBackend::new();
        backend.fail(Call::AvailableLayers, vk::Result::ERROR_OUT_OF_HOST_MEMORY);
        match Instance::new(&backend, "fatal", "test", &["VK_LAYER_KHRONOS_validation"], &[]) {
            Err(VulkanError::ConnectionCreate(what, code)) => {
                assert_eq!(what, "could not get layers");
                assert_eq!(code, vk::Result::ERROR_OUT_OF_HOST_MEMORY);
            }
            other => panic!("unexpected {other:?}"),
        }

        backend.succeed(Call::AvailableLayers);
        backend.fail(Call::CreateInstance, vk::Result::ERROR_INCOMPATIBLE_DRIVER);
        let err = Instance::new(&backend, "fatal", "test", &[], &[]).unwrap_err();
        assert_eq!(err.code(), Some(vk::Result::ERROR_INCOMPATIBLE_DRIVER));
        assert_eq!(backend.live(), 0);
    }

    #[test]
    fn test_debug_report_only_when_available() {
        let backend = FakeBackend::new().with_extensions(&["VK_KHR_surface"]);
        let mut instance = Instance::new(
            &backend,
            "debug",
            "test",
            &[],
            &[crate::DEBUG_REPORT_EXTENSION],
        )
        .unwrap();
        assert!(!instance.diagnostics_enabled());
        instance.destroy(&backend);
        assert_eq!(backend.destroyed(Kind::DebugReport), 0);

        let backend = FakeBackend::new();
        let mut instance = Instance::new(
            &backend,
            "debug",
            "test",
            &[],
            &[crate::DEBUG_REPORT_EXTENSION],
        )
        .unwrap();
        assert!(instance.diagnostics_enabled());
        instance.destroy(&backend);
        assert_eq!(backend.destroyed(Kind::DebugReport), 1);
        assert!(backend.violations().is_empty());
    }

    #[test]
    fn test_debug_report_failure_is_not_fatal() {
        let backend = FakeBackend::new();
        backend.fail(Call::CreateDebugReport, vk::Result::ERROR_EXTENSION_NOT_PRESENT);
        let mut instance = Instance::new(
            &backend,
            "debug",
            "test",
            &[],
            &[crate::DEBUG_REPORT_EXTENSION],
        )
        .unwrap();
        assert!(!instance.diagnostics_enabled());
        assert_ne!(instance.handle(), vk::Instance::null());
        instance.destroy(&backend);
        assert_eq!(backend.live(), 0);
    }

    #[test]
    fn test_reports_reach_sink() {
        let backend = FakeBackend::new();
        let collect = Arc::new(Collect::default());
        let instance = Instance::with_sink(
            &backend,
            "sink",
            "test",
            &[],
            &[crate::DEBUG_REPORT_EXTENSION],
            collect.clone(),
        )
        .unwrap();

        // Moving the instance must not move what the callback points at.
        let mut moved = Box::new(instance);
        let delivered = backend.emit(
            vk::DebugReportFlagsEXT::WARNING,
            3,
            c"VK_LAYER_KHRONOS_validation",
            c"image layout mismatch",
        );
        assert_eq!(delivered, 1);
        {
            let seen = collect.0.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].severity, Severity::Warning);
            assert_eq!(seen[0].message, "image layout mismatch");
        }

        moved.destroy(&backend);
        assert_eq!(
            backend.emit(vk::DebugReportFlagsEXT::ERROR, 0, c"", c""),
            0
        );
    }

    #[test]
    fn test_enumerate_gpus() {
        let backend = FakeBackend::new()
            .with_gpu(FakeGpu::new("second", [4096, 4096]))
            .with_gpu(FakeGpu::new("third", [2048, 2048]));
        let mut instance = Instance::new(&backend, "gpus", "test", &[], &[]).unwrap();

        let gpus = instance.enumerate_gpus(&backend).unwrap();
        assert_eq!(gpus.len(), 3);
        assert_eq!(gpus[1].name(), "second");
        assert!(gpus.iter().all(|g| g.instance() == instance.handle()));

        // Snapshots do not follow the backend.
        backend.set_max_viewport(2, [16, 16]);
        assert_eq!(gpus[2].limits().max_viewport_dimensions, [2048, 2048]);
        let again = instance.enumerate_gpus(&backend).unwrap();
        assert_eq!(again[2].limits().max_viewport_dimensions, [16, 16]);
        instance.destroy(&backend);
    }

    #[test]
    fn test_enumerate_without_gpus() {
        let backend = FakeBackend::new().without_gpus();
        let mut instance = Instance::new(&backend, "gpus", "test", &[], &[]).unwrap();
        assert!(matches!(
            instance.enumerate_gpus(&backend),
            Err(VulkanError::NoGpus)
        ));

        backend.fail(Call::EnumerateGpus, vk::Result::ERROR_INITIALIZATION_FAILED);
        assert!(matches!(
            instance.enumerate_gpus(&backend),
            Err(VulkanError::GpuEnumeration("could not enumerate gpus", _))
        ));
        instance.destroy(&backend);
    }

    #[test]
    fn test_destroy_twice() {
        let backend = FakeBackend::new();
        let mut instance = Instance::new(
            &backend,
            "twice",
            "test",
            &[],
            &[crate::DEBUG_REPORT_EXTENSION],
        )
        .unwrap();
        instance.destroy(&backend);
        instance.destroy(&backend);
        assert_eq!(backend.destroyed(Kind::Instance), 1);
        assert_eq!(backend.destroyed(Kind::DebugReport), 1);
        assert!(backend.violations().is_empty());
    }
}
