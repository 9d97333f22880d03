// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MYR opens a window and brings up everything Vulkan needs before the first frame can be drawn
//! into it: instance, GPU, surface, queue families and logical device.
//!
//! Swapchains, render passes, pipelines and command recording are left to the application, which
//! works directly against the raw handles `Myr` exposes.  `Myr::backend` hands out the `ash`
//! function tables for those calls.
//!
//! A `Myr` is torn down with `Myr::destroy`, after the application has destroyed everything it
//! created from the device.

pub mod config;
pub mod frame;
pub mod logging;

use ash::vk;
use log::info;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use pompeii::prelude::*;

pub use config::MyrConfig;
pub use frame::FrameSync;

/// Engine name reported to the driver.
pub const ENGINE_NAME: &str = "MYR";

#[derive(thiserror::Error, Debug)]
pub enum MyrError {
    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("window handle: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error(transparent)]
    Vulkan(#[from] VulkanError),
}

/// A window and the Vulkan objects drawing into it.
///
/// Not torn down on drop.  Call `destroy`.
pub struct Myr<B: Backend = AshBackend, W = Window> {
    context: VkContext,
    backend: B,
    close_requested: bool,
    // Last, so that it outlives the surface however `Myr` goes away.
    window: W,
}

impl Myr {
    /// Open a non-resizable `width` by `height` window titled `app_name` and bring Vulkan up for
    /// it.  Validation follows the build profile unless `MYR_VALIDATION` says otherwise.
    pub fn new(
        event_loop: &ActiveEventLoop,
        app_name: &str,
        width: u32,
        height: u32,
    ) -> Result<Self, MyrError> {
        let config = MyrConfig::new(app_name, width, height).with_env();
        Self::with_config(event_loop, &config)
    }

    pub fn with_config(event_loop: &ActiveEventLoop, config: &MyrConfig) -> Result<Self, MyrError> {
        let ctx = &config.context;
        let attrs = Window::default_attributes()
            .with_title(ctx.app_name.as_str())
            .with_inner_size(LogicalSize::new(ctx.width, ctx.height))
            .with_resizable(config.resizable);
        let window = event_loop.create_window(attrs)?;

        let backend = AshBackend::load()?;
        Myr::with_backend(backend, window, ctx)
    }
}

impl<B, W> Myr<B, W>
where
    B: Backend,
    W: HasDisplayHandle + HasWindowHandle,
{
    /// Bring Vulkan up through `backend` for an already open `window`.  On failure nothing
    /// created through `backend` is left alive.
    pub fn with_backend(backend: B, window: W, config: &ContextConfig) -> Result<Self, MyrError> {
        let display = window.display_handle()?.as_raw();
        let raw_window = window.window_handle()?.as_raw();
        let context = VkContext::new(&backend, config, display, raw_window)?;

        info!(
            "{} up on {} (graphics family {}, present family {})",
            config.engine_name,
            context.gpu().name(),
            context.queue_selection().graphics,
            context.queue_selection().present
        );

        Ok(Myr {
            context,
            backend,
            close_requested: false,
            window,
        })
    }

    /// Tear down device, surface and instance, then close the window.  Returns the backend, which
    /// has nothing left alive in it.
    pub fn destroy(self) -> B {
        let Myr {
            context,
            backend,
            window,
            ..
        } = self;
        context.destroy(&backend);
        drop(window);
        info!("{ENGINE_NAME} down");
        backend
    }

    /// Whether the window has been asked to close.
    pub fn should_close(&self) -> bool {
        self.close_requested
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Track close requests for this window.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        if closes(event) {
            self.close_requested = true;
        }
    }

    /// The image-available and render-finished semaphores for one frame in flight.
    pub fn frame_sync(&self) -> Result<FrameSync, VulkanError> {
        FrameSync::new(&self.backend, self.context.device())
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn context(&self) -> &VkContext {
        &self.context
    }

    pub fn backend_instance(&self) -> vk::Instance {
        self.context.instance().handle()
    }

    pub fn backend_gpu(&self) -> vk::PhysicalDevice {
        self.context.gpu().handle()
    }

    pub fn backend_surface(&self) -> vk::SurfaceKHR {
        self.context.surface().handle()
    }

    pub fn backend_device(&self) -> vk::Device {
        self.context.device().handle()
    }

    pub fn queue_selection(&self) -> QueueSelection {
        self.context.queue_selection()
    }
}

fn closes(event: &WindowEvent) -> bool {
    matches!(event, WindowEvent::CloseRequested | WindowEvent::Destroyed)
}
