// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Brings MYR up, creates the per-frame semaphores, and waits for the window to close.

use clap::Parser;
use log::{error, info};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard as kb,
    window::WindowId,
};

use myr::logging::{init_logging, LoggingConfig};
use myr::{FrameSync, Myr, MyrConfig, MyrError};
use pompeii::prelude::*;

#[derive(Parser, Debug)]
struct Args {
    /// Window title and application name reported to the driver
    #[arg(long, default_value = "Abyssal Drifter")]
    name: String,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Fail instead of falling back to family 0 when no queue family fits
    #[arg(long)]
    strict_present: bool,

    /// Skip the validation layer even in debug builds
    #[arg(long)]
    no_validation: bool,

    /// Log filter, `env_logger` syntax
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn config(&self) -> MyrConfig {
        let mut config = MyrConfig::new(&self.name, self.width, self.height).with_env();
        if self.no_validation {
            config = config.with_validation(false);
        }
        if self.strict_present {
            config = config.with_present_policy(PresentPolicy::Strict);
        }
        config
    }
}

struct App {
    config: MyrConfig,
    myr: Option<Myr>,
    sync: Option<FrameSync>,
    error: Option<MyrError>,
}

impl App {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), MyrError> {
        let myr = Myr::with_config(event_loop, &self.config)?;
        let sync = match myr.frame_sync() {
            Ok(sync) => sync,
            Err(e) => {
                myr.destroy();
                return Err(e.into());
            }
        };

        info!(
            "instance {:?} gpu {:?} surface {:?} device {:?}",
            myr.backend_instance(),
            myr.backend_gpu(),
            myr.backend_surface(),
            myr.backend_device()
        );
        self.sync = Some(sync);
        self.myr = Some(myr);
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(myr) = self.myr.take() {
            if let Some(mut sync) = self.sync.take() {
                sync.destroy(myr.backend());
            }
            myr.destroy();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.myr.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            error!("{e}");
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(myr) = self.myr.as_mut() else {
            return;
        };

        if let WindowEvent::KeyboardInput { event: key, .. } = &event {
            if !key.repeat && key.state == ElementState::Pressed {
                match key.physical_key {
                    kb::PhysicalKey::Code(kb::KeyCode::KeyQ)
                    | kb::PhysicalKey::Code(kb::KeyCode::Escape) => myr.request_close(),
                    _ => {}
                }
            }
        }
        myr.handle_window_event(&event);

        if myr.should_close() {
            self.shutdown();
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

fn main() -> Result<(), MyrError> {
    let args = Args::parse();
    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..Default::default()
    });

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);
    let mut app = App {
        config: args.config(),
        myr: None,
        sync: None,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
