// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Debug
//!
//! Debug report messages from the loader and layers.
//!
//! The callback handed to Vulkan is a free function.  Its user data is a pointer to the
//! `Arc<dyn DiagnosticSink>` boxed inside the owning `Instance`, so each instance reports to its
//! own sink and nothing here is global.

use std::ffi::{c_char, c_void, CStr};
use std::sync::Arc;

use ash::vk;
use log::{log, Level};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Unknown,
}

impl From<vk::DebugReportFlagsEXT> for Severity {
    fn from(flags: vk::DebugReportFlagsEXT) -> Self {
        if flags.contains(vk::DebugReportFlagsEXT::ERROR) {
            Severity::Error
        } else if flags.contains(vk::DebugReportFlagsEXT::WARNING) {
            Severity::Warning
        } else {
            Severity::Unknown
        }
    }
}

/// One report from the loader or a layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: i32,
    pub layer: String,
    pub message: String,
}

pub trait DiagnosticSink {
    fn diagnostic(&self, diagnostic: &Diagnostic);
}

/// Writes each report as a leveled log line.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn diagnostic(&self, d: &Diagnostic) {
        let (level, line) = log_line(d);
        log!(level, "{line}");
    }
}

/// The level and text `LogSink` writes for a report.
pub fn log_line(d: &Diagnostic) -> (Level, String) {
    match d.severity {
        Severity::Error => (
            Level::Error,
            format!("[VK DBG ERR {}] {} on layer {}", d.code, d.message, d.layer),
        ),
        Severity::Warning => (
            Level::Warn,
            format!("[VK DBG WARN {}] {} on layer {}", d.code, d.message, d.layer),
        ),
        Severity::Unknown => (
            Level::Info,
            format!("[VK DBG UNK] unknown debug message {} (layer {})", d.code, d.layer),
        ),
    }
}

/// Installed by every backend as the `pfn_callback` of the debug report.
///
/// # Safety
///
/// `user_data` must point at a live `Arc<dyn DiagnosticSink>`.  The string pointers must be null
/// or valid NUL terminated strings for the duration of the call.
pub unsafe extern "system" fn debug_report_callback(
    flags: vk::DebugReportFlagsEXT,
    _object_type: vk::DebugReportObjectTypeEXT,
    _object: u64,
    _location: usize,
    message_code: i32,
    p_layer_prefix: *const c_char,
    p_message: *const c_char,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if user_data.is_null() {
        return vk::FALSE;
    }
    let diagnostic = Diagnostic {
        severity: Severity::from(flags),
        code: message_code,
        layer: unsafe { lossy(p_layer_prefix) },
        message: unsafe { lossy(p_message) },
    };
    let sink = unsafe { &*(user_data as *const Arc<dyn DiagnosticSink>) };
    sink.diagnostic(&diagnostic);

    // Never abort the call that triggered the report.
    vk::FALSE
}

unsafe fn lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}
