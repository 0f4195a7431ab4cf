//! Facades over host-provided CLAP extensions.
//!
//! A [`HostHandle`] wraps the host pointer an instance was created with.
//! Host extensions are looked up once, during the plugin's `init` call (the
//! earliest point the CLAP contract allows), and cached as raw pointers;
//! every facade call after that is a straight function-pointer dispatch
//! that quietly no-ops when the host lacks the extension.

use clap_sys::ext::latency::{clap_host_latency, CLAP_EXT_LATENCY};
use clap_sys::ext::log::{
    clap_host_log, clap_log_severity, CLAP_EXT_LOG, CLAP_LOG_DEBUG, CLAP_LOG_ERROR,
    CLAP_LOG_FATAL, CLAP_LOG_HOST_MISBEHAVING, CLAP_LOG_INFO, CLAP_LOG_PLUGIN_MISBEHAVING,
    CLAP_LOG_WARNING,
};
use clap_sys::ext::tail::{clap_host_tail, CLAP_EXT_TAIL};
use clap_sys::ext::thread_check::{clap_host_thread_check, CLAP_EXT_THREAD_CHECK};
use clap_sys::ext::timer_support::{clap_host_timer_support, CLAP_EXT_TIMER_SUPPORT};
use clap_sys::ext::track_info::{clap_host_track_info, clap_track_info, CLAP_EXT_TRACK_INFO};
use clap_sys::ext::draft::transport_control::{
    clap_host_transport_control, CLAP_EXT_TRANSPORT_CONTROL,
};
use clap_sys::fixedpoint::CLAP_BEATTIME_FACTOR;
use clap_sys::host::clap_host;
use clap_sys::id::{clap_id, CLAP_INVALID_ID};
use gobridge_params::SyncPool;
use std::ffi::{CStr, CString};
use std::ptr::NonNull;
use std::sync::OnceLock;

use crate::util::data_from_array_buf;

/// Message severity for host logging.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogSeverity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
    HostMisbehaving,
    PluginMisbehaving,
}

impl LogSeverity {
    fn as_raw(self) -> clap_log_severity {
        match self {
            Self::Debug => CLAP_LOG_DEBUG,
            Self::Info => CLAP_LOG_INFO,
            Self::Warning => CLAP_LOG_WARNING,
            Self::Error => CLAP_LOG_ERROR,
            Self::Fatal => CLAP_LOG_FATAL,
            Self::HostMisbehaving => CLAP_LOG_HOST_MISBEHAVING,
            Self::PluginMisbehaving => CLAP_LOG_PLUGIN_MISBEHAVING,
        }
    }
}

const LOG_BUFFER_SIZE: usize = 4096;
const LOG_BUFFER_POOL_SIZE: usize = 4;

struct LogBuffer {
    bytes: [u8; LOG_BUFFER_SIZE],
}

fn log_buffers() -> &'static SyncPool<LogBuffer> {
    static POOL: OnceLock<SyncPool<LogBuffer>> = OnceLock::new();
    POOL.get_or_init(|| {
        SyncPool::new(LOG_BUFFER_POOL_SIZE, || LogBuffer {
            bytes: [0; LOG_BUFFER_SIZE],
        })
    })
}

/// The current hosting track's identity, as reported by the host.
#[derive(Debug, Clone, Default)]
pub struct TrackInfo {
    pub flags: u64,
    pub name: String,
    /// `(alpha, red, green, blue)`.
    pub color: (u8, u8, u8, u8),
    pub audio_channel_count: i32,
    pub audio_port_type: Option<String>,
}

/// A checked wrapper around the host pointer, plus the cached host-side
/// extension pointers.
pub struct HostHandle {
    raw: NonNull<clap_host>,
    log: Option<NonNull<clap_host_log>>,
    thread_check: Option<NonNull<clap_host_thread_check>>,
    latency: Option<NonNull<clap_host_latency>>,
    tail: Option<NonNull<clap_host_tail>>,
    timer: Option<NonNull<clap_host_timer_support>>,
    track_info: Option<NonNull<clap_host_track_info>>,
    transport: Option<NonNull<clap_host_transport_control>>,
}

impl HostHandle {
    /// # Safety
    ///
    /// `raw` must be a valid host pointer that outlives the handle.
    pub(crate) unsafe fn new(raw: *const clap_host) -> Option<Self> {
        Some(Self {
            raw: NonNull::new(raw as *mut clap_host)?,
            log: None,
            thread_check: None,
            latency: None,
            tail: None,
            timer: None,
            track_info: None,
            transport: None,
        })
    }

    /// Looks up every host extension the bridge cares about. Called once,
    /// from the plugin's `init` dispatcher.
    pub(crate) fn resolve_extensions(&mut self) {
        self.log = self.extension(CLAP_EXT_LOG);
        self.thread_check = self.extension(CLAP_EXT_THREAD_CHECK);
        self.latency = self.extension(CLAP_EXT_LATENCY);
        self.tail = self.extension(CLAP_EXT_TAIL);
        self.timer = self.extension(CLAP_EXT_TIMER_SUPPORT);
        self.track_info = self.extension(CLAP_EXT_TRACK_INFO);
        self.transport = self.extension(CLAP_EXT_TRANSPORT_CONTROL);
    }

    fn extension<T>(&self, id: &CStr) -> Option<NonNull<T>> {
        // SAFETY: the host pointer is valid per new().
        let host = unsafe { self.raw.as_ref() };
        let get_extension = host.get_extension?;
        // SAFETY: get_extension is a valid host callback; the returned
        // pointer, when non-null, is the extension struct for `id`.
        NonNull::new(unsafe { get_extension(host, id.as_ptr()) } as *mut T)
    }

    #[inline]
    pub(crate) fn as_raw(&self) -> *const clap_host {
        self.raw.as_ptr()
    }

    // --- Logging -----------------------------------------------------------

    /// Logs through the host, formatting into a pooled 4 KiB buffer.
    ///
    /// Messages that do not fit the pooled buffer (or arrive while the pool
    /// is drained) take a heap-allocated path; without a host log extension
    /// the message lands on stderr.
    pub fn log(&self, severity: LogSeverity, message: &str) {
        let Some(log_fn) = self
            .log
            // SAFETY: cached extension pointers stay valid for the host's life.
            .and_then(|ext| unsafe { ext.as_ref() }.log)
        else {
            eprintln!("[{severity:?}] {message}");
            return;
        };

        let bytes = message.as_bytes();
        if bytes.len() < LOG_BUFFER_SIZE {
            if let Some(mut buffer) = log_buffers().lease() {
                buffer.bytes[..bytes.len()].copy_from_slice(bytes);
                for byte in &mut buffer.bytes[..bytes.len()] {
                    if *byte == 0 {
                        *byte = b' ';
                    }
                }
                buffer.bytes[bytes.len()] = 0;
                // SAFETY: host pointer valid; buffer is NUL-terminated.
                unsafe {
                    log_fn(self.as_raw(), severity.as_raw(), buffer.bytes.as_ptr().cast())
                };
                return;
            }
        }

        if let Ok(message) = CString::new(message.replace('\0', " ")) {
            // SAFETY: host pointer valid; message is NUL-terminated.
            unsafe { log_fn(self.as_raw(), severity.as_raw(), message.as_ptr()) };
        }
    }

    pub fn log_error(&self, message: &str) {
        self.log(LogSeverity::Error, message);
    }

    pub fn log_warning(&self, message: &str) {
        self.log(LogSeverity::Warning, message);
    }

    // --- Thread check ------------------------------------------------------

    /// `None` when the host does not implement thread-check.
    pub fn is_main_thread(&self) -> Option<bool> {
        let ext = self.thread_check?;
        // SAFETY: cached extension pointer is valid.
        let is_main_thread = unsafe { ext.as_ref() }.is_main_thread?;
        // SAFETY: valid host callback.
        Some(unsafe { is_main_thread(self.as_raw()) })
    }

    pub fn is_audio_thread(&self) -> Option<bool> {
        let ext = self.thread_check?;
        // SAFETY: cached extension pointer is valid.
        let is_audio_thread = unsafe { ext.as_ref() }.is_audio_thread?;
        // SAFETY: valid host callback.
        Some(unsafe { is_audio_thread(self.as_raw()) })
    }

    #[inline]
    pub(crate) fn debug_assert_main_thread(&self) {
        debug_assert!(
            self.is_main_thread().unwrap_or(true),
            "main-thread operation called off the main thread"
        );
    }

    #[inline]
    pub(crate) fn debug_assert_audio_thread(&self) {
        debug_assert!(
            self.is_audio_thread().unwrap_or(true),
            "audio-thread operation called off the audio thread"
        );
    }

    // --- Latency / tail notifiers ------------------------------------------

    /// Tells the host the plugin's latency changed; it will re-query while
    /// the plugin is deactivated.
    pub fn latency_changed(&self) {
        if let Some(changed) =
            // SAFETY: cached extension pointer is valid.
            self.latency.and_then(|ext| unsafe { ext.as_ref() }.changed)
        {
            // SAFETY: valid host callback.
            unsafe { changed(self.as_raw()) };
        }
    }

    /// Tells the host the plugin's tail length changed.
    pub fn tail_changed(&self) {
        if let Some(changed) =
            // SAFETY: cached extension pointer is valid.
            self.tail.and_then(|ext| unsafe { ext.as_ref() }.changed)
        {
            // SAFETY: valid host callback.
            unsafe { changed(self.as_raw()) };
        }
    }

    // --- Timers ------------------------------------------------------------

    /// Registers a periodic timer; ticks arrive through the timer-support
    /// extension's `on_timer`.
    pub fn register_timer(&self, period_ms: u32) -> Option<clap_id> {
        let ext = self.timer?;
        // SAFETY: cached extension pointer is valid.
        let register = unsafe { ext.as_ref() }.register_timer?;

        let mut id: clap_id = CLAP_INVALID_ID;
        // SAFETY: valid host callback; id is a valid out-pointer.
        if unsafe { register(self.as_raw(), period_ms, &mut id) } && id != CLAP_INVALID_ID {
            Some(id)
        } else {
            None
        }
    }

    pub fn unregister_timer(&self, id: clap_id) -> bool {
        let Some(ext) = self.timer else { return false };
        // SAFETY: cached extension pointer is valid.
        let Some(unregister) = (unsafe { ext.as_ref() }.unregister_timer) else {
            return false;
        };
        // SAFETY: valid host callback.
        unsafe { unregister(self.as_raw(), id) }
    }

    // --- Track info --------------------------------------------------------

    /// Snapshot of the hosting track, if the host exposes one. Main-thread.
    pub fn track_info(&self) -> Option<TrackInfo> {
        let ext = self.track_info?;
        // SAFETY: cached extension pointer is valid.
        let get = unsafe { ext.as_ref() }.get?;

        let mut raw = clap_track_info {
            flags: 0,
            name: [0; clap_sys::string_sizes::CLAP_NAME_SIZE],
            color: clap_sys::color::clap_color {
                alpha: 0,
                red: 0,
                green: 0,
                blue: 0,
            },
            audio_channel_count: 0,
            audio_port_type: std::ptr::null(),
        };
        // SAFETY: valid host callback; raw is a valid out-struct.
        if !unsafe { get(self.as_raw(), &mut raw) } {
            return None;
        }

        Some(TrackInfo {
            flags: raw.flags,
            name: String::from_utf8_lossy(data_from_array_buf(&raw.name)).into_owned(),
            color: (
                raw.color.alpha,
                raw.color.red,
                raw.color.green,
                raw.color.blue,
            ),
            audio_channel_count: raw.audio_channel_count,
            audio_port_type: if raw.audio_port_type.is_null() {
                None
            } else {
                // SAFETY: non-null port type points at a NUL-terminated
                // string owned by the host for the duration of this call.
                Some(
                    unsafe { CStr::from_ptr(raw.audio_port_type) }
                        .to_string_lossy()
                        .into_owned(),
                )
            },
        })
    }

    // --- Transport control -------------------------------------------------

    pub fn request_transport_start(&self) {
        self.transport_call(|ext| ext.request_start);
    }

    pub fn request_transport_stop(&self) {
        self.transport_call(|ext| ext.request_stop);
    }

    pub fn request_transport_pause(&self) {
        self.transport_call(|ext| ext.request_pause);
    }

    pub fn request_transport_continue(&self) {
        self.transport_call(|ext| ext.request_continue);
    }

    /// Asks the host to jump the playhead to a position in beats.
    pub fn request_transport_jump(&self, beats: f64) {
        let Some(ext) = self.transport else { return };
        // SAFETY: cached extension pointer is valid.
        let Some(request_jump) = (unsafe { ext.as_ref() }.request_jump) else {
            return;
        };
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let position = (beats * CLAP_BEATTIME_FACTOR as f64) as i64;
        // SAFETY: valid host callback.
        unsafe { request_jump(self.as_raw(), position) };
    }

    fn transport_call(
        &self,
        select: impl FnOnce(
            &clap_host_transport_control,
        ) -> Option<unsafe extern "C" fn(*const clap_host)>,
    ) {
        if let Some(request) =
            // SAFETY: cached extension pointer is valid.
            self.transport.and_then(|ext| select(unsafe { ext.as_ref() }))
        {
            // SAFETY: valid host callback.
            unsafe { request(self.as_raw()) };
        }
    }

    // --- Core host requests ------------------------------------------------

    pub fn request_restart(&self) {
        // SAFETY: the host pointer is valid per new().
        let host = unsafe { self.raw.as_ref() };
        if let Some(request_restart) = host.request_restart {
            // SAFETY: valid host callback.
            unsafe { request_restart(self.as_raw()) };
        }
    }

    pub fn request_process(&self) {
        // SAFETY: the host pointer is valid per new().
        let host = unsafe { self.raw.as_ref() };
        if let Some(request_process) = host.request_process {
            // SAFETY: valid host callback.
            unsafe { request_process(self.as_raw()) };
        }
    }

    pub fn request_callback(&self) {
        // SAFETY: the host pointer is valid per new().
        let host = unsafe { self.raw.as_ref() };
        if let Some(request_callback) = host.request_callback {
            // SAFETY: valid host callback.
            unsafe { request_callback(self.as_raw()) };
        }
    }
}
