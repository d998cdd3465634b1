//! C ABI for native hosts
//!
//! ```c
//! int  screenrec_initialize(void);
//! int  screenrec_record_screen(const char *path, double duration, char **error_out);
//! void screenrec_cancel_active(void);
//! void screenrec_free_string(char *ptr);
//! ```
//!
//! `screenrec_record_screen` returns the raw [`StatusCode`]. When it fails it
//! stores a message in `*error_out` that the caller frees with
//! `screenrec_free_string`, exactly once.

use crate::api;
use crate::utils::error::{ErrorMessage, StatusCode};
use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

/// Returns 0 on success and -1 on failure
#[no_mangle]
pub extern "C" fn screenrec_initialize() -> c_int {
    match panic::catch_unwind(api::initialize) {
        Ok(StatusCode::Ok) => 0,
        _ => -1,
    }
}

/// Record the screen to `path` for `duration` seconds. Blocks.
///
/// # Safety
///
/// `path` must be null or a valid NUL-terminated string. `error_out` must be
/// null or point to writable storage for one pointer.
#[no_mangle]
pub unsafe extern "C" fn screenrec_record_screen(
    path: *const c_char,
    duration: f64,
    error_out: *mut *mut c_char,
) -> c_int {
    if !error_out.is_null() {
        *error_out = ptr::null_mut();
    }

    let path = if path.is_null() {
        String::new()
    } else {
        match CStr::from_ptr(path).to_str() {
            Ok(path) => path.to_string(),
            Err(_) => {
                let message = ErrorMessage::new("output path is not valid UTF-8");
                store_message(error_out, message);
                return StatusCode::InvalidPath.as_raw();
            }
        }
    };

    let result = panic::catch_unwind(AssertUnwindSafe(|| api::start_recording(&path, duration)));
    let (status, message) = match result {
        Ok(outcome) => outcome,
        Err(_) => (
            StatusCode::EngineFailure,
            Some(ErrorMessage::new("recording panicked")),
        ),
    };

    if let Some(message) = message {
        store_message(error_out, message);
    }
    status.as_raw()
}

/// Stop the active recording, if any
#[no_mangle]
pub extern "C" fn screenrec_cancel_active() {
    let _ = panic::catch_unwind(api::cancel_active);
}

/// Free a string returned through `error_out`. Null is ignored.
///
/// # Safety
///
/// `ptr` must be null or a pointer produced by this library that has not
/// been freed yet.
#[no_mangle]
pub unsafe extern "C" fn screenrec_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    drop(CString::from_raw(ptr));
}

unsafe fn store_message(error_out: *mut *mut c_char, message: ErrorMessage) {
    if error_out.is_null() {
        return;
    }
    let text = message.into_string().replace('\0', " ");
    match CString::new(text) {
        Ok(text) => *error_out = text.into_raw(),
        Err(e) => tracing::warn!("Dropping unrepresentable error message: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_null_is_noop() {
        unsafe { screenrec_free_string(ptr::null_mut()) };
    }

    #[test]
    fn test_record_before_initialize_returns_message() {
        let path = CString::new("/tmp/screenrec-ffi.mp4").unwrap();
        let mut error: *mut c_char = ptr::null_mut();

        let code = unsafe { screenrec_record_screen(path.as_ptr(), 1.0, &mut error) };

        assert_eq!(code, StatusCode::NotInitialized.as_raw());
        assert!(!error.is_null());
        let text = unsafe { CStr::from_ptr(error) }.to_str().unwrap().to_string();
        assert!(text.contains("not initialized"));
        unsafe { screenrec_free_string(error) };
    }

    #[test]
    fn test_cancel_without_recording_is_noop() {
        screenrec_cancel_active();
    }
}
