//! C ABI for the edgecv frame filter.
//!
//! The application layer hands over a pointer to its RGBA pixels for the
//! duration of one call. The pixels are copied before processing and the
//! pointer is not kept after the call returns. Every entry point returns a
//! status code (or null) instead of unwinding across the boundary.

use std::ffi::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

use edgecv::{Error, FrameDims};
use tracing::warn;

pub const EDGECV_OK: c_int = 0;
pub const EDGECV_ERR_INVALID_ARGUMENT: c_int = -1;
pub const EDGECV_ERR_ALLOCATION: c_int = -2;
pub const EDGECV_ERR_PANIC: c_int = -3;

fn status_of(err: &Error) -> c_int {
    match err {
        Error::InvalidArgument(_) | Error::Config(_) => EDGECV_ERR_INVALID_ARGUMENT,
        Error::AllocationFailure(_) => EDGECV_ERR_ALLOCATION,
    }
}

/// Runs `f`, turning errors and panics into status codes.
fn guarded<T>(op: &'static str, f: impl FnOnce() -> edgecv::Result<T>) -> Result<T, c_int> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            warn!(op, error = %err, "edgecv call rejected");
            Err(status_of(&err))
        }
        Err(_) => {
            warn!(op, "panic contained at FFI boundary");
            Err(EDGECV_ERR_PANIC)
        }
    }
}

unsafe fn input_slice<'a>(input: *const u8, input_len: usize) -> edgecv::Result<&'a [u8]> {
    if input.is_null() {
        return Err(Error::invalid_argument("input pointer is null"));
    }
    Ok(slice::from_raw_parts(input, input_len))
}

/// Detects edges in an RGBA frame, writing `width * height` bytes into `output`.
///
/// Returns `EDGECV_OK` on success. `output` is left untouched on failure.
///
/// # Safety
///
/// - `input` must be valid for reads of `input_len` bytes.
/// - `output` must be valid for writes of `output_len` bytes and must not
///   overlap `input`.
/// - Both buffers must stay alive and unmodified by other threads for the
///   duration of the call.
#[no_mangle]
pub unsafe extern "C" fn edgecv_process_frame(
    input: *const u8,
    input_len: usize,
    width: c_int,
    height: c_int,
    output: *mut u8,
    output_len: usize,
) -> c_int {
    let result = guarded("edgecv_process_frame", || {
        let input = input_slice(input, input_len)?;
        if output.is_null() {
            return Err(Error::invalid_argument("output pointer is null"));
        }
        let dims = FrameDims::from_signed(width, height)?;
        if output_len != dims.pixel_count() {
            return Err(Error::invalid_argument(format!(
                "output buffer needs {} bytes, got {output_len}",
                dims.pixel_count()
            )));
        }
        let edges = edgecv::process_frame(input, width, height)?;
        let output = slice::from_raw_parts_mut(output, output_len);
        output.copy_from_slice(&edges);
        Ok(())
    });
    match result {
        Ok(()) => EDGECV_OK,
        Err(code) => code,
    }
}

/// Detects edges in an RGBA frame and returns a newly allocated edge map.
///
/// On success the map length is stored in `out_len` and the buffer must be
/// released with [`edgecv_buffer_free`]. On failure null is returned and
/// `out_len` is set to 0.
///
/// # Safety
///
/// - `input` must be valid for reads of `input_len` bytes.
/// - `out_len` must be a valid, non-null pointer to a writable `usize`.
#[no_mangle]
pub unsafe extern "C" fn edgecv_process_frame_alloc(
    input: *const u8,
    input_len: usize,
    width: c_int,
    height: c_int,
    out_len: *mut usize,
) -> *mut u8 {
    if out_len.is_null() {
        warn!(op = "edgecv_process_frame_alloc", "out_len pointer is null");
        return ptr::null_mut();
    }
    *out_len = 0;
    let result = guarded("edgecv_process_frame_alloc", || {
        let input = input_slice(input, input_len)?;
        edgecv::process_frame(input, width, height)
    });
    match result {
        Ok(edges) => {
            let boxed = edges.into_boxed_slice();
            *out_len = boxed.len();
            Box::into_raw(boxed) as *mut u8
        }
        Err(_) => ptr::null_mut(),
    }
}

/// Releases a buffer returned by [`edgecv_process_frame_alloc`].
///
/// # Safety
///
/// - `buffer` must be null (a no-op) or a pointer returned by
///   `edgecv_process_frame_alloc` together with the length it reported.
/// - The buffer must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn edgecv_buffer_free(buffer: *mut u8, len: usize) {
    if buffer.is_null() {
        return;
    }
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(buffer, len)));
}

/// Static, NUL-terminated description of a status code.
#[no_mangle]
pub extern "C" fn edgecv_status_message(code: c_int) -> *const c_char {
    let msg = match code {
        EDGECV_OK => c"ok",
        EDGECV_ERR_INVALID_ARGUMENT => c"invalid argument",
        EDGECV_ERR_ALLOCATION => c"allocation failure",
        EDGECV_ERR_PANIC => c"internal panic",
        _ => c"unknown status",
    };
    msg.as_ptr()
}

/// Configures the global worker pool. `0` defers to `EDGECV_CPU_THREADS` or
/// the Rayon default. Only the first call has an effect.
#[no_mangle]
pub extern "C" fn edgecv_init_thread_pool(num_threads: c_int) -> c_int {
    let result = guarded("edgecv_init_thread_pool", || {
        let requested = match num_threads {
            0 => None,
            n if n < 0 => {
                return Err(Error::invalid_argument(format!(
                    "thread count must not be negative, got {n}"
                )))
            }
            n => Some(n as usize),
        };
        edgecv::init_thread_pool(requested)
    });
    match result {
        Ok(()) => EDGECV_OK,
        Err(code) => code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    fn step_frame(w: usize, h: usize, split: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(w * h * 4);
        for _ in 0..h {
            for x in 0..w {
                let v = if x < split { 0 } else { 255 };
                buf.extend_from_slice(&[v, v, v, 255]);
            }
        }
        buf
    }

    #[test]
    fn process_into_caller_buffer() {
        let input = step_frame(8, 8, 4);
        let mut output = vec![7u8; 64];
        let status = unsafe {
            edgecv_process_frame(input.as_ptr(), input.len(), 8, 8, output.as_mut_ptr(), 64)
        };
        assert_eq!(status, EDGECV_OK);
        assert!(output.iter().all(|&v| v == 0 || v == 255));
        assert_eq!(output[3], 255);
        assert_eq!(output[4], 0);
    }

    #[test]
    fn bad_lengths_and_nulls_are_rejected() {
        let input = vec![0u8; 10];
        let mut output = vec![7u8; 4];
        let status = unsafe {
            edgecv_process_frame(input.as_ptr(), input.len(), 2, 2, output.as_mut_ptr(), 4)
        };
        assert_eq!(status, EDGECV_ERR_INVALID_ARGUMENT);
        assert_eq!(output, vec![7u8; 4]);

        let input = vec![0u8; 16];
        let status = unsafe {
            edgecv_process_frame(input.as_ptr(), 16, 2, 2, output.as_mut_ptr(), 3)
        };
        assert_eq!(status, EDGECV_ERR_INVALID_ARGUMENT);

        let status = unsafe { edgecv_process_frame(ptr::null(), 16, 2, 2, output.as_mut_ptr(), 4) };
        assert_eq!(status, EDGECV_ERR_INVALID_ARGUMENT);

        let status =
            unsafe { edgecv_process_frame(input.as_ptr(), 16, 2, 2, ptr::null_mut(), 4) };
        assert_eq!(status, EDGECV_ERR_INVALID_ARGUMENT);

        let status = unsafe { edgecv_process_frame(input.as_ptr(), 16, 0, 2, output.as_mut_ptr(), 0) };
        assert_eq!(status, EDGECV_ERR_INVALID_ARGUMENT);
    }

    #[test]
    fn alloc_and_free_round_trip() {
        let input = step_frame(6, 5, 3);
        let mut len = usize::MAX;
        let buf = unsafe { edgecv_process_frame_alloc(input.as_ptr(), input.len(), 6, 5, &mut len) };
        assert!(!buf.is_null());
        assert_eq!(len, 30);
        let edges = unsafe { slice::from_raw_parts(buf, len) }.to_vec();
        unsafe { edgecv_buffer_free(buf, len) };
        assert!(edges.iter().any(|&v| v == 255));
    }

    #[test]
    fn alloc_failure_returns_null() {
        let input = vec![0u8; 10];
        let mut len = usize::MAX;
        let buf = unsafe { edgecv_process_frame_alloc(input.as_ptr(), input.len(), 2, 2, &mut len) };
        assert!(buf.is_null());
        assert_eq!(len, 0);
        unsafe { edgecv_buffer_free(ptr::null_mut(), 0) };
    }

    #[test]
    fn status_messages() {
        let msg = unsafe { CStr::from_ptr(edgecv_status_message(EDGECV_ERR_INVALID_ARGUMENT)) };
        assert_eq!(msg.to_str().unwrap(), "invalid argument");
        let msg = unsafe { CStr::from_ptr(edgecv_status_message(42)) };
        assert_eq!(msg.to_str().unwrap(), "unknown status");
    }

    #[test]
    fn negative_thread_count_is_rejected() {
        assert_eq!(edgecv_init_thread_pool(-1), EDGECV_ERR_INVALID_ARGUMENT);
    }
}
