//! Per-Call Exception Channel
//!
//! Every entry point takes a caller-allocated [`ExceptionHandler`] slot.
//! [`call`] clears it, runs the body, and on failure writes a message and
//! returns the failure value of the result type. A null message after the
//! call means the result is valid.
//!
//! ```text
//! Cleared ──call──► Running ──Ok──► Cleared  (value returned)
//!                      │
//!                      └──Err / panic──► Set (failure value returned)
//! ```

use std::any::Any;
use std::ffi::{CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use libc::c_char;
use tracing::{error, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::{into_c_string, ExceptionHandler};

/// Delivered when the real message cannot be encoded
const FALLBACK_MESSAGE: &CStr = c"call failed";

/// Value returned when a call fails. The caller must check the slot before
/// trusting it.
pub trait FailureValue {
    fn failure() -> Self;
}

impl<T> FailureValue for *mut T {
    fn failure() -> Self {
        ptr::null_mut()
    }
}

impl<T> FailureValue for *const T {
    fn failure() -> Self {
        ptr::null()
    }
}

impl FailureValue for u64 {
    fn failure() -> Self {
        0
    }
}

impl FailureValue for u32 {
    fn failure() -> Self {
        0
    }
}

impl FailureValue for i32 {
    fn failure() -> Self {
        0
    }
}

impl FailureValue for i64 {
    fn failure() -> Self {
        0
    }
}

impl FailureValue for bool {
    fn failure() -> Self {
        false
    }
}

impl FailureValue for () {
    fn failure() -> Self {}
}

/// Observable state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No message: the last call succeeded or none ran yet
    Cleared,
    /// A message is present: the last call failed
    Set,
}

impl ChannelState {
    /// Inspect a slot
    ///
    /// # Safety
    /// `handler` must be null or point to a valid slot.
    pub unsafe fn of(handler: *const ExceptionHandler) -> Self {
        if handler.is_null() || unsafe { (*handler).message.is_null() } {
            ChannelState::Cleared
        } else {
            ChannelState::Set
        }
    }
}

/// Run `body` behind the exception channel.
///
/// Panics are caught and reported like errors; nothing unwinds past this
/// function. A null `handler` still runs the body, but failures can only be
/// logged.
///
/// # Safety
/// `handler` must be null or point to a slot that stays valid for the call.
pub unsafe fn call<T, F>(handler: *mut ExceptionHandler, body: F) -> T
where
    T: FailureValue,
    F: FnOnce() -> BridgeResult<T>,
{
    unsafe { clear(handler) };
    let outcome = match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(%message, "panic caught at boundary");
            Err(BridgeError::Panic(message))
        }
    };
    match outcome {
        Ok(value) => value,
        Err(err) => {
            unsafe { report(handler, &err) };
            T::failure()
        }
    }
}

/// Clear a slot. A message left by an earlier call belongs to the caller and
/// is not freed here.
unsafe fn clear(handler: *mut ExceptionHandler) {
    if handler.is_null() {
        return;
    }
    // SAFETY: non-null slots are caller-allocated and valid for the call
    unsafe {
        (*handler).message = ptr::null_mut();
    }
}

/// Write `err` into the slot, or log it when there is no slot
unsafe fn report(handler: *mut ExceptionHandler, err: &BridgeError) {
    let message = message_text(err);
    warn!(kind = err.kind(), %message, "call failed");
    if handler.is_null() {
        warn!("no exception handler supplied, failure not delivered");
        return;
    }
    let encoded = encode_message(&message);
    // SAFETY: see `clear`
    unsafe {
        (*handler).message = encoded;
    }
}

/// Caller-owned copy of `message`, never null
fn encode_message(message: &str) -> *mut c_char {
    match into_c_string(message) {
        Ok(ptr) => ptr,
        Err(err) => {
            error!(%err, "failure message not encodable, sending fallback");
            CString::from(FALLBACK_MESSAGE).into_raw()
        }
    }
}

/// Non-empty, NUL-free text for the caller
fn message_text(err: &BridgeError) -> String {
    let text: String = err.to_string().chars().filter(|&c| c != '\0').collect();
    if text.trim().is_empty() {
        err.kind().to_string()
    } else {
        text
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
