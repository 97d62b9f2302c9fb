// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wall-clock microsecond timestamps.
//!
//! Events carry wall-clock time, not monotonic time: clock monotonicity is
//! not required here, and the reference implementation uses
//! `gettimeofday`.

/// Returns the current wall-clock time as signed microseconds since the
/// Unix epoch (`seconds * 1_000_000 + microseconds`).
pub fn now_us() -> i64 {
    let mut tv = libc::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    // SAFETY: `gettimeofday` with a valid local out-pointer and a null
    // timezone pointer has no further preconditions.
    unsafe {
        libc::gettimeofday(&mut tv, std::ptr::null_mut());
    }
    (tv.tv_sec as i64) * 1_000_000 + (tv.tv_usec as i64)
}
