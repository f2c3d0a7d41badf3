//! Rust halves of the special member functions of a Rust type exported to
//! C++.
//!
//! The generated C++ class forwards its default constructor, copy
//! constructor, copy assignment, move constructor, move assignment and
//! destructor to `extern "C"` thunks, and each thunk is a one-line call into
//! this module.
//!
//! The assignment helpers compare addresses before touching either operand.
//! C++ permits `x = x`, but handing `&mut *this` and `&*other` to Rust when
//! both point at the same object would create aliasing mutable and shared
//! references, so a self-assignment returns without calling `clone_from` or
//! moving anything.

use core::mem;
use core::ptr;

/// Placement-constructs `T::default()` at `this`.
///
/// # Safety
///
/// `this` must be valid for writes and properly aligned. Any previous value
/// at `this` is overwritten without being dropped.
pub unsafe fn default_construct<T: Default>(this: *mut T) {
    // SAFETY: forwarded to the caller.
    unsafe { this.write(T::default()) }
}

/// Placement-constructs a clone of `*other` at `this`.
///
/// # Safety
///
/// `this` must be valid for writes and `other` must point to a live `T`.
/// The two must not overlap.
pub unsafe fn clone_construct<T: Clone>(this: *mut T, other: *const T) {
    // SAFETY: forwarded to the caller.
    unsafe { this.write((*other).clone()) }
}

/// `*this = (*other).clone()` through `Clone::clone_from`, skipped entirely
/// when `this` and `other` are the same object.
///
/// # Safety
///
/// Both pointers must point to live `T`s.
pub unsafe fn clone_assign<T: Clone>(this: *mut T, other: *const T) {
    if ptr::eq(this, other) {
        return;
    }
    // SAFETY: distinct live objects, so the references do not alias.
    unsafe { (*this).clone_from(&*other) }
}

/// Move construction for types without trivial relocation on the C++ side.
///
/// The value is taken out of `*other` and a `T::default()` husk is left in
/// its place, so the C++ destructor that later runs on `other` observes a
/// well-formed value.
///
/// # Safety
///
/// `this` must be valid for writes and `other` must point to a live `T`.
/// The two must not overlap.
pub unsafe fn move_construct<T: Default>(this: *mut T, other: *mut T) {
    // SAFETY: forwarded to the caller.
    unsafe { this.write(mem::take(&mut *other)) }
}

/// Move assignment: `*this` receives the value of `*other`, and `*other` is
/// left holding `T::default()`. Skipped entirely when `this` and `other` are
/// the same object.
///
/// # Safety
///
/// Both pointers must point to live `T`s.
pub unsafe fn move_assign<T: Default>(this: *mut T, other: *mut T) {
    if ptr::eq(this, other) {
        return;
    }
    // SAFETY: distinct live objects. The old `*this` is dropped here.
    unsafe { *this = mem::take(&mut *other) }
}

/// Runs the destructor of the value at `this`. For an enum only the fields
/// of the currently active variant are dropped.
///
/// # Safety
///
/// `this` must point to a live `T` that is not used again afterwards.
pub unsafe fn drop_in_place<T>(this: *mut T) {
    // SAFETY: forwarded to the caller.
    unsafe { ptr::drop_in_place(this) }
}
