//! Runtime support for bindings produced by `crubit-gen`.
//!
//! <br>
//!
//! Generated Rust code links against this crate for the pieces of the
//! C++ ⇄ Rust contract that cannot be expressed as plain `extern "C"`
//! declarations:
//!
//! - the **bridging codec** ([`CrubitAbi`], [`Encoder`], [`Decoder`]) used
//!   for values whose C++ and Rust layouts differ, such as `std::optional<T>`
//!   versus `Option<T>`;
//! - **ownership transfer** of heap values ([`TransferAbi`]), which moves a
//!   C++ `std::unique_ptr<T>` across the boundary as a released pointer and
//!   adopts it as a [`UniquePtr`] instead of copying bytes;
//! - the **return value slot** ([`ReturnValueSlot`]) through which a callee
//!   constructs a non-trivial return value directly in caller-owned storage;
//! - the **special member helpers** ([`special`]) which the Rust half of a
//!   C++-facing class calls to implement copy assignment, move construction
//!   and destruction, including the mandatory self-assignment guard.
//!
//! The matching C++ half is `include/crubit/support.h`, which every
//! generated C++ file includes.

#![no_std]
#![doc(html_root_url = "https://docs.rs/crubit/0.1.0")]
#![deny(improper_ctypes, unsafe_op_in_unsafe_fn)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_safety_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_doctest_main,
    clippy::new_without_default
)]

pub mod bridge;
mod slot;
pub mod special;
mod transfer;
mod unique_ptr;

pub use crate::bridge::{ByBridge, ByTransmute, CrubitAbi, Decoder, Encoder};
pub use crate::slot::ReturnValueSlot;
pub use crate::transfer::TransferAbi;
pub use crate::unique_ptr::{CppDelete, UniquePtr};

// Not public API. Used by generated code.
#[doc(hidden)]
pub mod private {
    pub use crate::bridge::internal::{decode, empty_buffer, encode};
    pub use crate::special::{
        clone_assign, clone_construct, default_construct, drop_in_place, move_assign,
        move_construct,
    };
    pub use crate::transfer::{transfer_in, transfer_out};
}
