use crate::unique_ptr::{CppDelete, UniquePtr};

/// Ownership-transferring counterpart of [`CrubitAbi`](crate::CrubitAbi).
///
/// Owning handles cannot be copied into a byte buffer and reconstructed on
/// the other side, because that would leave two owners behind. Instead the
/// sending side releases ownership into a raw representation and the
/// receiving side adopts it, with exactly one owner at every point.
///
/// # Safety
///
/// `transfer_in(transfer_out(x))` must reconstruct `x` without running any
/// destructor, and `Raw` must have the same ABI as the C++ representation
/// the generated thunk declares.
pub unsafe trait TransferAbi: Sized {
    /// FFI-safe representation while ownership is in flight.
    type Raw: Copy;

    fn transfer_out(self) -> Self::Raw;

    /// # Safety
    ///
    /// `raw` must have come from `transfer_out` of the same type, on either
    /// side of the boundary, and must not be adopted twice.
    unsafe fn transfer_in(raw: Self::Raw) -> Self;
}

// SAFETY: `std::unique_ptr<T>` crosses as the pointer returned by
// `release()` and is adopted with the pointer constructor.
unsafe impl<T> TransferAbi for UniquePtr<T>
where
    T: CppDelete,
{
    type Raw = *mut T;

    fn transfer_out(self) -> *mut T {
        self.into_raw()
    }

    unsafe fn transfer_in(raw: *mut T) -> Self {
        // SAFETY: forwarded to the caller.
        unsafe { UniquePtr::from_raw(raw) }
    }
}

pub fn transfer_out<T: TransferAbi>(value: T) -> T::Raw {
    value.transfer_out()
}

/// # Safety
///
/// See [`TransferAbi::transfer_in`].
pub unsafe fn transfer_in<T: TransferAbi>(raw: T::Raw) -> T {
    // SAFETY: forwarded to the caller.
    unsafe { T::transfer_in(raw) }
}
