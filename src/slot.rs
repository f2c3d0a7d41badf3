use core::mem::MaybeUninit;

/// Caller-owned storage for a value that the callee constructs in place.
///
/// Non-trivial C++ records are not returned through registers. The caller
/// reserves uninitialized storage, passes its address as a hidden
/// out-parameter, and the callee placement-constructs the return value
/// there:
///
/// - nothing is constructed in the slot before the call;
/// - only the callee initializes it;
/// - a slot that is never initialized is never read or dropped, since
///   `ReturnValueSlot` has no destructor of its own;
/// - taking the value out is exactly one move.
#[repr(transparent)]
pub struct ReturnValueSlot<T> {
    slot: MaybeUninit<T>,
}

impl<T> ReturnValueSlot<T> {
    pub fn new() -> Self {
        ReturnValueSlot {
            slot: MaybeUninit::uninit(),
        }
    }

    /// Address to hand to the callee.
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.slot.as_mut_ptr()
    }

    /// # Safety
    ///
    /// The callee must have initialized the slot.
    pub unsafe fn assume_init(self) -> T {
        // SAFETY: forwarded to the caller.
        unsafe { self.slot.assume_init() }
    }

    /// Runs `callee` against a fresh slot and takes the value it
    /// constructed.
    ///
    /// # Safety
    ///
    /// `callee` must initialize the pointee before returning normally. If it
    /// unwinds instead, the slot is discarded untouched.
    pub unsafe fn call(callee: impl FnOnce(*mut T)) -> T {
        let mut slot = ReturnValueSlot::new();
        callee(slot.as_mut_ptr());
        // SAFETY: forwarded to the caller.
        unsafe { slot.assume_init() }
    }
}
