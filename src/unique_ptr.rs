use core::fmt::{self, Debug};
use core::marker::PhantomData;
use core::mem;
use core::ops::Deref;
use core::pin::Pin;

/// A C++ type that can be freed with `delete` through a generated thunk.
///
/// # Safety
///
/// `delete` must destroy and deallocate an object that was allocated by
/// C++ `new`, exactly like `std::default_delete<Self>`.
pub unsafe trait CppDelete {
    /// C++ spelling of the type, used in panic messages.
    const TYPENAME: &'static str;

    /// # Safety
    ///
    /// `ptr` must be non-null and own its pointee.
    unsafe fn delete(ptr: *mut Self);
}

/// Binding to C++ `std::unique_ptr<T>`.
///
/// The pointee was allocated by C++ and is freed by C++: dropping a
/// `UniquePtr` calls [`CppDelete::delete`] rather than the Rust allocator.
#[repr(transparent)]
pub struct UniquePtr<T>
where
    T: CppDelete,
{
    ptr: *mut T,
    ty: PhantomData<T>,
}

impl<T> UniquePtr<T>
where
    T: CppDelete,
{
    /// Matches the behavior of default-constructing a std::unique\_ptr.
    pub fn null() -> Self {
        UniquePtr {
            ptr: core::ptr::null_mut(),
            ty: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    pub fn as_ref(&self) -> Option<&T> {
        // SAFETY: a non-null pointer is owned by us and points to a live T.
        unsafe { self.ptr.as_ref() }
    }

    /// C++ objects may be self-referential, so mutable access is pinned.
    pub fn as_mut(&mut self) -> Option<Pin<&mut T>> {
        // SAFETY: as in `as_ref`, and the pointee never moves while owned.
        unsafe { self.ptr.as_mut().map(|target| Pin::new_unchecked(target)) }
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }

    /// Matches the behavior of [std::unique_ptr\<T\>::release](https://en.cppreference.com/w/cpp/memory/unique_ptr/release).
    pub fn into_raw(self) -> *mut T {
        let ptr = self.ptr;
        mem::forget(self);
        ptr
    }

    /// # Safety
    ///
    /// `raw` must be null or own an object allocated by C++ `new`, and
    /// nothing else may free it.
    pub unsafe fn from_raw(raw: *mut T) -> Self {
        UniquePtr {
            ptr: raw,
            ty: PhantomData,
        }
    }
}

unsafe impl<T> Send for UniquePtr<T> where T: Send + CppDelete {}
unsafe impl<T> Sync for UniquePtr<T> where T: Sync + CppDelete {}

impl<T> Unpin for UniquePtr<T> where T: CppDelete {}

impl<T> Drop for UniquePtr<T>
where
    T: CppDelete,
{
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // SAFETY: we own the non-null pointee.
            unsafe { T::delete(self.ptr) }
        }
    }
}

impl<T> Deref for UniquePtr<T>
where
    T: CppDelete,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self.as_ref() {
            Some(target) => target,
            None => panic!("called deref on a null UniquePtr<{}>", T::TYPENAME),
        }
    }
}

impl<T> Debug for UniquePtr<T>
where
    T: Debug + CppDelete,
{
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self.as_ref() {
            None => formatter.write_str("nullptr"),
            Some(value) => Debug::fmt(value, formatter),
        }
    }
}
