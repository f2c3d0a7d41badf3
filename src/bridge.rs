//! Byte-buffer codec for values whose C++ and Rust layouts disagree.
//!
//! A bridged value never crosses the boundary in its native layout. The
//! sending side encodes it into a buffer of `<T as CrubitAbi<S>>::SIZE`
//! bytes and the receiving side decodes it back out, with both sides
//! agreeing on the schema `S`. Schemas compose: `ByBridge<ByTransmute>` is
//! the schema of an `Option<T>` whose payload is copied bytewise, and
//! `ByBridge<(ByTransmute, ByBridge<ByTransmute>)>` is the schema of a pair
//! whose second element is itself an optional.

use core::marker::PhantomData;
use core::mem::{self, MaybeUninit};
use core::ptr;

/// Schema for values whose C++ and Rust layouts are identical. Encoding is
/// an unaligned bytewise copy.
pub struct ByTransmute;

/// Schema for values which are bridged component-wise. `S` carries the
/// schemas of the components.
pub struct ByBridge<S>(PhantomData<S>);

/// Write cursor over a caller-provided buffer.
pub struct Encoder {
    buf: *mut u8,
    pos: usize,
    capacity: usize,
}

/// Read cursor over a buffer previously filled by an [`Encoder`].
pub struct Decoder {
    buf: *const u8,
    pos: usize,
    capacity: usize,
}

impl Encoder {
    /// # Safety
    ///
    /// `buf` must be valid for writes of `capacity` bytes for as long as the
    /// encoder is in use.
    pub unsafe fn new(buf: *mut u8, capacity: usize) -> Self {
        Encoder {
            buf,
            pos: 0,
            capacity,
        }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Encodes `value` with schema `S`, advancing the cursor past it.
    pub fn encode<T: CrubitAbi<S>, S>(&mut self, value: T) {
        CrubitAbi::<S>::encode(value, self);
    }

    /// Shorthand for `encode::<T, ByTransmute>`.
    pub fn encode_transmute<T>(&mut self, value: T) {
        self.encode::<T, ByTransmute>(value);
    }

    fn reserve(&mut self, len: usize) -> *mut u8 {
        let end = self.pos.checked_add(len);
        assert!(
            end.is_some_and(|end| end <= self.capacity),
            "encoding past the end of a {}-byte bridge buffer",
            self.capacity,
        );
        // SAFETY: `pos + len <= capacity`, and the constructor's caller
        // guaranteed `capacity` writable bytes.
        let at = unsafe { self.buf.add(self.pos) };
        self.pos += len;
        at
    }
}

impl Decoder {
    /// # Safety
    ///
    /// `buf` must be valid for reads of `capacity` bytes for as long as the
    /// decoder is in use.
    pub unsafe fn new(buf: *const u8, capacity: usize) -> Self {
        Decoder {
            buf,
            pos: 0,
            capacity,
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Decodes a value with schema `S`, advancing the cursor past it.
    ///
    /// # Safety
    ///
    /// The bytes at the cursor must hold a `T` encoded with schema `S`.
    pub unsafe fn decode<T: CrubitAbi<S>, S>(&mut self) -> T {
        // SAFETY: forwarded to the caller.
        unsafe { <T as CrubitAbi<S>>::decode(self) }
    }

    /// Shorthand for `decode::<T, ByTransmute>`.
    ///
    /// # Safety
    ///
    /// The bytes at the cursor must hold a valid `T`.
    pub unsafe fn decode_transmute<T>(&mut self) -> T {
        // SAFETY: forwarded to the caller.
        unsafe { self.decode::<T, ByTransmute>() }
    }

    fn consume(&mut self, len: usize) -> *const u8 {
        let end = self.pos.checked_add(len);
        assert!(
            end.is_some_and(|end| end <= self.capacity),
            "decoding past the end of a {}-byte bridge buffer",
            self.capacity,
        );
        // SAFETY: `pos + len <= capacity`, and the constructor's caller
        // guaranteed `capacity` readable bytes.
        let at = unsafe { self.buf.add(self.pos) };
        self.pos += len;
        at
    }
}

/// A type that crosses the language boundary by encoding under schema `S`.
///
/// A concrete bridged type implements `CrubitAbi<ByBridge<()>>`. A generic
/// wrapper `W<T1, ..., Tn>` implements `CrubitAbi<ByBridge<(S1, ..., Sn)>>`
/// given `Ti: CrubitAbi<Si>`, or `CrubitAbi<ByBridge<S>>` when there is a
/// single parameter. Its `SIZE` is then a function of the components'
/// `SIZE`s, and so is every buffer the generated code allocates for it.
///
/// `decode(encode(x))` must produce a value observably equal to `x`.
///
/// # Safety
///
/// The encoding must be byte-for-byte identical to the one produced and
/// consumed by the matching C++ `CrubitAbi` specialization, and must never
/// advance the cursor by more than `SIZE` bytes.
pub unsafe trait CrubitAbi<S>: Sized {
    /// Upper bound on the encoded length in bytes.
    const SIZE: usize;

    /// Moves `self` into the buffer. Owned resources must be leaked into the
    /// encoding rather than dropped, so that `decode` can reclaim them.
    fn encode(self, encoder: &mut Encoder);

    /// # Safety
    ///
    /// The bytes at the cursor must hold a `Self` encoded with schema `S`.
    unsafe fn decode(decoder: &mut Decoder) -> Self;
}

// SAFETY: both sides memcpy the object representation.
unsafe impl<T> CrubitAbi<ByTransmute> for T {
    const SIZE: usize = mem::size_of::<T>();

    fn encode(self, encoder: &mut Encoder) {
        let at = encoder.reserve(mem::size_of::<T>());
        // SAFETY: `reserve` handed out `size_of::<T>()` writable bytes.
        unsafe { ptr::write_unaligned(at.cast::<T>(), self) }
    }

    unsafe fn decode(decoder: &mut Decoder) -> Self {
        let at = decoder.consume(mem::size_of::<T>());
        // SAFETY: the caller guarantees a `T` was encoded here.
        unsafe { ptr::read_unaligned(at.cast::<T>()) }
    }
}

// SAFETY: a `bool` presence flag followed by the payload when present,
// matching `crubit::OptionalAbi` in C++.
unsafe impl<T: CrubitAbi<S>, S> CrubitAbi<ByBridge<S>> for Option<T> {
    const SIZE: usize = mem::size_of::<bool>() + <T as CrubitAbi<S>>::SIZE;

    fn encode(self, encoder: &mut Encoder) {
        match self {
            Some(value) => {
                encoder.encode_transmute(true);
                encoder.encode::<T, S>(value);
            }
            None => encoder.encode_transmute(false),
        }
    }

    unsafe fn decode(decoder: &mut Decoder) -> Self {
        // SAFETY: the caller guarantees a flag, then a payload iff the flag
        // is set.
        unsafe {
            if decoder.decode_transmute::<bool>() {
                Some(decoder.decode::<T, S>())
            } else {
                None
            }
        }
    }
}

// SAFETY: data pointer then length, both pointer-sized, matching the C++
// span encoding.
unsafe impl<T> CrubitAbi<ByBridge<()>> for *const [T] {
    const SIZE: usize = mem::size_of::<[usize; 2]>();

    fn encode(self, encoder: &mut Encoder) {
        encoder.encode_transmute([self.cast::<T>() as usize, self.len()]);
    }

    unsafe fn decode(decoder: &mut Decoder) -> Self {
        // SAFETY: the caller guarantees an address and a length.
        let [addr, len] = unsafe { decoder.decode_transmute::<[usize; 2]>() };
        ptr::slice_from_raw_parts(addr as *const T, len)
    }
}

// SAFETY: same as `*const [T]`.
unsafe impl<T> CrubitAbi<ByBridge<()>> for *mut [T] {
    const SIZE: usize = mem::size_of::<[usize; 2]>();

    fn encode(self, encoder: &mut Encoder) {
        encoder.encode_transmute([self.cast::<T>() as usize, self.len()]);
    }

    unsafe fn decode(decoder: &mut Decoder) -> Self {
        // SAFETY: the caller guarantees an address and a length.
        let [addr, len] = unsafe { decoder.decode_transmute::<[usize; 2]>() };
        ptr::slice_from_raw_parts_mut(addr as *mut T, len)
    }
}

macro_rules! tuple_abi {
    ($(($($T:ident $S:ident),*))*) => {
        $(
            // SAFETY: elements in declaration order, each with its own
            // schema, matching `std::tuple`/`std::pair` in C++.
            unsafe impl<$($T: CrubitAbi<$S>, $S,)*> CrubitAbi<ByBridge<($($S,)*)>> for ($($T,)*) {
                const SIZE: usize = 0 $(+ <$T as CrubitAbi<$S>>::SIZE)*;

                #[allow(non_snake_case, unused_variables)]
                fn encode(self, encoder: &mut Encoder) {
                    let ($($T,)*) = self;
                    $(encoder.encode::<$T, $S>($T);)*
                }

                #[allow(non_snake_case, unused_variables, clippy::unused_unit)]
                unsafe fn decode(decoder: &mut Decoder) -> Self {
                    $(
                        // SAFETY: the caller guarantees every element was
                        // encoded in order.
                        let $T = unsafe { decoder.decode::<$T, $S>() };
                    )*
                    ($($T,)*)
                }
            }
        )*
    };
}

tuple_abi! {
    ()
    (T1 S1)
    (T1 S1, T2 S2)
    (T1 S1, T2 S2, T3 S3)
    (T1 S1, T2 S2, T3 S3, T4 S4)
    (T1 S1, T2 S2, T3 S3, T4 S4, T5 S5)
    (T1 S1, T2 S2, T3 S3, T4 S4, T5 S5, T6 S6)
    (T1 S1, T2 S2, T3 S3, T4 S4, T5 S5, T6 S6, T7 S7)
    (T1 S1, T2 S2, T3 S3, T4 S4, T5 S5, T6 S6, T7 S7, T8 S8)
}

/// Entry points for generated thunks.
#[doc(hidden)]
pub mod internal {
    use super::{CrubitAbi, Decoder, Encoder, MaybeUninit};

    /// # Safety
    ///
    /// `buf` must be valid for writes of `<T as CrubitAbi<S>>::SIZE` bytes.
    pub unsafe fn encode<T: CrubitAbi<S>, S>(buf: *mut u8, value: T) {
        // SAFETY: forwarded to the caller.
        let mut encoder = unsafe { Encoder::new(buf, <T as CrubitAbi<S>>::SIZE) };
        Encoder::encode::<T, S>(&mut encoder, value);
    }

    /// # Safety
    ///
    /// `buf` must hold a `T` encoded with schema `S`, and be valid for reads
    /// of `<T as CrubitAbi<S>>::SIZE` bytes.
    pub unsafe fn decode<T: CrubitAbi<S>, S>(buf: *const u8) -> T {
        // SAFETY: forwarded to the caller.
        unsafe {
            let mut decoder = Decoder::new(buf, <T as CrubitAbi<S>>::SIZE);
            decoder.decode::<T, S>()
        }
    }

    /// Uninitialized storage for one encoded value.
    pub const fn empty_buffer<const BYTES: usize>() -> [MaybeUninit<u8>; BYTES] {
        const UNINIT: MaybeUninit<u8> = MaybeUninit::uninit();
        [UNINIT; BYTES]
    }
}
