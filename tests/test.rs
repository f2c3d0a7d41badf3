#![allow(clippy::float_cmp, clippy::items_after_statements)]

use crubit::private;
use crubit::{ByBridge, ByTransmute, CppDelete, CrubitAbi, Decoder, Encoder, ReturnValueSlot};
use crubit::{TransferAbi, UniquePtr};
use std::cell::Cell;
use std::mem::ManuallyDrop;
use std::ptr;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Vec3<T> {
    x: T,
    y: T,
    z: T,
}

// SAFETY: three components in order, matching a C++ Vec3Abi<Abi>.
unsafe impl<T: CrubitAbi<S>, S> CrubitAbi<ByBridge<S>> for Vec3<T> {
    const SIZE: usize = 3 * <T as CrubitAbi<S>>::SIZE;

    fn encode(self, encoder: &mut Encoder) {
        encoder.encode::<T, S>(self.x);
        encoder.encode::<T, S>(self.y);
        encoder.encode::<T, S>(self.z);
    }

    unsafe fn decode(decoder: &mut Decoder) -> Self {
        unsafe {
            let x = decoder.decode::<T, S>();
            let y = decoder.decode::<T, S>();
            let z = decoder.decode::<T, S>();
            Vec3 { x, y, z }
        }
    }
}

fn round_trip<T: CrubitAbi<S>, S>(value: T) -> T {
    let mut buf = vec![0u8; <T as CrubitAbi<S>>::SIZE];
    unsafe {
        private::encode::<T, S>(buf.as_mut_ptr(), value);
        private::decode::<T, S>(buf.as_ptr())
    }
}

#[test]
fn test_optional_vec3_round_trip() {
    type T = Option<Vec3<f32>>;
    type S = ByBridge<ByBridge<ByTransmute>>;

    assert_eq!(12, <Vec3<f32> as CrubitAbi<ByBridge<ByTransmute>>>::SIZE);
    assert_eq!(13, <T as CrubitAbi<S>>::SIZE);

    let present = Some(Vec3 {
        x: 1.0,
        y: 2.0,
        z: 3.0,
    });
    assert_eq!(present, round_trip::<T, S>(present));
    assert_eq!(None, round_trip::<T, S>(None));
}

#[test]
fn test_nested_round_trip() {
    type T = (Option<(i64, bool)>, (u8, f32));
    type S = ByBridge<(
        ByBridge<ByBridge<(ByTransmute, ByTransmute)>>,
        ByBridge<(ByTransmute, ByTransmute)>,
    )>;

    let value = (Some((-7_i64, true)), (3_u8, 0.5_f32));
    assert_eq!(value, round_trip::<T, S>(value));
    let value = (None, (255_u8, -1.25_f32));
    assert_eq!(value, round_trip::<T, S>(value));
}

#[test]
fn test_encoder_advances_by_encoded_length() {
    type S = ByBridge<ByTransmute>;
    let mut buf = [0u8; 5];
    let mut encoder = unsafe { Encoder::new(buf.as_mut_ptr(), buf.len()) };
    Encoder::encode::<Option<u32>, S>(&mut encoder, None);
    assert_eq!(1, encoder.position());
    encoder.encode_transmute(9_u16);
    assert_eq!(3, encoder.position());

    let mut decoder = unsafe { Decoder::new(buf.as_ptr(), buf.len()) };
    assert_eq!(None, unsafe { decoder.decode::<Option<u32>, S>() });
    assert_eq!(9_u16, unsafe { decoder.decode_transmute::<u16>() });
    assert_eq!(3, decoder.position());
}

#[test]
#[should_panic = "encoding past the end of a 2-byte bridge buffer"]
fn test_encoder_overflow() {
    let mut buf = [0u8; 2];
    let mut encoder = unsafe { Encoder::new(buf.as_mut_ptr(), buf.len()) };
    encoder.encode_transmute(1_u32);
}

struct Counted {
    value: i32,
    clones: Rc<Cell<usize>>,
}

impl Clone for Counted {
    fn clone(&self) -> Self {
        self.clones.set(self.clones.get() + 1);
        Counted {
            value: self.value,
            clones: Rc::clone(&self.clones),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.clones.set(self.clones.get() + 1);
        self.value = source.value;
    }
}

#[test]
fn test_clone_assign_skips_self() {
    let clones = Rc::new(Cell::new(0));
    let mut a = Counted {
        value: 1,
        clones: Rc::clone(&clones),
    };
    let b = Counted {
        value: 2,
        clones: Rc::clone(&clones),
    };

    let this: *mut Counted = &mut a;
    unsafe { private::clone_assign(this, this) };
    assert_eq!(0, clones.get());
    assert_eq!(1, a.value);

    unsafe { private::clone_assign(&mut a, &b) };
    assert_eq!(1, clones.get());
    assert_eq!(2, a.value);
}

#[derive(Default, Debug, PartialEq)]
struct Holder {
    field: i32,
}

#[test]
fn test_move_leaves_default_husk() {
    let mut original = Holder { field: 42 };
    let mut moved = ReturnValueSlot::<Holder>::new();
    let moved = unsafe {
        private::move_construct(moved.as_mut_ptr(), &mut original);
        moved.assume_init()
    };
    assert_eq!(42, moved.field);
    assert_eq!(Holder::default(), original);
    assert_eq!(0, original.field);
}

#[test]
fn test_move_assign_skips_self() {
    let mut value = Holder { field: 42 };
    let this: *mut Holder = &mut value;
    unsafe { private::move_assign(this, this) };
    assert_eq!(42, value.field);

    let mut other = Holder { field: 7 };
    unsafe { private::move_assign(&mut value, &mut other) };
    assert_eq!(7, value.field);
    assert_eq!(0, other.field);
}

struct Bump(Rc<Cell<i32>>);

impl Drop for Bump {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[allow(dead_code)]
enum Variants {
    A,
    B(i32),
    C(Bump),
}

#[test]
fn test_drop_runs_only_active_variant() {
    let counter = Rc::new(Cell::new(1));
    let mut value = ManuallyDrop::new(Variants::C(Bump(Rc::clone(&counter))));
    // Overwrite the active variant without running its destructor, as the
    // C++ side does when it reassigns the tag.
    unsafe { ptr::write(&mut *value, Variants::A) };
    unsafe { private::drop_in_place::<Variants>(&mut *value) };
    assert_eq!(1, counter.get());

    let counter = Rc::new(Cell::new(1));
    let mut value = ManuallyDrop::new(Variants::C(Bump(Rc::clone(&counter))));
    unsafe { private::drop_in_place::<Variants>(&mut *value) };
    assert_eq!(2, counter.get());
}

#[test]
fn test_clone_assign_variant() {
    #[derive(Clone, Debug, PartialEq)]
    enum Shape {
        Empty,
        Point(i32, i32),
    }
    let mut a = Shape::Point(1, 2);
    let b = Shape::Empty;
    unsafe { private::clone_assign(&mut a, &b) };
    assert_eq!(Shape::Empty, a);
    unsafe { private::clone_assign(&mut a, &Shape::Point(3, 4)) };
    assert_eq!(Shape::Point(3, 4), a);
}

#[test]
fn test_return_value_slot() {
    let value = unsafe {
        ReturnValueSlot::call(|slot: *mut Holder| slot.write(Holder { field: 5 }))
    };
    assert_eq!(5, value.field);

    // A callee that unwinds before filling the slot leaves nothing behind
    // to drop.
    let result = std::panic::catch_unwind(|| unsafe {
        ReturnValueSlot::<Bump>::call(|_slot| panic!("callee failed"))
    });
    assert!(result.is_err());
}

thread_local! {
    static DELETED: Cell<usize> = const { Cell::new(0) };
}

struct CppObject(i32);

unsafe impl CppDelete for CppObject {
    const TYPENAME: &'static str = "CppObject";

    unsafe fn delete(ptr: *mut Self) {
        DELETED.with(|deleted| deleted.set(deleted.get() + 1));
        drop(unsafe { Box::from_raw(ptr) });
    }
}

#[test]
fn test_unique_ptr_transfer() {
    let owned = unsafe { UniquePtr::from_raw(Box::into_raw(Box::new(CppObject(9)))) };
    let raw = owned.transfer_out();
    assert_eq!(0, DELETED.with(Cell::get));
    let adopted: UniquePtr<CppObject> = unsafe { private::transfer_in(raw) };
    assert_eq!(9, adopted.0);
    drop(adopted);
    assert_eq!(1, DELETED.with(Cell::get));

    drop(UniquePtr::<CppObject>::null());
    assert_eq!(1, DELETED.with(Cell::get));
}
