use crate::syntax::Lang;
use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use std::fmt::{self, Display};

/// Builtin scalar types known to both languages.
///
/// Several spellings may resolve to one atom (`size_t`, `std::size_t` and
/// `uintptr_t` are all `Usize`), and which spellings are recognized depends
/// on the language being read: `char` is `c_char` in C++ but the Unicode
/// scalar type in Rust.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Atom {
    Void,
    Bool,
    Char,
    U8,
    U16,
    U32,
    U64,
    Usize,
    I8,
    I16,
    I32,
    I64,
    Isize,
    F32,
    F64,
    CChar,
    CSChar,
    CUChar,
    CShort,
    CUShort,
    CInt,
    CUInt,
    CLong,
    CULong,
    CLongLong,
    CULongLong,
}

impl Atom {
    pub fn lookup(lang: Lang, name: &str) -> Option<Self> {
        match lang {
            Lang::Cxx => Atom::from_cxx(name),
            Lang::Rust => Atom::from_rust(name),
        }
    }

    pub fn from_cxx(name: &str) -> Option<Self> {
        use self::Atom::*;
        let name = name.strip_prefix("::").unwrap_or(name);
        match name {
            "void" => Some(Void),
            "bool" => Some(Bool),
            "char" => Some(CChar),
            "signed char" => Some(CSChar),
            "unsigned char" => Some(CUChar),
            "short" | "short int" | "signed short" | "signed short int" => Some(CShort),
            "unsigned short" | "unsigned short int" => Some(CUShort),
            "int" | "signed" | "signed int" => Some(CInt),
            "unsigned" | "unsigned int" => Some(CUInt),
            "long" | "long int" | "signed long" | "signed long int" => Some(CLong),
            "unsigned long" | "unsigned long int" => Some(CULong),
            "long long" | "long long int" | "signed long long" | "signed long long int" => {
                Some(CLongLong)
            }
            "unsigned long long" | "unsigned long long int" => Some(CULongLong),
            "float" => Some(F32),
            "double" => Some(F64),
            "char8_t" => Some(U8),
            "char16_t" => Some(U16),
            "char32_t" => Some(U32),
            "rs_std::char_" | "rs_std::rs_char" => Some(Char),
            _ => {
                let name = name.strip_prefix("std::").unwrap_or(name);
                match name {
                    "int8_t" => Some(I8),
                    "int16_t" => Some(I16),
                    "int32_t" => Some(I32),
                    "int64_t" => Some(I64),
                    "uint8_t" => Some(U8),
                    "uint16_t" => Some(U16),
                    "uint32_t" => Some(U32),
                    "uint64_t" => Some(U64),
                    "size_t" | "uintptr_t" => Some(Usize),
                    "ptrdiff_t" | "intptr_t" => Some(Isize),
                    _ => None,
                }
            }
        }
    }

    pub fn from_rust(name: &str) -> Option<Self> {
        use self::Atom::*;
        let name = name.strip_prefix("::").unwrap_or(name);
        match name {
            "()" => Some(Void),
            "bool" => Some(Bool),
            "char" => Some(Char),
            "u8" => Some(U8),
            "u16" => Some(U16),
            "u32" => Some(U32),
            "u64" => Some(U64),
            "usize" => Some(Usize),
            "i8" => Some(I8),
            "i16" => Some(I16),
            "i32" => Some(I32),
            "i64" => Some(I64),
            "isize" => Some(Isize),
            "f32" => Some(F32),
            "f64" => Some(F64),
            _ => {
                let ffi = name
                    .strip_prefix("core::ffi::")
                    .or_else(|| name.strip_prefix("std::ffi::"))
                    .or_else(|| name.strip_prefix("std::os::raw::"))?;
                match ffi {
                    "c_char" => Some(CChar),
                    "c_schar" => Some(CSChar),
                    "c_uchar" => Some(CUChar),
                    "c_short" => Some(CShort),
                    "c_ushort" => Some(CUShort),
                    "c_int" => Some(CInt),
                    "c_uint" => Some(CUInt),
                    "c_long" => Some(CLong),
                    "c_ulong" => Some(CULong),
                    "c_longlong" => Some(CLongLong),
                    "c_ulonglong" => Some(CULongLong),
                    "c_float" => Some(F32),
                    "c_double" => Some(F64),
                    _ => None,
                }
            }
        }
    }

    /// Spelling used in generated C++.
    pub fn to_cxx(self) -> &'static str {
        use self::Atom::*;
        match self {
            Void => "void",
            Bool => "bool",
            Char => "rs_std::char_",
            U8 => "std::uint8_t",
            U16 => "std::uint16_t",
            U32 => "std::uint32_t",
            U64 => "std::uint64_t",
            Usize => "std::uintptr_t",
            I8 => "std::int8_t",
            I16 => "std::int16_t",
            I32 => "std::int32_t",
            I64 => "std::int64_t",
            Isize => "std::intptr_t",
            F32 => "float",
            F64 => "double",
            CChar => "char",
            CSChar => "signed char",
            CUChar => "unsigned char",
            CShort => "short",
            CUShort => "unsigned short",
            CInt => "int",
            CUInt => "unsigned int",
            CLong => "long",
            CULong => "unsigned long",
            CLongLong => "long long",
            CULongLong => "unsigned long long",
        }
    }

    /// Size in bytes on an LP64 target. `void` has none.
    pub fn size(self) -> u64 {
        use self::Atom::*;
        match self {
            Void => 0,
            Bool | U8 | I8 | CChar | CSChar | CUChar => 1,
            U16 | I16 | CShort | CUShort => 2,
            Char | U32 | I32 | F32 | CInt | CUInt => 4,
            U64 | I64 | Usize | Isize | F64 | CLong | CULong | CLongLong | CULongLong => 8,
        }
    }

    pub fn align(self) -> u64 {
        self.size().max(1)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Atom::F32 | Atom::F64)
    }

    /// `Some(is_signed)` for integer types that can back an enum.
    pub fn integer_signedness(self) -> Option<bool> {
        use self::Atom::*;
        match self {
            I8 | I16 | I32 | I64 | Isize | CSChar | CShort | CInt | CLong | CLongLong => Some(true),
            U8 | U16 | U32 | U64 | Usize | CUChar | CUShort | CUInt | CULong | CULongLong => {
                Some(false)
            }
            // c_char is signed on x86-64 Linux.
            CChar => Some(true),
            Void | Bool | Char | F32 | F64 => None,
        }
    }
}

impl ToTokens for Atom {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        use self::Atom::*;
        tokens.extend(match self {
            Void => quote!(()),
            Bool => quote!(bool),
            Char => quote!(char),
            U8 => quote!(u8),
            U16 => quote!(u16),
            U32 => quote!(u32),
            U64 => quote!(u64),
            Usize => quote!(usize),
            I8 => quote!(i8),
            I16 => quote!(i16),
            I32 => quote!(i32),
            I64 => quote!(i64),
            Isize => quote!(isize),
            F32 => quote!(f32),
            F64 => quote!(f64),
            CChar => quote!(::core::ffi::c_char),
            CSChar => quote!(::core::ffi::c_schar),
            CUChar => quote!(::core::ffi::c_uchar),
            CShort => quote!(::core::ffi::c_short),
            CUShort => quote!(::core::ffi::c_ushort),
            CInt => quote!(::core::ffi::c_int),
            CUInt => quote!(::core::ffi::c_uint),
            CLong => quote!(::core::ffi::c_long),
            CULong => quote!(::core::ffi::c_ulong),
            CLongLong => quote!(::core::ffi::c_longlong),
            CULongLong => quote!(::core::ffi::c_ulonglong),
        });
    }
}

impl Display for Atom {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.to_cxx())
    }
}

#[cfg(test)]
mod tests {
    use super::Atom;
    use crate::syntax::Lang;

    #[test]
    fn test_spellings_share_one_atom() {
        assert_eq!(Some(Atom::Usize), Atom::from_cxx("size_t"));
        assert_eq!(Some(Atom::Usize), Atom::from_cxx("std::size_t"));
        assert_eq!(Some(Atom::I32), Atom::from_cxx("::std::int32_t"));
        assert_eq!(Some(Atom::CInt), Atom::from_rust("::core::ffi::c_int"));
        assert_eq!(Some(Atom::CInt), Atom::from_rust("std::os::raw::c_int"));
    }

    #[test]
    fn test_char_depends_on_language() {
        assert_eq!(Some(Atom::CChar), Atom::lookup(Lang::Cxx, "char"));
        assert_eq!(Some(Atom::Char), Atom::lookup(Lang::Rust, "char"));
        assert_eq!(Some(Atom::Char), Atom::lookup(Lang::Cxx, "rs_std::char_"));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(None, Atom::from_cxx("long double"));
        assert_eq!(None, Atom::from_cxx("__int128"));
        assert_eq!(None, Atom::from_rust("u128"));
    }
}
