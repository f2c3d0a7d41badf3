use std::fmt::{self, Display};

#[derive(Copy, Clone)]
pub(crate) struct Error {
    pub msg: &'static str,
    pub label: Option<&'static str>,
    pub note: Option<&'static str>,
}

impl Error {
    /// The message, followed by `detail` when the message ends in an open
    /// slot.
    pub(crate) fn with(&self, detail: impl Display) -> String {
        format!("{}{}", self.msg, detail)
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        self.msg.fmt(formatter)
    }
}

pub(crate) static ERRORS: &[Error] = &[
    ABI_CLASS_MISMATCH,
    BOX_BY_VALUE,
    BRIDGE_INCOMPLETE,
    CALLING_CONVENTION,
    CXX_KEYWORD,
    DEPENDS_ON_UNSUPPORTED,
    DISCRIMINANT_RANGE,
    ENUM_UNDERLYING,
    INSTANTIATION_FAILED,
    NON_MOVABLE_BY_VALUE,
    NOT_AN_IDENTIFIER,
    NOT_A_TYPE,
    OVERLOADED,
    PACKED_AND_ALIGNED,
    RVALUE_REFERENCE,
    UNKNOWN_ANNOTATION,
    UNKNOWN_ATTRIBUTE,
    UNSUPPORTED_PRIMITIVE,
    UNSUPPORTED_TEMPLATE,
    ZERO_SIZED,
];

pub(crate) static ABI_CLASS_MISMATCH: Error = Error {
    msg: "register classification disagrees with the compiler: ",
    label: Some("ABI mismatch"),
    note: Some("note: a thunk passing this type by value would corrupt its fields"),
};

pub(crate) static BOX_BY_VALUE: Error = Error {
    msg: "Box<T> cannot cross the language boundary",
    label: None,
    note: Some("hint: pass a reference, or a C++ std::unique_ptr<T>"),
};

pub(crate) static BRIDGE_INCOMPLETE: Error = Error {
    msg: "bridged type is missing annotation ",
    label: Some("incomplete bridge"),
    note: Some("note: bridge_type, bridge_abi_rust and bridge_abi_cpp go together"),
};

pub(crate) static CALLING_CONVENTION: Error = Error {
    msg: "calling convention has no equivalent in the other language: ",
    label: None,
    note: None,
};

pub(crate) static CXX_KEYWORD: Error = Error {
    msg: "name is a reserved word in C++: ",
    label: None,
    note: None,
};

pub(crate) static DEPENDS_ON_UNSUPPORTED: Error = Error {
    msg: "depends on an item that has no bindings: ",
    label: None,
    note: None,
};

pub(crate) static DISCRIMINANT_RANGE: Error = Error {
    msg: "enumerator value does not fit the underlying type: ",
    label: Some("discriminant out of range"),
    note: None,
};

pub(crate) static ENUM_UNDERLYING: Error = Error {
    msg: "enum underlying type must be an integer: ",
    label: None,
    note: None,
};

pub(crate) static INSTANTIATION_FAILED: Error = Error {
    msg: "failed to instantiate template: ",
    label: Some("template instantiation failure"),
    note: None,
};

pub(crate) static NON_MOVABLE_BY_VALUE: Error = Error {
    msg: "type cannot be passed or returned by value because it is not movable: ",
    label: None,
    note: Some("hint: pass a pointer or reference instead"),
};

pub(crate) static NOT_AN_IDENTIFIER: Error = Error {
    msg: "name is not a valid Rust identifier: ",
    label: None,
    note: Some("hint: choose another name with a `rust_name` annotation"),
};

pub(crate) static NOT_A_TYPE: Error = Error {
    msg: "item is not a type: ",
    label: None,
    note: None,
};

pub(crate) static OVERLOADED: Error = Error {
    msg: "overloaded functions are not supported: ",
    label: Some("overloaded"),
    note: Some("hint: give each overload a distinct `rust_name`"),
};

pub(crate) static PACKED_AND_ALIGNED: Error = Error {
    msg: "record is both packed and over-aligned",
    label: None,
    note: Some("note: #[repr(packed)] and #[repr(align)] cannot be combined"),
};

pub(crate) static RVALUE_REFERENCE: Error = Error {
    msg: "rvalue references are not supported",
    label: None,
    note: Some("hint: take the parameter by value"),
};

pub(crate) static UNKNOWN_ANNOTATION: Error = Error {
    msg: "unknown annotation: ",
    label: Some("unknown annotation"),
    note: None,
};

pub(crate) static UNKNOWN_ATTRIBUTE: Error = Error {
    msg: "unrecognized attribute: ",
    label: None,
    note: None,
};

pub(crate) static UNSUPPORTED_PRIMITIVE: Error = Error {
    msg: "unsupported builtin type: ",
    label: None,
    note: None,
};

pub(crate) static UNSUPPORTED_TEMPLATE: Error = Error {
    msg: "class template is not supported by value: ",
    label: None,
    note: None,
};

pub(crate) static ZERO_SIZED: Error = Error {
    msg: "zero-sized types are not supported",
    label: None,
    note: Some("note: C++ objects always occupy at least one byte"),
};
