use crate::syntax::error;
use crate::syntax::{Annotation, Decl};

/// Source-level annotations which override the default mapping of one
/// declaration.
#[derive(Default, Debug)]
pub struct Attrs {
    /// `Some` with an empty message for a bare `deprecated`.
    pub deprecated: Option<String>,
    pub rust_name: Option<String>,
    pub namespace_rename: Option<NamespaceRename>,
    pub enum_kind: Option<EnumKind>,
    pub bridge: Option<BridgeAttrs>,
}

/// `namespace_rename = "from=to"`: the outermost namespace `from` is
/// spelled `to` on the other side.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NamespaceRename {
    pub from: String,
    pub to: String,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EnumKind {
    /// Enumerators are also visible in the enclosing scope.
    C,
    /// Enumerators are scoped to the enum.
    Cpp,
}

/// A type that crosses the boundary through user-provided codecs instead of
/// its layout.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BridgeAttrs {
    /// The type it corresponds to in the other language.
    pub ty: String,
    /// Schema marker type `S` of the Rust `CrubitAbi<S>` impl.
    pub abi_rust: String,
    /// C++ Abi class with `Value`, `kSize`, `Encode` and `Decode`.
    pub abi_cpp: String,
}

pub fn parse(decl: &Decl) -> Result<Attrs, Vec<String>> {
    let mut attrs = Attrs::default();
    let mut errors = Vec::new();
    let mut bridge_type = None;
    let mut bridge_abi_rust = None;
    let mut bridge_abi_cpp = None;

    for annotation in &decl.annotations {
        let result = match annotation.key.as_str() {
            "deprecated" => {
                attrs.deprecated = Some(annotation.value.clone().unwrap_or_default());
                Ok(())
            }
            "rust_name" => parse_ident(annotation).map(|name| attrs.rust_name = Some(name)),
            "namespace_rename" => {
                parse_rename(annotation).map(|rename| attrs.namespace_rename = Some(rename))
            }
            "enum_kind" => parse_enum_kind(annotation).map(|kind| attrs.enum_kind = Some(kind)),
            "bridge_type" => required(annotation).map(|value| bridge_type = Some(value)),
            "bridge_abi_rust" => required(annotation).map(|value| bridge_abi_rust = Some(value)),
            "bridge_abi_cpp" => required(annotation).map(|value| bridge_abi_cpp = Some(value)),
            other => Err(error::UNKNOWN_ANNOTATION.with(format_args!("`{}`", other))),
        };
        if let Err(err) = result {
            errors.push(err);
        }
    }

    match (bridge_type, bridge_abi_rust, bridge_abi_cpp) {
        (None, None, None) => {}
        (Some(ty), Some(abi_rust), Some(abi_cpp)) => {
            attrs.bridge = Some(BridgeAttrs {
                ty,
                abi_rust,
                abi_cpp,
            });
        }
        (ty, abi_rust, abi_cpp) => {
            for (key, value) in [
                ("bridge_type", ty),
                ("bridge_abi_rust", abi_rust),
                ("bridge_abi_cpp", abi_cpp),
            ] {
                if value.is_none() {
                    errors.push(error::BRIDGE_INCOMPLETE.with(format_args!("`{}`", key)));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(attrs)
    } else {
        Err(errors)
    }
}

fn required(annotation: &Annotation) -> Result<String, String> {
    match &annotation.value {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(format!("annotation `{}` requires a value", annotation.key)),
    }
}

fn parse_ident(annotation: &Annotation) -> Result<String, String> {
    let value = required(annotation)?;
    match syn::parse_str::<syn::Ident>(&value) {
        Ok(_) => Ok(value),
        Err(_) => Err(format!(
            "annotation `{}` must be an identifier, found \"{}\"",
            annotation.key, value,
        )),
    }
}

fn parse_rename(annotation: &Annotation) -> Result<NamespaceRename, String> {
    let value = required(annotation)?;
    let Some((from, to)) = value.split_once('=') else {
        return Err(format!(
            "annotation `{}` must have the form \"from=to\", found \"{}\"",
            annotation.key, value,
        ));
    };
    let (from, to) = (from.trim(), to.trim());
    if from.is_empty() || syn::parse_str::<syn::Ident>(to).is_err() {
        return Err(format!(
            "annotation `{}` must have the form \"from=to\", found \"{}\"",
            annotation.key, value,
        ));
    }
    Ok(NamespaceRename {
        from: from.to_owned(),
        to: to.to_owned(),
    })
}

fn parse_enum_kind(annotation: &Annotation) -> Result<EnumKind, String> {
    match required(annotation)?.as_str() {
        "c" => Ok(EnumKind::C),
        "cpp" => Ok(EnumKind::Cpp),
        other => Err(format!(
            "annotation `enum_kind` must be \"c\" or \"cpp\", found \"{}\"",
            other,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, EnumKind};
    use crate::syntax::Decl;
    use serde_json::json;

    fn decl(annotations: serde_json::Value) -> Decl {
        serde_json::from_value(json!({"id": 1, "name": "X", "annotations": annotations})).unwrap()
    }

    #[test]
    fn test_vocabulary() {
        let attrs = parse(&decl(json!([
            {"key": "deprecated", "value": "use Y"},
            {"key": "rust_name", "value": "Renamed"},
            {"key": "enum_kind", "value": "c"},
            {"key": "namespace_rename", "value": "absl=abseil"},
        ])))
        .unwrap();
        assert_eq!(Some("use Y"), attrs.deprecated.as_deref());
        assert_eq!(Some("Renamed"), attrs.rust_name.as_deref());
        assert_eq!(Some(EnumKind::C), attrs.enum_kind);
        let rename = attrs.namespace_rename.unwrap();
        assert_eq!(("absl", "abseil"), (rename.from.as_str(), rename.to.as_str()));
        assert!(attrs.bridge.is_none());
    }

    #[test]
    fn test_unknown_annotation_is_an_error() {
        let errors = parse(&decl(json!([
            {"key": "deprecated"},
            {"key": "no_such_thing", "value": "1"},
        ])))
        .unwrap_err();
        assert_eq!(vec!["unknown annotation: `no_such_thing`".to_owned()], errors);
    }

    #[test]
    fn test_bridge_needs_all_three() {
        let attrs = parse(&decl(json!([
            {"key": "bridge_type", "value": "::strings::Str"},
            {"key": "bridge_abi_rust", "value": "::strings::StrAbi"},
            {"key": "bridge_abi_cpp", "value": "strings::StrAbi"},
        ])))
        .unwrap();
        assert_eq!("::strings::Str", attrs.bridge.unwrap().ty);

        let errors = parse(&decl(json!([
            {"key": "bridge_type", "value": "::strings::Str"},
        ])))
        .unwrap_err();
        assert_eq!(2, errors.len());
        assert!(errors[0].ends_with("`bridge_abi_rust`"));
    }

    #[test]
    fn test_bad_values() {
        assert!(parse(&decl(json!([{"key": "rust_name", "value": "not an ident"}]))).is_err());
        assert!(parse(&decl(json!([{"key": "enum_kind", "value": "rust"}]))).is_err());
        assert!(parse(&decl(json!([{"key": "namespace_rename", "value": "absl"}]))).is_err());
    }
}
