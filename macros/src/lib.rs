//! Derive macros for statekit
//!
//! This crate provides procedural macros that state a record's property
//! classification at compile time instead of inferring it from default values.
//!
//! # Available Macros
//!
//! - `#[derive(PropertySchema)]` - Implements `statekit_core::schema::PropertySchema`
//!   from a struct's field types
//!
//! # Example
//!
//! ```ignore
//! use statekit_macros::PropertySchema;
//!
//! #[derive(PropertySchema)]
//! struct TodoState {
//!     todos: Vec<String>,
//!     show_done: bool,
//!     #[property(kind = "object")]
//!     filters: serde_json::Value,
//!     #[property(skip)]
//!     cache: String,
//! }
//!
//! let config = BulkConfig::new("TODO").with_schema::<TodoState>();
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    parse_macro_input, Data, DeriveInput, Field, Fields, GenericArgument, LitStr, PathArguments,
    Type,
};

/// Derive macro for property schemas
///
/// Generates `PropertySchema::property_kinds()` listing every named field in
/// declaration order with its classification:
///
/// | Field type | Kind |
/// |---|---|
/// | `Vec`, `VecDeque`, `SmallVec`, sets, arrays, slices | `Array` |
/// | `bool` | `Boolean` |
/// | `HashMap`, `BTreeMap`, `Map`, `IndexMap` | `Object` |
/// | `Option<T>`, `Box<T>`, `Arc<T>`, `Rc<T>`, `&T` | kind of `T` |
/// | anything else | `Generic` |
///
/// # Attributes
///
/// - `#[property(kind = "array" | "boolean" | "object" | "generic")]` - Override the kind
/// - `#[property(rename = "name")]` - Use another property key
/// - `#[property(skip)]` - Leave the field out of the schema
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to anything but a struct with named fields
/// - A `kind` is not one of the four classifications
/// - A property key is not an identifier
#[proc_macro_derive(PropertySchema, attributes(property))]
pub fn derive_property_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_property_schema(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_property_schema(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    let Data::Struct(data_struct) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(PropertySchema)] can only be used on structs",
        ));
    };
    let Fields::Named(fields) = &data_struct.fields else {
        return Err(syn::Error::new_spanned(
            &data_struct.fields,
            "#[derive(PropertySchema)] requires named fields",
        ));
    };

    let mut entries = Vec::new();
    for field in &fields.named {
        let options = FieldOptions::parse(field)?;
        if options.skip {
            continue;
        }

        let key = match options.rename {
            Some(rename) => {
                if !is_property_key(&rename.value()) {
                    return Err(syn::Error::new_spanned(
                        &rename,
                        "property key must match [A-Za-z_][A-Za-z0-9_]*",
                    ));
                }
                rename.value()
            },
            None => field_key(field),
        };
        let kind = options.kind.unwrap_or_else(|| Kind::of_type(&field.ty));
        entries.push(quote! { (#key, #kind) });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::statekit_core::schema::PropertySchema
            for #name #ty_generics #where_clause
        {
            fn property_kinds() -> ::std::vec::Vec<(&'static str, ::statekit_core::PropertyKind)> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}

/// Classification chosen for one field.
#[derive(Clone, Copy)]
enum Kind {
    Array,
    Boolean,
    Object,
    Generic,
}

impl Kind {
    fn parse(lit: &LitStr) -> syn::Result<Self> {
        match lit.value().to_ascii_lowercase().as_str() {
            "array" => Ok(Self::Array),
            "boolean" => Ok(Self::Boolean),
            "object" => Ok(Self::Object),
            "generic" => Ok(Self::Generic),
            _ => Err(syn::Error::new_spanned(
                lit,
                "kind must be one of \"array\", \"boolean\", \"object\", \"generic\"",
            )),
        }
    }

    fn of_type(ty: &Type) -> Self {
        match ty {
            Type::Array(_) | Type::Slice(_) => Self::Array,
            Type::Reference(reference) => Self::of_type(&reference.elem),
            Type::Paren(paren) => Self::of_type(&paren.elem),
            Type::Group(group) => Self::of_type(&group.elem),
            Type::Path(path) => {
                let Some(segment) = path.path.segments.last() else {
                    return Self::Generic;
                };
                match segment.ident.to_string().as_str() {
                    "Vec" | "VecDeque" | "SmallVec" | "HashSet" | "BTreeSet" | "LinkedList"
                    | "BinaryHeap" => Self::Array,
                    "bool" => Self::Boolean,
                    "HashMap" | "BTreeMap" | "Map" | "IndexMap" => Self::Object,
                    "Option" | "Box" | "Arc" | "Rc" => {
                        first_type_argument(&segment.arguments).map_or(Self::Generic, Self::of_type)
                    },
                    _ => Self::Generic,
                }
            },
            _ => Self::Generic,
        }
    }
}

impl ToTokens for Kind {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        let variant = match self {
            Self::Array => quote! { Array },
            Self::Boolean => quote! { Boolean },
            Self::Object => quote! { Object },
            Self::Generic => quote! { Generic },
        };
        tokens.extend(quote! { ::statekit_core::PropertyKind::#variant });
    }
}

/// Options from a field's `#[property(..)]` attributes.
#[derive(Default)]
struct FieldOptions {
    kind: Option<Kind>,
    rename: Option<LitStr>,
    skip: bool,
}

impl FieldOptions {
    fn parse(field: &Field) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("property")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    options.skip = true;
                    Ok(())
                } else if meta.path.is_ident("kind") {
                    let lit: LitStr = meta.value()?.parse()?;
                    options.kind = Some(Kind::parse(&lit)?);
                    Ok(())
                } else if meta.path.is_ident("rename") {
                    options.rename = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error(
                        "unsupported property attribute, expected `kind`, `rename` or `skip`",
                    ))
                }
            })?;
        }
        Ok(options)
    }
}

/// Field name as a property key, without a raw-identifier prefix.
fn field_key(field: &Field) -> String {
    field.ident.as_ref().map_or_else(String::new, |ident| {
        let name = ident.to_string();
        name.strip_prefix("r#").map_or(name.clone(), str::to_string)
    })
}

fn first_type_argument(arguments: &PathArguments) -> Option<&Type> {
    let PathArguments::AngleBracketed(arguments) = arguments else {
        return None;
    };
    arguments.args.iter().find_map(|argument| match argument {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn is_property_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
