extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DataEnum, DeriveInput, Error, Field, Fields,
    GenericParam, Ident, Index, LitStr,
};

/// Derives `packet::Shaped`.
///
/// Structs (named, tuple, or unit) become record shapes whose fields are
/// encoded in declaration order and decoded through a constructor taking every
/// field. With `#[packet(default)]` on the struct, decoding instead starts from
/// `Default::default()` and assigns each field. A field may be given a
/// different wire name with `#[packet(rename = "...")]`.
///
/// Enums without fields become enumerated shapes backed by their `#[repr]`
/// integer type, or `i32` if there is none.
#[proc_macro_derive(Packet, attributes(packet))]
pub fn packet_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    impl_shaped(&ast)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn impl_shaped(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    let shaped_trait = quote! { ::packet::Shaped };
    let shape_type = quote! { ::packet::Shape };

    let name = &ast.ident;
    let mut generics = ast.generics.clone();
    for param in generics.params.iter_mut() {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(::packet::Shaped));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &ast.data {
        Data::Struct(data) => record_shape(&data.fields, &container_attrs(&ast.attrs)?)?,
        Data::Enum(data) => enum_shape(data, &repr_type(&ast.attrs)?)?,
        Data::Union(_) => {
            return Err(Error::new_spanned(
                &ast.ident,
                "Packet cannot be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics #shaped_trait for #name #ty_generics #where_clause {
            fn shape() -> #shape_type<Self> {
                #body
            }
        }
    })
}

#[derive(Default)]
struct ContainerAttrs {
    default: bool,
}

fn container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut ret = ContainerAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("packet")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                ret.default = true;
                Ok(())
            } else {
                Err(meta.error("unsupported packet attribute"))
            }
        })?;
    }
    Ok(ret)
}

fn wire_name(field: &Field, fallback: String) -> syn::Result<LitStr> {
    let mut renamed = None;
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("packet")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                renamed = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported packet field attribute"))
            }
        })?;
    }
    Ok(renamed.unwrap_or_else(|| LitStr::new(&fallback, Span::call_site())))
}

fn record_shape(fields: &Fields, attrs: &ContainerAttrs) -> syn::Result<TokenStream2> {
    let mut calls = Vec::new();
    let mut params = Vec::new();
    let mut args = Vec::new();

    for (ix, field) in fields.iter().enumerate() {
        let ty = &field.ty;
        let (access, fallback) = match &field.ident {
            Some(ident) => (quote! { #ident }, ident.to_string()),
            None => {
                let index = Index::from(ix);
                (quote! { #index }, ix.to_string())
            }
        };
        let name = wire_name(field, fallback)?;

        calls.push(if attrs.default {
            quote! {
                .field_with_setter::<#ty>(#name, |__v| &__v.#access, |__v, __x| __v.#access = __x)
            }
        } else {
            quote! { .field::<#ty>(#name, |__v| &__v.#access) }
        });
        params.push(quote! { .param::<#ty>(#name) });
        args.push(match &field.ident {
            Some(ident) => quote! { #ident: __args.take()? },
            None => quote! { __args.take()? },
        });
    }

    let construct = match fields {
        Fields::Named(_) => quote! { Self { #( #args ),* } },
        Fields::Unnamed(_) => quote! { Self( #( #args ),* ) },
        Fields::Unit => quote! { Self },
    };
    let default = if attrs.default {
        quote! { .default_with(<Self as ::std::default::Default>::default) }
    } else {
        quote! {}
    };

    Ok(quote! {
        ::packet::Shape::record(
            ::packet::RecordShape::<Self>::new()
                #( #calls )*
                #default
                .constructor(
                    ::packet::Constructor::<Self>::new(|__args| {
                        ::std::result::Result::Ok(#construct)
                    })
                    #( #params )*
                )
        )
    })
}

const REPR_TYPES: [&str; 8] = ["u8", "i8", "u16", "i16", "u32", "i32", "u64", "i64"];

fn repr_type(attrs: &[Attribute]) -> syn::Result<Ident> {
    let mut found = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("repr")) {
        attr.parse_nested_meta(|meta| {
            if let Some(ty) = REPR_TYPES.iter().find(|ty| meta.path.is_ident(ty)) {
                found = Some(Ident::new(ty, Span::call_site()));
            } else if meta.input.peek(syn::token::Paren) {
                let _content;
                syn::parenthesized!(_content in meta.input);
            }
            Ok(())
        })?;
    }
    Ok(found.unwrap_or_else(|| Ident::new("i32", Span::call_site())))
}

fn enum_shape(data: &DataEnum, repr: &Ident) -> syn::Result<TokenStream2> {
    for variant in data.variants.iter() {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(Error::new_spanned(
                variant,
                "Packet can only be derived for enums whose variants have no fields",
            ));
        }
    }
    let variants: Vec<&Ident> = data.variants.iter().map(|v| &v.ident).collect();

    Ok(quote! {
        ::packet::Shape::enumerated(::packet::EnumShape::<Self>::of::<#repr>(
            |__v| match *__v {
                #( Self::#variants => Self::#variants as #repr, )*
            },
            |__r| {
                #(
                    if __r == Self::#variants as #repr {
                        return ::std::option::Option::Some(Self::#variants);
                    }
                )*
                ::std::option::Option::None
            },
        ))
    })
}
