use crate::utils::event_payload;
use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Item, parse_macro_input};

/// #[publisher] 宏实现
/// - 仅支持非泛型、具名字段结构体
/// - 按字段声明顺序生成 `EventDescriptor::new::<Self, T>("field", |p| &p.field)`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[publisher] takes no arguments",
        )
        .to_compile_error()
        .into();
    }

    let input = parse_macro_input!(item as Item);
    let st = match input {
        Item::Struct(s) => s,
        other => {
            let span = match &other {
                Item::Enum(e) => e.ident.span(),
                Item::Union(u) => u.ident.span(),
                _ => other.span(),
            };
            return syn::Error::new(span, "#[publisher] can only be used on struct types")
                .to_compile_error()
                .into();
        }
    };

    if !st.generics.params.is_empty() {
        return syn::Error::new(
            st.generics.span(),
            "#[publisher] does not support generic structs",
        )
        .to_compile_error()
        .into();
    }

    let fields = match &st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    let descriptors = fields.named.iter().filter_map(|f| {
        let payload = event_payload(&f.ty)?;
        let ident = f.ident.as_ref()?;
        let name = syn::LitStr::new(&ident.unraw().to_string(), ident.span());
        Some(quote! {
            ::evwire_core::EventDescriptor::new::<Self, #payload>(#name, |p: &Self| &p.#ident)
        })
    });

    let ident = &st.ident;
    let out = quote! {
        #st

        impl ::evwire_core::Publisher for #ident {
            fn events() -> ::std::vec::Vec<::evwire_core::EventDescriptor> {
                ::std::vec![ #( #descriptors ),* ]
            }
        }
    };

    TokenStream::from(out)
}
