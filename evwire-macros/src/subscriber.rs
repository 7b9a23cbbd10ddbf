use crate::utils::is_marker;
use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::spanned::Spanned;
use syn::{FnArg, Ident, ImplItem, ImplItemFn, Item, Result, Type, parse_macro_input};

/// #[subscriber] 宏实现
/// - 仅支持非泛型的固有 impl 块
/// - 移除方法上的 `#[handles_event]`，并为形状合法的方法生成 `HandlerDescriptor`
/// - 参数 `strict`：形状不合法的标记方法报错（默认静默排除）
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as SubscriberArgs);
    let mut input = parse_macro_input!(item as Item);

    let item_impl = match &mut input {
        Item::Impl(i) => i,
        other => {
            return syn::Error::new(other.span(), "#[subscriber] can only be used on impl blocks")
                .to_compile_error()
                .into();
        }
    };

    if let Some((_, path, _)) = &item_impl.trait_ {
        return syn::Error::new(
            path.span(),
            "#[subscriber] must be used on an inherent impl block",
        )
        .to_compile_error()
        .into();
    }
    if !item_impl.generics.params.is_empty() {
        return syn::Error::new(
            item_impl.generics.span(),
            "#[subscriber] does not support generic impl blocks",
        )
        .to_compile_error()
        .into();
    }

    let mut descriptors = Vec::new();
    let mut errors: Option<syn::Error> = None;

    for impl_item in item_impl.items.iter_mut() {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };

        let before = method.attrs.len();
        method.attrs.retain(|a| !is_marker(a));
        if method.attrs.len() == before {
            continue;
        }

        match handler_shape(method) {
            Ok(shape) => descriptors.push(shape.descriptor(&method.sig.ident)),
            Err(err) if args.strict => {
                errors = Some(match errors.take() {
                    Some(mut all) => {
                        all.combine(err);
                        all
                    }
                    None => err,
                });
            }
            // 不合法的处理方法形状：排除
            Err(_) => {}
        }
    }

    if let Some(err) = errors {
        return err.to_compile_error().into();
    }

    let self_ty = item_impl.self_ty.clone();
    let out = quote! {
        #input

        impl ::evwire_core::Subscriber for #self_ty {
            fn handlers() -> ::std::vec::Vec<::evwire_core::HandlerDescriptor> {
                ::std::vec![ #( #descriptors ),* ]
            }
        }
    };

    TokenStream::from(out)
}

struct SubscriberArgs {
    strict: bool,
}

impl Parse for SubscriberArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self { strict: false });
        }
        let key: Ident = input.parse()?;
        if key != "strict" {
            return Err(syn::Error::new(
                key.span(),
                "unknown argument; expected 'strict'",
            ));
        }
        if !input.is_empty() {
            return Err(input.error("unexpected tokens after 'strict'"));
        }
        Ok(Self { strict: true })
    }
}

enum PayloadParam {
    Borrowed(Type),
    Owned(Type),
}

impl PayloadParam {
    fn descriptor(&self, method: &Ident) -> proc_macro2::TokenStream {
        let name = syn::LitStr::new(&method.unraw().to_string(), method.span());
        match self {
            Self::Borrowed(ty) => quote! {
                ::evwire_core::HandlerDescriptor::new::<Self, #ty, _, _>(
                    #name,
                    |s: &Self, e: &#ty| s.#method(e),
                )
            },
            Self::Owned(ty) => quote! {
                ::evwire_core::HandlerDescriptor::new::<Self, #ty, _, _>(
                    #name,
                    |s: &Self, e: &#ty| s.#method(::core::clone::Clone::clone(e)),
                )
            },
        }
    }
}

// 合法形状：非泛型、同步、`&self` + 恰好一个参数（`&T` 或 `T`）
fn handler_shape(method: &ImplItemFn) -> Result<PayloadParam> {
    let sig = &method.sig;
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "event handler methods must not be generic",
        ));
    }
    if let Some(token) = &sig.asyncness {
        return Err(syn::Error::new(
            token.span(),
            "event handler methods must be synchronous",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(r)) if r.reference.is_some() && r.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new(
                sig.ident.span(),
                "event handler methods must take `&self`",
            ));
        }
    }

    let payload = match (inputs.next(), inputs.next()) {
        (Some(FnArg::Typed(pat)), None) => &pat.ty,
        _ => {
            return Err(syn::Error::new(
                sig.ident.span(),
                "event handler methods must take exactly one payload parameter",
            ));
        }
    };

    match payload.as_ref() {
        Type::Reference(r) if r.mutability.is_some() => Err(syn::Error::new(
            r.span(),
            "event payload cannot be taken by `&mut`",
        )),
        Type::Reference(r) => Ok(PayloadParam::Borrowed((*r.elem).clone())),
        Type::ImplTrait(t) => Err(syn::Error::new(
            t.span(),
            "event payload must be a concrete type",
        )),
        ty => Ok(PayloadParam::Owned(ty.clone())),
    }
}
