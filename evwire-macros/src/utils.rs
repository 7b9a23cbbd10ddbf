use syn::{Attribute, GenericArgument, PathArguments, Type};

// 取出 `Event<T>`（或 `path::Event<T>`）中的 `T`
pub(crate) fn event_payload(ty: &Type) -> Option<&Type> {
    let Type::Path(tp) = ty else {
        return None;
    };
    if tp.qself.is_some() {
        return None;
    }
    let last = tp.path.segments.last()?;
    if last.ident != "Event" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(t) => Some(t),
        _ => None,
    });
    match (types.next(), types.next()) {
        (Some(t), None) => Some(t),
        _ => None,
    }
}

// `#[handles_event]` 或 `#[evwire_macros::handles_event]`
pub(crate) fn is_marker(attr: &Attribute) -> bool {
    attr.path()
        .segments
        .last()
        .map(|s| s.ident == "handles_event")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::ToTokens;

    #[test]
    fn recognizes_event_fields() {
        let ty: Type = syn::parse_quote!(Event<UserCreated>);
        assert_eq!(
            event_payload(&ty).unwrap().to_token_stream().to_string(),
            "UserCreated"
        );

        let ty: Type = syn::parse_quote!(::evwire_core::Event<crate::a::B>);
        assert!(event_payload(&ty).is_some());

        let ty: Type = syn::parse_quote!(Vec<UserCreated>);
        assert!(event_payload(&ty).is_none());

        let ty: Type = syn::parse_quote!(Event);
        assert!(event_payload(&ty).is_none());
    }

    #[test]
    fn recognizes_marker_paths() {
        let attr: Attribute = syn::parse_quote!(#[handles_event]);
        assert!(is_marker(&attr));
        let attr: Attribute = syn::parse_quote!(#[evwire_macros::handles_event]);
        assert!(is_marker(&attr));
        let attr: Attribute = syn::parse_quote!(#[inline]);
        assert!(!is_marker(&attr));
    }
}
