use crate::utils::{AttrArgs, apply_derives};
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{DeriveInput, parse_macro_input};

/// 请求类宏的两种形态
#[derive(Clone, Copy)]
pub(crate) enum RequestKind {
    /// `#[request(response = T)]` → `::courier::message::Request`
    Request,
    /// `#[stream_request(item = T)]` → `::courier::message::StreamRequest`
    Stream,
}

impl RequestKind {
    fn attr_name(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Stream => "stream_request",
        }
    }

    fn value_key(self) -> &'static str {
        match self {
            Self::Request => "response",
            Self::Stream => "item",
        }
    }
}

pub(crate) fn expand(kind: RequestKind, attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AttrArgs);
    let input = parse_macro_input!(item as DeriveInput);

    match expand_request(kind, args, input) {
        Ok(out) => out.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_request(
    kind: RequestKind,
    args: AttrArgs,
    mut input: DeriveInput,
) -> syn::Result<proc_macro2::TokenStream> {
    let value_key = kind.value_key();
    args.check_keys(&["name", value_key])?;

    let Some(value_ty) = args.ty(value_key)? else {
        return Err(syn::Error::new(
            input.ident.span(),
            format!("#[{}] requires `{value_key} = Type`", kind.attr_name()),
        ));
    };

    if matches!(input.data, syn::Data::Union(_)) {
        return Err(syn::Error::new(
            input.span(),
            format!("#[{}] cannot be used on unions", kind.attr_name()),
        ));
    }

    apply_derives(&mut input.attrs, vec![syn::parse_quote!(Debug)]);

    let ident = &input.ident;
    let name = match args.lit_str("name")? {
        Some(lit) => lit,
        None => syn::LitStr::new(&ident.to_string(), ident.span()),
    };
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match kind {
        RequestKind::Request => quote! {
            impl #impl_generics ::courier::message::Request for #ident #ty_generics #where_clause {
                const NAME: &'static str = #name;
                type Response = #value_ty;
            }
        },
        RequestKind::Stream => quote! {
            impl #impl_generics ::courier::message::StreamRequest for #ident #ty_generics #where_clause {
                const NAME: &'static str = #name;
                type Item = #value_ty;
            }
        },
    };

    Ok(quote! {
        #input

        #body
    })
}
