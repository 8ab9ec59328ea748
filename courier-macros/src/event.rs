use crate::utils::{AttrArgs, apply_derives, ensure_required_fields, take_marker};
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, Type, parse_macro_input};

/// #[event] 宏实现
/// - 仅支持具名字段结构体
/// - 确保具备字段：`id: Uuid`, `occurred_at: DateTime<Utc>`（缺失时追加在最前）
/// - 合并派生：Debug, Clone, PartialEq, Serialize
/// - `#[sensitive]` 字段改写为 `#[serde(skip_serializing)]`，不会进入审计载荷
/// - 生成 `::courier::message::Event` 实现与填充 id/时间的 `new(..)`
/// - 支持：`#[event(name = "...")]` 覆写事件名（默认结构体名）
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AttrArgs);
    let input = parse_macro_input!(item as Item);

    match expand_struct(args, input) {
        Ok(out) => out.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_struct(args: AttrArgs, input: Item) -> syn::Result<proc_macro2::TokenStream> {
    args.check_keys(&["name"])?;

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return Err(syn::Error::new(
                other.span(),
                "#[event] can only be used on struct types",
            ));
        }
    };

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return Err(syn::Error::new(
                st.span(),
                "#[event] supports only named-field structs, e.g., struct X { a: T }",
            ));
        }
    };

    let uuid_ty: Type = syn::parse_quote! { ::courier::__private::uuid::Uuid };
    let time_ty: Type = syn::parse_quote! {
        ::courier::__private::chrono::DateTime<::courier::__private::chrono::Utc>
    };
    ensure_required_fields(fields_named, &[("id", &uuid_ty), ("occurred_at", &time_ty)]);

    // 敏感字段：序列化时跳过
    for field in fields_named.named.iter_mut() {
        if take_marker(&mut field.attrs, "sensitive")? {
            field.attrs.push(syn::parse_quote!(#[serde(skip_serializing)]));
        }
    }

    // new(..) 的参数：除 id / occurred_at 外的全部字段，保持声明顺序
    let (params, names): (Vec<_>, Vec<_>) = fields_named
        .named
        .iter()
        .filter_map(|f| {
            let ident = f.ident.as_ref()?;
            if ident == "id" || ident == "occurred_at" {
                return None;
            }
            let ty = &f.ty;
            Some((quote! { #ident: #ty }, ident.clone()))
        })
        .unzip();

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(::courier::__private::serde::Serialize),
    ];
    apply_derives(&mut st.attrs, required);
    st.attrs
        .push(syn::parse_quote!(#[serde(crate = "::courier::__private::serde")]));

    let ident = &st.ident;
    let name = match args.lit_str("name")? {
        Some(lit) => lit,
        None => syn::LitStr::new(&ident.to_string(), ident.span()),
    };
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    Ok(quote! {
        #st

        impl #impl_generics ::courier::message::Event for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;

            fn event_id(&self) -> ::courier::__private::uuid::Uuid {
                self.id
            }

            fn occurred_at(&self) -> ::courier::__private::chrono::DateTime<::courier::__private::chrono::Utc> {
                self.occurred_at
            }
        }

        impl #impl_generics #ident #ty_generics #where_clause {
            /// 创建事件，自动生成 id 与发生时间
            #[allow(clippy::too_many_arguments)]
            pub fn new(#(#params),*) -> Self {
                Self {
                    id: ::courier::__private::uuid::Uuid::new_v4(),
                    occurred_at: ::courier::__private::chrono::Utc::now(),
                    #(#names),*
                }
            }
        }
    })
}
