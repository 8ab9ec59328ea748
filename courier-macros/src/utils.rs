use quote::ToTokens;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Field, FieldsNamed, Ident, Token, Type};

// 提取非 derive 属性与已有 derive 列表
pub(crate) fn split_derives(attrs: &[Attribute]) -> (Vec<Attribute>, Vec<syn::Path>) {
    let mut retained = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs.iter() {
        if attr.path().is_ident("derive") {
            if let Ok(list) = attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated) {
                existing.extend(list);
            }
        } else {
            retained.push(attr.clone());
        }
    }
    (retained, existing)
}

// 合并默认与已有 derive（去重，优先保留 required）
pub(crate) fn merge_derives(existing: Vec<syn::Path>, required: Vec<syn::Path>) -> Attribute {
    let mut seen = std::collections::HashSet::<String>::new();
    let mut final_list: Vec<syn::Path> = Vec::new();
    for p in required.into_iter().chain(existing) {
        if seen.insert(derive_key(&p)) {
            final_list.push(p);
        }
    }
    syn::parse_quote!(#[derive(#(#final_list),*)])
}

// 归一化 derive 的 key，避免 Serialize 与 ::courier::__private::serde::Serialize 重复
pub(crate) fn derive_key(p: &syn::Path) -> String {
    match p.segments.last() {
        Some(last) => {
            let last_ident = last.ident.to_string();
            match last_ident.as_str() {
                "Serialize" | "Deserialize" => format!("serde::{last_ident}"),
                _ => last_ident,
            }
        }
        None => p.to_token_stream().to_string(),
    }
}

// 直接在 attrs 上应用默认派生合并
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<syn::Path>) {
    let (retained, existing) = split_derives(attrs);
    let merged = merge_derives(existing, required);
    *attrs = std::iter::once(merged).chain(retained).collect();
}

/// 确保具名字段结构体包含所需字段
/// - 缺失的字段按给定顺序追加在最前；
/// - 已存在的字段保留原定义与位置。
pub(crate) fn ensure_required_fields(fields_named: &mut FieldsNamed, required: &[(&str, &Type)]) {
    let old_named = fields_named.named.clone();
    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();

    for (name, ty) in required.iter() {
        if !has_field_named(&old_named, name) {
            let ident = Ident::new(name, proc_macro2::Span::call_site());
            new_named.push(syn::parse_quote! { pub #ident: #ty });
        }
    }
    new_named.extend(old_named);

    fields_named.named = new_named;
}

pub(crate) fn has_field_named(named: &Punctuated<Field, Token![,]>, name: &str) -> bool {
    named
        .iter()
        .any(|f| f.ident.as_ref().map(|i| i == name).unwrap_or(false))
}

/// 移除标记属性（如 `#[sensitive]`），返回是否存在
pub(crate) fn take_marker(attrs: &mut Vec<Attribute>, marker: &str) -> syn::Result<bool> {
    let mut found = false;
    let mut retained = Vec::with_capacity(attrs.len());
    for attr in attrs.drain(..) {
        if attr.path().is_ident(marker) {
            if !matches!(attr.meta, syn::Meta::Path(_)) {
                return Err(syn::Error::new(
                    attr.span(),
                    format!("#[{marker}] takes no arguments"),
                ));
            }
            found = true;
        } else {
            retained.push(attr);
        }
    }
    *attrs = retained;
    Ok(found)
}

/// 属性参数：`key = value, ...`，值为字符串字面量或类型
///
/// 解析后按 `allowed` 校验键名并拒绝重复键。
pub(crate) struct AttrArgs {
    pairs: Vec<(Ident, AttrValue)>,
}

enum AttrValue {
    Str(syn::LitStr),
    Type(Type),
}

impl AttrValue {
    fn span(&self) -> proc_macro2::Span {
        match self {
            Self::Str(lit) => lit.span(),
            Self::Type(ty) => ty.span(),
        }
    }
}

impl Parse for AttrArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut pairs: Vec<(Ident, AttrValue)> = Vec::new();

        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value = if input.peek(syn::LitStr) {
                AttrValue::Str(input.parse()?)
            } else {
                AttrValue::Type(input.parse()?)
            };

            if pairs.iter().any(|(k, _)| *k == key) {
                return Err(syn::Error::new(
                    key.span(),
                    format!("duplicate key '{key}' in attribute"),
                ));
            }
            pairs.push((key, value));

            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        Ok(Self { pairs })
    }
}

impl AttrArgs {
    pub(crate) fn check_keys(&self, allowed: &[&str]) -> syn::Result<()> {
        for (key, _) in &self.pairs {
            if !allowed.iter().any(|a| key == a) {
                let expected = allowed
                    .iter()
                    .map(|a| format!("'{a}'"))
                    .collect::<Vec<_>>()
                    .join(" | ");
                return Err(syn::Error::new(
                    key.span(),
                    format!("unknown key; expected {expected}"),
                ));
            }
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Option<&AttrValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub(crate) fn lit_str(&self, key: &str) -> syn::Result<Option<syn::LitStr>> {
        match self.get(key) {
            None => Ok(None),
            Some(AttrValue::Str(lit)) => Ok(Some(lit.clone())),
            Some(other) => Err(syn::Error::new(
                other.span(),
                format!("expected string literal for '{key}'"),
            )),
        }
    }

    pub(crate) fn ty(&self, key: &str) -> syn::Result<Option<Type>> {
        match self.get(key) {
            None => Ok(None),
            Some(AttrValue::Type(ty)) => Ok(Some(ty.clone())),
            Some(other) => Err(syn::Error::new(
                other.span(),
                format!("expected a type for '{key}'"),
            )),
        }
    }
}
