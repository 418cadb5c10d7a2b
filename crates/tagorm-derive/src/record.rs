//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

/// How one field takes part in the mapping.
enum FieldTag {
    Column(LitStr),
    Nested(LitStr),
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut calls = Vec::new();
    for field in fields {
        let Some(tag) = field_tag(field)? else {
            continue;
        };
        if is_pointer(&field.ty) {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_name = ident.to_string();
        calls.push(match tag {
            FieldTag::Column(tag) => quote! {
                builder.column(
                    #field_name,
                    #tag,
                    |r: &Self| &r.#ident,
                    |r: &mut Self| &mut r.#ident,
                );
            },
            FieldTag::Nested(tag) => quote! {
                builder.nested(
                    #field_name,
                    #tag,
                    |r: &Self| &r.#ident,
                    |r: &mut Self| &mut r.#ident,
                );
            },
        });
    }

    let table_name = match table_name(&input)? {
        Some(table) => quote! {
            fn table_name() -> ::core::option::Option<&'static str> {
                ::core::option::Option::Some(#table)
            }
        },
        None => quote! {},
    };

    Ok(quote! {
        impl #impl_generics ::tagorm::Record for #name #ty_generics #where_clause {
            fn describe(builder: &mut ::tagorm::MappingBuilder<Self>) {
                #(#calls)*
            }

            #table_name
        }
    })
}

/// Parse `#[db("column,options")]` or `#[db(nested = "prefix,rel=name")]`.
fn field_tag(field: &syn::Field) -> Result<Option<FieldTag>> {
    for attr in &field.attrs {
        if !attr.path().is_ident("db") {
            continue;
        }
        if let Ok(lit) = attr.parse_args::<LitStr>() {
            return Ok(Some(FieldTag::Column(lit)));
        }
        let nested = attr.parse_args::<syn::MetaNameValue>()?;
        if !nested.path.is_ident("nested") {
            return Err(syn::Error::new_spanned(
                &nested.path,
                "expected #[db(\"column,options\")] or #[db(nested = \"prefix\")]",
            ));
        }
        return match &nested.value {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit),
                ..
            }) => Ok(Some(FieldTag::Nested(lit.clone()))),
            other => Err(syn::Error::new_spanned(other, "nested expects a string literal")),
        };
    }
    Ok(None)
}

/// Extract the table name from a struct-level `#[db(table = "...")]`.
fn table_name(input: &DeriveInput) -> Result<Option<LitStr>> {
    for attr in &input.attrs {
        if !attr.path().is_ident("db") {
            continue;
        }
        let nested = attr.parse_args::<syn::MetaNameValue>()?;
        if !nested.path.is_ident("table") {
            return Err(syn::Error::new_spanned(&nested.path, "expected #[db(table = \"name\")]"));
        }
        if let syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) = &nested.value
        {
            return Ok(Some(lit.clone()));
        }
        return Err(syn::Error::new_spanned(&nested.value, "table expects a string literal"));
    }
    Ok(None)
}

/// References, raw pointers and smart pointers are never mapped.
fn is_pointer(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Reference(_) | syn::Type::Ptr(_) => true,
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|seg| matches!(seg.ident.to_string().as_str(), "Box" | "Rc" | "Arc")),
        syn::Type::Group(group) => is_pointer(&group.elem),
        syn::Type::Paren(paren) => is_pointer(&paren.elem),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(src: &str) -> Result<String> {
        let input: DeriveInput = syn::parse_str(src)?;
        expand(input).map(|tokens| tokens.to_string())
    }

    #[test]
    fn tagged_fields_become_builder_calls() {
        let out = expand_str(
            r#"
            #[db(table = "books")]
            struct Book {
                #[db("id,key,auto")]
                id: i64,
                #[db(nested = "author_,rel=a")]
                author: Author,
                scratch: String,
            }
            "#,
        )
        .unwrap();
        assert!(out.contains("builder . column (\"id\" , \"id,key,auto\""));
        assert!(out.contains("builder . nested (\"author\" , \"author_,rel=a\""));
        assert!(!out.contains("scratch"));
        assert!(out.contains("Some (\"books\")"));
    }

    #[test]
    fn pointer_fields_are_skipped() {
        let out = expand_str(
            r#"
            struct Node {
                #[db("id")]
                id: i64,
                #[db("parent")]
                parent: Box<Node>,
                #[db("shared")]
                shared: std::sync::Arc<String>,
            }
            "#,
        )
        .unwrap();
        assert!(!out.contains("parent"));
        assert!(!out.contains("shared"));
    }

    #[test]
    fn enums_and_tuple_structs_are_rejected() {
        assert!(expand_str("enum E { A }").is_err());
        assert!(expand_str("struct T(#[db(\"a\")] i32);").is_err());
    }

    #[test]
    fn unknown_field_attribute_is_rejected() {
        assert!(expand_str("struct S { #[db(column = \"a\")] a: i32 }").is_err());
    }
}
