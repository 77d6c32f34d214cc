//! Shared utilities for slotcache procedural macros
//!
//! Attribute parsing, signature checks and the small type rewrites used by
//! every attribute macro in `slotcache-macros`.

use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    punctuated::Punctuated, Expr, FnArg, GenericArgument, GenericParam, Ident, Meta, MetaNameValue, Pat,
    PathArguments, ReturnType, Signature, Token, Type,
};

/// Parsed attributes of a cached member
#[derive(Default)]
pub struct MemberAttributes {
    /// Store values in their frozen form (`freeze` / `freeze = true`)
    pub freeze: bool,
    /// Statistics name (`name = "..."`)
    pub custom_name: Option<String>,
}

/// A named, typed argument of a cached method
pub struct ArgInfo {
    pub ident: Ident,
    pub ty: Type,
}

/// Parse the `name` attribute
pub fn parse_name_attribute(nv: &MetaNameValue) -> Result<String, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            syn::Lit::Str(s) => Ok(s.value()),
            _ => Err(quote! { compile_error!("Invalid literal for `name`: expected string") }),
        },
        _ => Err(quote! { compile_error!("Invalid syntax for `name`: expected `name = \"...\"`") }),
    }
}

/// Parse the `freeze = <bool>` attribute
pub fn parse_freeze_attribute(nv: &MetaNameValue) -> Result<bool, TokenStream2> {
    match &nv.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            syn::Lit::Bool(b) => Ok(b.value),
            _ => Err(quote! { compile_error!("Invalid literal for `freeze`: expected `true` or `false`") }),
        },
        _ => Err(quote! { compile_error!("Invalid syntax for `freeze`: expected `freeze` or `freeze = <bool>`") }),
    }
}

/// Parse member attributes from a token stream
pub fn parse_member_attributes(attr: TokenStream2) -> Result<MemberAttributes, TokenStream2> {
    use syn::parse::Parser;

    let parser = Punctuated::<Meta, Token![,]>::parse_terminated;
    let parsed_args = parser.parse2(attr).map_err(|e| {
        let msg = format!("Failed to parse attributes: {}", e);
        quote! { compile_error!(#msg) }
    })?;

    let mut attrs = MemberAttributes::default();

    for meta in parsed_args {
        match meta {
            Meta::Path(path) if path.is_ident("freeze") => attrs.freeze = true,
            Meta::NameValue(nv) if nv.path.is_ident("freeze") => {
                attrs.freeze = parse_freeze_attribute(&nv)?;
            }
            Meta::NameValue(nv) if nv.path.is_ident("name") => {
                attrs.custom_name = Some(parse_name_attribute(&nv)?);
            }
            other => {
                let msg = format!(
                    "Unknown attribute `{}`: expected `freeze` or `name = \"...\"`",
                    other.path().to_token_stream()
                );
                return Err(quote! { compile_error!(#msg) });
            }
        }
    }

    Ok(attrs)
}

/// Check that the method takes `&self`, has no type or const parameters and is not `async`
pub fn check_receiver(sig: &Signature, macro_name: &str) -> Result<(), TokenStream2> {
    if sig.asyncness.is_some() {
        let msg = format!("#[{}] does not support async methods", macro_name);
        return Err(syn::Error::new_spanned(sig, msg).to_compile_error());
    }

    // One static slot backs every instantiation of the method, so type and
    // const parameters would share a single cache entry.
    if let Some(param) = sig
        .generics
        .params
        .iter()
        .find(|param| !matches!(param, GenericParam::Lifetime(_)))
    {
        let msg = format!(
            "#[{}] does not support generic type or const parameters",
            macro_name
        );
        return Err(syn::Error::new_spanned(param, msg).to_compile_error());
    }

    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) if is_shared_self(&receiver.ty) => Ok(()),
        _ => {
            let msg = format!(
                "#[{}] requires a `&self` (or `self: &Self`) receiver",
                macro_name
            );
            Err(syn::Error::new_spanned(&sig.ident, msg).to_compile_error())
        }
    }
}

/// `&self` and `self: &Self` both carry the type `&Self`
fn is_shared_self(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) if reference.mutability.is_none() => {
            matches!(&*reference.elem, Type::Path(path) if path.qself.is_none() && path.path.is_ident("Self"))
        }
        _ => false,
    }
}

/// Collect the non-receiver arguments; only plain identifier patterns are
/// accepted because each argument is cloned into the cache key by name.
pub fn collect_args(sig: &Signature) -> Result<Vec<ArgInfo>, TokenStream2> {
    let mut args = Vec::new();
    for arg in sig.inputs.iter() {
        if let FnArg::Typed(pat_type) = arg {
            match &*pat_type.pat {
                Pat::Ident(pat_ident) if pat_ident.subpat.is_none() => args.push(ArgInfo {
                    ident: pat_ident.ident.clone(),
                    ty: (*pat_type.ty).clone(),
                }),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "cached arguments must be plain identifiers",
                    )
                    .to_compile_error());
                }
            }
        }
    }
    Ok(args)
}

/// Generate the cache key expression: a tuple of owned copies of the
/// arguments. Reference arguments are converted with `ToOwned`, so `&str`
/// keys are stored as `String`.
pub fn generate_key_expr(args: &[ArgInfo]) -> TokenStream2 {
    let parts = args.iter().map(|arg| {
        let ident = &arg.ident;
        match &arg.ty {
            Type::Reference(_) => quote! { ::std::borrow::ToOwned::to_owned(#ident) },
            _ => quote! { ::std::clone::Clone::clone(&#ident) },
        }
    });
    quote! { ( #( #parts, )* ) }
}

/// The declared return type, `()` when omitted
pub fn return_type(sig: &Signature) -> Type {
    match &sig.output {
        ReturnType::Type(_, ty) => (**ty).clone(),
        ReturnType::Default => syn::parse_quote! { () },
    }
}

/// If `ty` looks like `Result<T, ..>` (any path ending in `Result`), return `T`
pub fn result_ok_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let last = type_path.path.segments.last()?;
    if last.ident != "Result" {
        return None;
    }
    match &last.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        }),
        _ => None,
    }
}

/// Rewrite `R` into `<R as Freeze>::Frozen`, or `Result<T, E>` into
/// `Result<<T as Freeze>::Frozen, E>`
pub fn frozen_return_type(ty: &Type) -> Type {
    let Some(ok_type) = result_ok_type(ty) else {
        return syn::parse_quote! { <#ty as ::slotcache::Freeze>::Frozen };
    };

    let frozen_ok: Type = syn::parse_quote! { <#ok_type as ::slotcache::Freeze>::Frozen };
    let mut rewritten = ty.clone();
    if let Type::Path(type_path) = &mut rewritten {
        if let Some(last) = type_path.path.segments.last_mut() {
            if let PathArguments::AngleBracketed(args) = &mut last.arguments {
                if let Some(first) = args.args.iter_mut().find_map(|arg| match arg {
                    GenericArgument::Type(ty) => Some(ty),
                    _ => None,
                }) {
                    *first = frozen_ok;
                }
            }
        }
    }
    rewritten
}
