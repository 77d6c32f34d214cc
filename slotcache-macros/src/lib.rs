use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, ItemFn, Type};

// Import shared utilities
use slotcache_macro_utils::{
    check_receiver, collect_args, frozen_return_type, generate_key_expr, parse_member_attributes,
    result_ok_type, return_type, MemberAttributes,
};

/// Which cache a macro expands to
#[derive(Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Property,
    Method,
    ArgsMethod,
    ClassProperty,
}

impl MemberKind {
    fn macro_name(self) -> &'static str {
        match self {
            MemberKind::Property => "cached_property",
            MemberKind::Method => "cached_method",
            MemberKind::ArgsMethod => "cached_args_method",
            MemberKind::ClassProperty => "class_cached_property",
        }
    }
}

/// Wrap the original body so `return` and `?` keep their meaning
fn generate_compute_expr(ret_type: &Type, block: &syn::Block) -> TokenStream2 {
    quote! { (|| -> #ret_type #block)() }
}

/// Build the closure body handed to the cache: compute, then freeze if asked
fn generate_prepare_expr(compute: &TokenStream2, freeze: bool, is_result: bool) -> TokenStream2 {
    match (freeze, is_result) {
        (false, _) => quote! { #compute },
        (true, false) => quote! { ::slotcache::Freeze::freeze(#compute) },
        (true, true) => quote! { #compute.map(::slotcache::Freeze::freeze) },
    }
}

fn expand(kind: MemberKind, attr: TokenStream, input: ItemFn) -> TokenStream2 {
    let attrs: MemberAttributes = match parse_member_attributes(attr.into()) {
        Ok(attrs) => attrs,
        Err(err) => return err,
    };

    let ItemFn {
        attrs: fn_attrs,
        vis,
        sig,
        block,
    } = input;
    let ident = &sig.ident;

    if let Err(err) = check_receiver(&sig, kind.macro_name()) {
        return err;
    }

    let args = match collect_args(&sig) {
        Ok(args) => args,
        Err(err) => return err,
    };
    if kind == MemberKind::ArgsMethod && args.is_empty() {
        return syn::Error::new_spanned(
            ident,
            "#[cached_args_method] needs at least one argument; use #[cached_method]",
        )
        .to_compile_error();
    }
    if kind != MemberKind::ArgsMethod && !args.is_empty() {
        let msg = format!(
            "#[{}] takes no arguments besides `&self`; use #[cached_args_method]",
            kind.macro_name()
        );
        return syn::Error::new_spanned(ident, msg).to_compile_error();
    }

    let ret_type = return_type(&sig);
    let is_result = result_ok_type(&ret_type).is_some();
    let stored_type = if attrs.freeze {
        frozen_return_type(&ret_type)
    } else {
        ret_type.clone()
    };

    // Use custom name if provided, otherwise use the method name
    let slot_name = attrs.custom_name.unwrap_or_else(|| ident.to_string());

    let compute = generate_compute_expr(&ret_type, &block);
    let prepare = generate_prepare_expr(&compute, attrs.freeze, is_result);

    let mut new_sig = sig.clone();
    new_sig.output = if kind == MemberKind::ClassProperty && !is_result {
        syn::parse_quote! { -> ::slotcache::Result<#stored_type> }
    } else {
        syn::parse_quote! { -> #stored_type }
    };

    let resolve = if is_result { quote! { try_resolve } } else { quote! { resolve } };
    let resolve_keyed = if is_result {
        quote! { try_resolve_keyed }
    } else {
        quote! { resolve_keyed }
    };

    match kind {
        MemberKind::Property => {
            let slot_fn = format_ident!("__slotcache_slot_{}", ident);
            let invalidate_fn = format_ident!("invalidate_{}", ident);
            let invalidate_doc = format!(
                "Drops the cached value of `{}`. Returns `true` when a value was removed; the next read recomputes.",
                ident
            );

            quote! {
                #[doc(hidden)]
                #[inline]
                fn #slot_fn() -> &'static ::slotcache::Slot {
                    static __SLOTCACHE_SLOT: ::slotcache::Slot = ::slotcache::Slot::new(#slot_name);
                    &__SLOTCACHE_SLOT
                }

                #(#fn_attrs)*
                #vis #new_sig {
                    let __slot = Self::#slot_fn();
                    __slot.register_stats();
                    ::slotcache::InstanceStorage::instance_cache(self)
                        .#resolve(__slot, || #prepare)
                }

                #[doc = #invalidate_doc]
                #vis fn #invalidate_fn(&self) -> bool {
                    ::slotcache::InstanceStorage::instance_cache(self)
                        .remove(Self::#slot_fn().id())
                }
            }
        }
        MemberKind::Method => quote! {
            #(#fn_attrs)*
            #vis #new_sig {
                static __SLOTCACHE_SLOT: ::slotcache::Slot = ::slotcache::Slot::new(#slot_name);
                __SLOTCACHE_SLOT.register_stats();
                ::slotcache::InstanceStorage::instance_cache(self)
                    .#resolve(&__SLOTCACHE_SLOT, || #prepare)
            }
        },
        MemberKind::ArgsMethod => {
            let key_expr = generate_key_expr(&args);
            quote! {
                #(#fn_attrs)*
                #vis #new_sig {
                    static __SLOTCACHE_SLOT: ::slotcache::Slot = ::slotcache::Slot::new(#slot_name);
                    __SLOTCACHE_SLOT.register_stats();
                    let __key = #key_expr;
                    ::slotcache::InstanceStorage::instance_cache(self)
                        .#resolve_keyed(&__SLOTCACHE_SLOT, __key, |_| #prepare)
                }
            }
        }
        MemberKind::ClassProperty => {
            let resolve_shared = if is_result {
                quote! { ::slotcache::try_resolve_shared }
            } else {
                quote! { ::slotcache::resolve_shared }
            };
            quote! {
                #(#fn_attrs)*
                #vis #new_sig {
                    static __SLOTCACHE_SLOT: ::slotcache::Slot = ::slotcache::Slot::new(#slot_name);
                    __SLOTCACHE_SLOT.register_stats();
                    #resolve_shared(self, &__SLOTCACHE_SLOT, || #prepare)
                }
            }
        }
    }
}

/// Turns a `&self` method into a lazily computed, per-object property.
///
/// The first call computes the body and stores the result in the object's
/// `InstanceCache`; every later call returns the stored value without
/// running the body, whatever happened to the object in between. The macro
/// also generates `invalidate_<name>(&self) -> bool`, which drops the stored
/// value so the next call recomputes.
///
/// # Requirements
///
/// - **Owner**: `Self: InstanceStorage`
/// - **Signature**: `&self` only, no other arguments, inherent `impl` block
///   (the companion items cannot live in a trait impl), no type or const
///   parameters
/// - **Return type**: `Clone + 'static`
///
/// # Macro Parameters
///
/// - `freeze` (optional): store the value in its frozen form. The method then
///   returns `<R as Freeze>::Frozen` (`Vec<T>` becomes `Arc<[T]>`, `HashMap`
///   becomes `FrozenMap`, ...), and every call returns the same allocation.
/// - `name` (optional): name used in the statistics registry. Default: the
///   method name.
///
/// # Cache Behavior
///
/// - **Regular return types**: the first result is stored
/// - **Result-returning methods**: only `Ok` values are stored, an `Err` is
///   returned and the next call retries
/// - **Panics**: propagate, nothing is stored
///
/// # Examples
///
/// ```ignore
/// use slotcache::{cached_property, InstanceCache, InstanceStorage};
///
/// struct Circle {
///     radius: f64,
///     cache: InstanceCache,
/// }
///
/// impl InstanceStorage for Circle {
///     fn instance_cache(&self) -> &InstanceCache {
///         &self.cache
///     }
/// }
///
/// impl Circle {
///     #[cached_property]
///     fn area(&self) -> f64 {
///         std::f64::consts::PI * self.radius * self.radius
///     }
///
///     #[cached_property(freeze, name = "Circle::outline")]
///     fn outline(&self) -> Vec<(f64, f64)> {
///         (0..360).map(|deg| (deg as f64).to_radians().sin_cos()).collect()
///     }
/// }
///
/// let circle = Circle { radius: 2.0, cache: InstanceCache::new() };
/// let area = circle.area();
/// assert!(circle.invalidate_area());
/// ```
#[proc_macro_attribute]
pub fn cached_property(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    TokenStream::from(expand(MemberKind::Property, attr, input))
}

/// Memoizes a `&self` method without arguments, once per object.
///
/// Like [`macro@cached_property`] but without an invalidation companion:
/// the stored result lives as long as the object's `InstanceCache`.
/// Differently named cached methods on the same object never share an
/// entry.
///
/// Accepts the same `freeze` and `name` parameters.
///
/// # Examples
///
/// ```ignore
/// use slotcache::{cached_method, InstanceCache, InstanceStorage};
///
/// struct Config {
///     raw: String,
///     cache: InstanceCache,
/// }
///
/// impl InstanceStorage for Config {
///     fn instance_cache(&self) -> &InstanceCache {
///         &self.cache
///     }
/// }
///
/// impl Config {
///     #[cached_method]
///     fn port(&self) -> Result<u16, std::num::ParseIntError> {
///         self.raw.trim().parse()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn cached_method(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    TokenStream::from(expand(MemberKind::Method, attr, input))
}

/// Memoizes a `&self` method per object and per argument tuple.
///
/// The arguments are copied into a tuple that keys a per-object map: a new
/// tuple computes and stores, a known tuple returns the stored result. The
/// map is never evicted.
///
/// # Requirements
///
/// - **Owner**: `Self: InstanceStorage`
/// - **Arguments**: plain identifiers. Owned arguments are cloned into the
///   key, reference arguments are converted with `ToOwned` (`&str` is keyed
///   as `String`). Key types must be `Hash + Eq + 'static`.
/// - **Signature**: no type or const parameters
///
/// Accepts the same `freeze` and `name` parameters.
///
/// # Examples
///
/// ```ignore
/// use slotcache::{cached_args_method, InstanceCache, InstanceStorage};
///
/// struct Router {
///     routes: Vec<String>,
///     cache: InstanceCache,
/// }
///
/// impl InstanceStorage for Router {
///     fn instance_cache(&self) -> &InstanceCache {
///         &self.cache
///     }
/// }
///
/// impl Router {
///     #[cached_args_method]
///     fn matching(&self, prefix: &str, limit: usize) -> Vec<String> {
///         self.routes
///             .iter()
///             .filter(|route| route.starts_with(prefix))
///             .take(limit)
///             .cloned()
///             .collect()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn cached_args_method(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    TokenStream::from(expand(MemberKind::ArgsMethod, attr, input))
}

/// Computes a `&self` property once per exact type and shares it between
/// all objects of that type.
///
/// Values live in the `ClassCache` the type reports through `ClassScoped`,
/// keyed by the object's exact `ClassId`: types sharing a trait and a cache
/// root never see each other's value. When the object exposes
/// `mirror_storage`, the value is also copied into it and later calls on
/// that object read the copy.
///
/// # Requirements
///
/// - **Owner**: `Self: ClassScoped`
/// - **Signature**: `&self` only, no type or const parameters
/// - **Return type**: `Clone + Send + Sync + 'static`
///
/// The generated method returns `slotcache::Result<R>` and fails with
/// `CacheError::MissingClassCache` when the type provides no class cache.
/// Methods that already return `Result<T, E>` keep their signature and
/// require `E: From<CacheError>`.
///
/// Accepts the same `freeze` and `name` parameters.
///
/// # Examples
///
/// ```ignore
/// use once_cell::sync::Lazy;
/// use slotcache::{class_cached_property, ClassCache, ClassId, ClassScoped};
///
/// static PLUGINS: Lazy<ClassCache> = Lazy::new(ClassCache::new);
///
/// struct Exporter;
///
/// impl ClassScoped for Exporter {
///     fn class_id(&self) -> ClassId {
///         ClassId::of::<Self>()
///     }
///
///     fn class_cache(&self) -> Option<&ClassCache> {
///         Some(&*PLUGINS)
///     }
/// }
///
/// impl Exporter {
///     #[class_cached_property]
///     fn formats(&self) -> Vec<&'static str> {
///         vec!["csv", "json"]
///     }
/// }
///
/// assert_eq!(Exporter.formats().unwrap(), vec!["csv", "json"]);
/// ```
#[proc_macro_attribute]
pub fn class_cached_property(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    TokenStream::from(expand(MemberKind::ClassProperty, attr, input))
}
