//! Newtype IDs for Shopify global identifiers.
//!
//! Shopify identifies every object with an opaque global ID string such as
//! `gid://shopify/ProductVariant/42`. Use the `define_gid!` macro to create
//! type-safe wrappers that prevent accidentally passing a cart line ID where
//! a variant ID is expected.

/// Prefix shared by all Shopify global IDs.
pub const GID_PREFIX: &str = "gid://shopify/";

/// Macro to define a type-safe Shopify global ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`, `numeric_id()`
/// - `From<String>`, `From<&str>`, `Display` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use headless_kit_core::define_gid;
/// define_gid!(OrderGid);
/// define_gid!(CustomerGid);
///
/// let order = OrderGid::new("gid://shopify/Order/1");
/// assert_eq!(order.numeric_id(), Some("1"));
///
/// // These are different types, so this won't compile:
/// // let _: CustomerGid = order;
/// ```
#[macro_export]
macro_rules! define_gid {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying ID string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// The trailing segment of a `gid://shopify/Type/123` ID.
            ///
            /// Returns `None` when the value is not a Shopify global ID.
            #[must_use]
            pub fn numeric_id(&self) -> Option<&str> {
                self.0
                    .strip_prefix($crate::types::id::GID_PREFIX)
                    .and_then(|rest| rest.rsplit('/').next())
                    .map(|tail| tail.split('?').next().unwrap_or(tail))
                    .filter(|tail| !tail.is_empty())
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::convert::AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Shopify object IDs used by the storefront toolkit
define_gid!(CartId);
define_gid!(CartLineId);
define_gid!(ProductId);
define_gid!(VariantId);
define_gid!(CustomerId);
