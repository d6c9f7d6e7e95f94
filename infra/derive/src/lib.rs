#![allow(unreachable_pub)]

//! # Macros
//!
//! Procedural macros for the stow infrastructure crates.
//!
//! Only one macro lives here today: [`macro@stow_error`], which turns a plain enum into a
//! `thiserror`-backed error type with context support. Consumers must depend on
//! `thiserror` themselves because the expansion refers to `::thiserror::Error`.

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for domain error enums.
///
/// # Features
///
/// * **Derives**: injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context**: generates a companion `<Name>Ext` trait with `.context(...)` for
///   `Result<T, Name>` and for `Result<T, Source>` of every variant wrapping a source.
/// * **Conversions**: `From<Source>` for each variant with a `source` field (or a field
///   marked `#[source]` / `#[from]`), so `?` works on upstream errors.
/// * **Message fallback**: `From<&'static str>` and `From<String>` when an `Internal`
///   variant carrying a `message` field exists.
/// * **`format_context`**: a module-level helper rendering `" (context)"` or nothing,
///   meant to be used from `#[error(...)]` strings.
///
/// # Requirements
///
/// 1. Only enums are accepted.
/// 2. Every variant uses named fields; tuple and unit variants are rejected.
/// 3. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 4. Variants with a source must also carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[stow_derive::stow_error]
/// pub enum UploadError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Rejected{}: {message}", format_context(.context))]
///     Rejected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn open(path: &std::path::Path) -> Result<std::fs::File, UploadError> {
///     std::fs::File::open(path).context("Opening upload")
/// }
/// ```
#[proc_macro_attribute]
pub fn stow_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
