use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, Ident, ItemFn, LitStr};

/// Test attribute used across rxcore.
///
/// - `#[rxcore_macro::test]` on a sync fn expands to `#[test]`.
/// - On an async fn it expands to `#[tokio::test]`; `local` selects the
///   current-thread runtime and `shared` the multi-thread one.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);

  let is_async = input.sig.asyncness.is_some();
  let raw_args = proc_macro2::TokenStream::from(attr);

  if !is_async {
    if !raw_args.is_empty() {
      return TokenStream::from(
        syn::Error::new(
          raw_args.span(),
          "rxcore_macro::test flavor args are only supported for async tests",
        )
        .to_compile_error(),
      );
    }
    return TokenStream::from(quote! {
      #[test]
      #input
    });
  }

  let flavor = if raw_args.is_empty() {
    None
  } else if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
    Some((ident.to_string(), ident.span()))
  } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
    Some((lit.value(), lit.span()))
  } else {
    return TokenStream::from(
      syn::Error::new(
        raw_args.span(),
        "rxcore_macro::test only accepts: #[rxcore_macro::test], \
         #[rxcore_macro::test(local)] or #[rxcore_macro::test(shared)]",
      )
      .to_compile_error(),
    );
  };

  let tokio_args = match flavor {
    None => proc_macro2::TokenStream::new(),
    Some((name, span)) => match name.as_str() {
      "local" => quote!(flavor = "current_thread"),
      "shared" => quote!(flavor = "multi_thread"),
      _ => {
        return TokenStream::from(
          syn::Error::new(span, "rxcore_macro::test flavor must be `local` or `shared`")
            .to_compile_error(),
        );
      }
    },
  };

  TokenStream::from(quote! {
    #[tokio::test(#tokio_args)]
    #input
  })
}
