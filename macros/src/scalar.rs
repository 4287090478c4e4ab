use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields};

/// `ToField` / `FromField` for a fieldless enum, encoded by variant name.
pub fn new(ast: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let enum_ident = &ast.ident;
    let enum_name = enum_ident.to_string();
    let Data::Enum(data) = &ast.data else {
        return Err(syn::Error::new(ast.span(), "`#[derive(Scalar)]` only supports enums"));
    };
    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new(ast.generics.span(), "`#[derive(Scalar)]` does not support generic enums"));
    }
    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(variant.span(), "`#[derive(Scalar)]` only supports fieldless variants"));
        }
        variants.push(&variant.ident);
    }
    let names: Vec<String> = variants.iter().map(|v| v.to_string()).collect();

    Ok(quote! {
        impl ::rohm::ToField for #enum_ident {
            fn to_field(&self) -> String {
                match self {
                    #( #enum_ident::#variants => #names.to_string(), )*
                }
            }
        }

        impl ::rohm::FromField for #enum_ident {
            fn from_field(raw: &str) -> Result<Self, String> {
                match raw {
                    #( #names => Ok(#enum_ident::#variants), )*
                    other => Err(::rohm::codec::unknown_variant(#enum_name, other, &[#(#names),*])),
                }
            }
        }
    })
}
