use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::quote;
use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use syn::{GenericArgument, PathArguments, Type};

/// First generic argument of the last path segment when that segment is named `wrapper`.
pub fn unwrap_type<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else { return None };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    first_generic_argument(ty)
}

pub fn unwrap_option(ty: &Type) -> Option<&Type> {
    unwrap_type(ty, "Option")
}

pub fn unwrap_vec(ty: &Type) -> Option<&Type> {
    unwrap_type(ty, "Vec")
}

/// Element type of a generic collection such as `BTreeSet<E>` or `HashSet<E, S>`.
pub fn first_generic_argument(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else { return None };
    let segment = type_path.path.segments.last()?;
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        }),
        _ => None,
    }
}

pub fn get_array_len(ty: &Type) -> Option<usize> {
    if let Type::Array(arr) = ty {
        if let syn::Expr::Lit(syn::ExprLit { lit: syn::Lit::Int(int), .. }) = &arr.len {
            return int.base10_parse::<usize>().ok();
        }
    }
    None
}

pub fn array_elem(ty: &Type) -> Option<&Type> {
    match ty {
        Type::Array(arr) => Some(&arr.elem),
        _ => None,
    }
}

pub fn write_to_local_file(lines: Vec<String>, dir_name: &str, file_name: &str) {
    let current_dir = match env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Current dir inaccessible: {}", e);
            return;
        }
    };
    let dir_path = current_dir.join("target").join("macros").join(dir_name);
    if let Err(e) = std::fs::create_dir_all(&dir_path) {
        eprintln!("Failed to create directory {:?}: {}", dir_path, e);
        return;
    }
    let full_path = dir_path.join(file_name);

    #[cfg(not(test))]
    {
        if let Err(e) = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&full_path)
            .and_then(|mut file| file.write_all(lines.join("\n").as_bytes()))
        {
            eprintln!("Failed to write to {:?}: {}", full_path, e);
        }
    }
}

/// Dumps the pretty-printed expansion under `target/macros/{dir}` and hands the stream back to the compiler.
pub fn submit_struct_to_stream(stream: proc_macro2::TokenStream, dir: &str, struct_ident: &Ident, suffix: &str) -> TokenStream {
    let formatted_token_stream =
        match syn::parse2::<syn::File>(stream.clone()) {
            Ok(ast) => prettyplease::unparse(&ast),
            Err(_) => stream.to_string(),
        };

    write_to_local_file(vec![formatted_token_stream], dir, &format!("{}{}", struct_ident, suffix));

    quote! {
        #stream
    }.into()
}
