extern crate proc_macro;
mod field_parser;
mod macro_utils;
mod model;
mod scalar;

use proc_macro::TokenStream;
use proc_macro_error::proc_macro_error;
use syn::{parse_macro_input, DeriveInput, ItemStruct};

#[proc_macro_derive(Model, attributes(model, id, attribute, indexed, reference, array, list, set, transient))]
#[proc_macro_error]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let item_struct = parse_macro_input!(input as ItemStruct);
    let stream = match field_parser::get_model_def(&item_struct) {
        Ok(model_def) => model::new(&model_def),
        Err(e) => return e.to_compile_error().into(),
    };
    macro_utils::submit_struct_to_stream(stream, "model", &item_struct.ident, "_derive.rs")
}

#[proc_macro_derive(Scalar)]
#[proc_macro_error]
pub fn derive_scalar(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let stream = match scalar::new(&ast) {
        Ok(stream) => stream,
        Err(e) => return e.to_compile_error().into(),
    };
    macro_utils::submit_struct_to_stream(stream, "scalar", &ast.ident, "_derive.rs")
}
