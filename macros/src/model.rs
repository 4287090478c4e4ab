use crate::field_parser::{AttributeDef, ElementDef, ModelDef, Role, Shape};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::Type;

/// Accessor functions of one attribute plus the `AttributeDecl` that points at them.
struct AttributeMacros {
    helpers: TokenStream,
    declaration: TokenStream,
}

fn tags(attribute: &AttributeDef) -> TokenStream {
    let role = match &attribute.role {
        Role::Attribute { .. } => quote!(::rohm::model::Tag::Attribute),
        Role::Reference { .. } => quote!(::rohm::model::Tag::Reference),
        Role::Collection { shape: Shape::Array(len), .. } => quote!(::rohm::model::Tag::Array(#len)),
        Role::Collection { shape: Shape::List, .. } => quote!(::rohm::model::Tag::List),
        Role::Collection { shape: Shape::Set, .. } => quote!(::rohm::model::Tag::Set),
        Role::Transient => quote!(::rohm::model::Tag::Transient),
    };
    if attribute.indexed {
        quote!(vec![#role, ::rohm::model::Tag::Indexed])
    } else {
        quote!(vec![#role])
    }
}

fn scalar(model: &Ident, field: &Ident, inner: &Type, optional: bool) -> (TokenStream, TokenStream) {
    let encode = format_ident!("encode_{}", field);
    let decode = format_ident!("decode_{}", field);
    let (encode_body, decode_body) = if optional {
        (
            quote!(m.#field.as_ref().map(|v| <#inner as ::rohm::ToField>::to_field(v))),
            quote!(m.#field = raw.map(<#inner as ::rohm::FromField>::from_field).transpose()?;),
        )
    } else {
        (
            quote!(Some(<#inner as ::rohm::ToField>::to_field(&m.#field))),
            quote! {
                m.#field = match raw {
                    Some(raw) => <#inner as ::rohm::FromField>::from_field(raw)?,
                    None => ::core::default::Default::default(),
                };
            },
        )
    };
    let helpers = quote! {
        fn #encode(m: &#model) -> Option<String> {
            #encode_body
        }
        fn #decode(m: &mut #model, raw: Option<&str>) -> Result<(), String> {
            #decode_body
            Ok(())
        }
    };
    (helpers, quote!(::rohm::model::Access::Scalar { encode: #encode, decode: #decode }))
}

fn reference(model: &Ident, field: &Ident, field_name: &str, target: &Type) -> (TokenStream, TokenStream) {
    let encode = format_ident!("encode_{}", field);
    let load = format_ident!("load_{}", field);
    let save = format_ident!("save_{}", field);
    let helpers = quote! {
        fn #encode(m: &#model) -> Result<Option<u64>, ::rohm::AppError> {
            m.#field.as_ref().map(|t| ::rohm::reference::id_of(MODEL, #field_name, t)).transpose()
        }
        fn #load(m: &mut #model, session: &::rohm::Session, target: Option<u64>) -> Result<(), ::rohm::AppError> {
            m.#field = ::rohm::reference::resolve::<#target>(session, target)?;
            Ok(())
        }
        fn #save(m: &mut #model, session: &::rohm::Session) -> Result<(), ::rohm::AppError> {
            if let Some(t) = m.#field.as_mut() {
                ::rohm::mapper::save_cascade(session, t)?;
            }
            Ok(())
        }
    };
    let access = quote! {
        ::rohm::model::Access::Reference {
            target: stringify!(#target),
            encode: #encode,
            load: #load,
            save: #save,
            delete: ::rohm::mapper::delete_cascade::<#target>,
        }
    };
    (helpers, access)
}

fn encode_elements(field: &Ident, field_name: &str, element: &ElementDef) -> TokenStream {
    let tpe = &element.tpe;
    match (element.model, element.optional) {
        (false, false) => quote!(Ok(m.#field.iter().map(|e| Some(<#tpe as ::rohm::ToField>::to_field(e))).collect())),
        (false, true) => quote!(Ok(m.#field.iter().map(|e| e.as_ref().map(|v| <#tpe as ::rohm::ToField>::to_field(v))).collect())),
        (true, false) => quote!(m.#field.iter().map(|t| ::rohm::collection::model_element_id(MODEL, #field_name, t)).collect()),
        (true, true) => quote! {
            m.#field
                .iter()
                .map(|e| match e {
                    Some(t) => ::rohm::collection::model_element_id(MODEL, #field_name, t),
                    None => Ok(None),
                })
                .collect()
        },
    }
}

/// Expression decoding one raw element `r` into the element type, for arrays and element-wise collects.
fn decode_element(element: &ElementDef) -> TokenStream {
    let tpe = &element.tpe;
    match (element.model, element.optional) {
        (false, false) => quote!(::rohm::collection::element::<#tpe>(key, r)),
        (false, true) => quote!(::rohm::collection::optional_element::<#tpe>(key, r)),
        (true, true) => quote!(::rohm::collection::model_element::<#tpe>(session, key, r)),
        (true, false) => quote!(::rohm::collection::model_element::<#tpe>(session, key, r).map(|t| t.unwrap_or_default())),
    }
}

fn load_elements(field: &Ident, shape: Shape, element: &ElementDef) -> TokenStream {
    let decode = decode_element(element);
    let declared = &element.tpe;
    let slot = if element.optional { quote!(Option<#declared>) } else { quote!(#declared) };
    match shape {
        Shape::Array(len) => quote! {
            m.#field = ::rohm::collection::fill_slots::<#slot, #len>(raw, |r| #decode)?;
        },
        Shape::List | Shape::Set if element.model && !element.optional => quote! {
            m.#field = ::rohm::collection::model_elements::<#declared>(session, key, raw)?.into_iter().collect();
        },
        Shape::List | Shape::Set => quote! {
            m.#field = raw.iter().map(|r| #decode).collect::<Result<_, ::rohm::AppError>>()?;
        },
    }
}

/// Body saving every held model in place, for reference collections only.
fn save_elements(field: &Ident, shape: Shape, element: &ElementDef) -> TokenStream {
    let save_one = if element.optional {
        quote! {
            if let Some(t) = e.as_mut() {
                ::rohm::mapper::save_cascade(session, t)?;
            }
        }
    } else {
        quote!(::rohm::mapper::save_cascade(session, &mut *e)?;)
    };
    match shape {
        Shape::Array(_) => quote! {
            for e in m.#field.iter_mut() {
                #save_one
            }
        },
        Shape::List | Shape::Set => quote! {
            m.#field = ::core::mem::take(&mut m.#field)
                .into_iter()
                .map(|mut e| -> Result<_, ::rohm::AppError> {
                    {
                        let e = &mut e;
                        #save_one
                    }
                    Ok(e)
                })
                .collect::<Result<_, ::rohm::AppError>>()?;
        },
    }
}

fn collection(model: &Ident, field: &Ident, field_name: &str, shape: Shape, element: &ElementDef) -> (TokenStream, TokenStream) {
    let encode = format_ident!("encode_{}", field);
    let load = format_ident!("load_{}", field);
    let encode_body = encode_elements(field, field_name, element);
    let load_body = load_elements(field, shape, element);
    let session = if element.model { quote!(session) } else { quote!(_session) };
    let mut helpers = quote! {
        fn #encode(m: &#model) -> Result<Vec<Option<String>>, ::rohm::AppError> {
            #encode_body
        }
        fn #load(m: &mut #model, #session: &::rohm::Session, key: &::rohm::KeyPath, raw: Vec<String>) -> Result<(), ::rohm::AppError> {
            #load_body
            Ok(())
        }
    };
    let (target, save, delete) = if element.model {
        let tpe = &element.tpe;
        let save = format_ident!("save_{}", field);
        let save_body = save_elements(field, shape, element);
        helpers.extend(quote! {
            fn #save(m: &mut #model, session: &::rohm::Session) -> Result<(), ::rohm::AppError> {
                #save_body
                Ok(())
            }
        });
        (
            quote!(Some(stringify!(#tpe))),
            quote!(Some(#save as ::rohm::model::TargetSave<#model>)),
            quote!(Some(::rohm::mapper::delete_cascade::<#tpe> as ::rohm::model::TargetDelete)),
        )
    } else {
        (quote!(None), quote!(None), quote!(None))
    };
    let access = quote! {
        ::rohm::model::Access::Collection { target: #target, encode: #encode, load: #load, save: #save, delete: #delete }
    };
    (helpers, access)
}

impl AttributeMacros {
    fn new(model: &Ident, attribute: &AttributeDef) -> AttributeMacros {
        let field = &attribute.field.name;
        let field_name = attribute.field.name_str();
        let (helpers, access) = match &attribute.role {
            Role::Attribute { inner, optional } => scalar(model, field, inner, *optional),
            Role::Reference { target } => reference(model, field, &field_name, target),
            Role::Collection { shape, element } => collection(model, field, &field_name, *shape, element),
            Role::Transient => (quote!(), quote!(::rohm::model::Access::Transient)),
        };
        let tags = tags(attribute);
        let declaration = quote! {
            ::rohm::model::AttributeDecl::<#model> { name: #field_name, tags: #tags, access: #access }
        };
        AttributeMacros { helpers, declaration }
    }
}

pub fn new(def: &ModelDef) -> TokenStream {
    let model = &def.name;
    let model_name = model.to_string();
    let all_ids = def.all_ids;
    let id = &def.id.name;
    let id_name = def.id.name_str();

    let attributes: Vec<AttributeMacros> = def.attributes.iter().map(|a| AttributeMacros::new(model, a)).collect();
    let helpers = attributes.iter().map(|a| &a.helpers);
    let declarations = attributes.iter().map(|a| &a.declaration);

    quote! {
        impl ::rohm::model::Model for #model {
            fn declaration() -> ::rohm::model::Declaration<Self> {
                const MODEL: &str = #model_name;
                #(#helpers)*
                ::rohm::model::Declaration {
                    name: MODEL,
                    all_ids: #all_ids,
                    attributes: vec![
                        ::rohm::model::AttributeDecl::<#model> {
                            name: #id_name,
                            tags: vec![::rohm::model::Tag::Id],
                            access: ::rohm::model::Access::Id,
                        },
                        #(#declarations),*
                    ],
                }
            }

            fn id(&self) -> Option<u64> {
                self.#id
            }

            fn set_id(&mut self, id: u64) {
                self.#id = Some(id);
            }
        }

        ::rohm::inventory::submit! {
            ::rohm::metadata::Registration {
                name: #model_name,
                validate: ::rohm::metadata::validate::<#model>,
            }
        }
    }
}
