use crate::macro_utils;
use proc_macro2::Ident;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Attribute, Fields, ItemStruct, Type};

const ROLES: &str = "#[id] / #[attribute] / #[reference] / #[array] / #[list] / #[set] / #[transient]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Array(usize),
    List,
    Set,
}

/// Element of a collection: a scalar or a model, held directly or optionally.
#[derive(Clone)]
pub struct ElementDef {
    pub tpe: Type,
    pub optional: bool,
    pub model: bool,
}

#[derive(Clone)]
pub enum Role {
    Attribute { inner: Type, optional: bool },
    Reference { target: Type },
    Collection { shape: Shape, element: ElementDef },
    Transient,
}

#[derive(Clone)]
pub struct FieldDef {
    pub name: Ident,
    pub tpe: Type,
}

impl FieldDef {
    pub fn name_str(&self) -> String {
        self.name.unraw().to_string()
    }
}

pub struct AttributeDef {
    pub field: FieldDef,
    pub role: Role,
    pub indexed: bool,
}

pub struct ModelDef {
    pub name: Ident,
    pub all_ids: bool,
    pub id: FieldDef,
    pub attributes: Vec<AttributeDef>,
}

enum ParsingResult {
    Id(FieldDef),
    Attribute(AttributeDef),
}

fn is_role(attr: &Attribute) -> bool {
    ["id", "attribute", "reference", "array", "list", "set", "transient"].iter().any(|role| attr.path().is_ident(role))
}

/// `true` for `#[list(reference)]` and friends.
fn holds_models(attr: &Attribute) -> Result<bool, syn::Error> {
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(false);
    }
    let mut reference = false;
    attr.parse_nested_meta(|nested| {
        if nested.path.is_ident("reference") {
            reference = true;
            Ok(())
        } else {
            Err(nested.error("expected `reference`"))
        }
    })?;
    Ok(reference)
}

fn element_def(tpe: &Type, model: bool) -> ElementDef {
    match macro_utils::unwrap_option(tpe) {
        Some(inner) => ElementDef { tpe: inner.clone(), optional: true, model },
        None => ElementDef { tpe: tpe.clone(), optional: false, model },
    }
}

fn collection_role(attr: &Attribute, field: &FieldDef) -> Result<Role, syn::Error> {
    let model = holds_models(attr)?;
    let span = field.tpe.span();
    if attr.path().is_ident("array") {
        let len = macro_utils::get_array_len(&field.tpe)
            .ok_or_else(|| syn::Error::new(span, "#[array] expects a fixed-size array type `[E; N]` with a literal length"))?;
        let elem = macro_utils::array_elem(&field.tpe).ok_or_else(|| syn::Error::new(span, "#[array] expects an array type"))?;
        let element = element_def(elem, model);
        if model && !element.optional {
            return Err(syn::Error::new(span, "#[array(reference)] slots must be `Option<T>` so empty slots can be loaded"));
        }
        Ok(Role::Collection { shape: Shape::Array(len), element })
    } else if attr.path().is_ident("list") {
        let elem = macro_utils::unwrap_vec(&field.tpe).ok_or_else(|| syn::Error::new(span, "#[list] expects a `Vec<E>`"))?;
        Ok(Role::Collection { shape: Shape::List, element: element_def(elem, model) })
    } else {
        let elem = macro_utils::first_generic_argument(&field.tpe)
            .ok_or_else(|| syn::Error::new(span, "#[set] expects a generic collection such as `BTreeSet<E>`"))?;
        Ok(Role::Collection { shape: Shape::Set, element: element_def(elem, model) })
    }
}

fn parse_model_field(field: &syn::Field) -> Result<ParsingResult, syn::Error> {
    let name = field.ident.clone().ok_or_else(|| syn::Error::new(field.span(), "Unnamed fields not supported"))?;
    let field_def = FieldDef { name, tpe: field.ty.clone() };

    let roles: Vec<&Attribute> = field.attrs.iter().filter(|a| is_role(a)).collect();
    let indexed = field.attrs.iter().filter(|a| a.path().is_ident("indexed")).count();
    let attr = match roles.as_slice() {
        [attr] => *attr,
        [] => return Err(syn::Error::new(field.span(), format!("Field must have one of {} annotations", ROLES))),
        [_, second, ..] => return Err(syn::Error::new(second.span(), format!("Field may carry only one of {}", ROLES))),
    };
    if indexed > 1 {
        return Err(syn::Error::new(field.span(), "#[indexed] given more than once"));
    }

    if attr.path().is_ident("id") {
        if indexed > 0 {
            return Err(syn::Error::new(field.span(), "#[id] cannot be #[indexed]"));
        }
        let is_u64 = matches!(macro_utils::unwrap_option(&field.ty), Some(Type::Path(p)) if p.path.is_ident("u64"));
        if !is_u64 {
            return Err(syn::Error::new(field.ty.span(), "#[id] field must be of type `Option<u64>`"));
        }
        return Ok(ParsingResult::Id(field_def));
    }

    let role = if attr.path().is_ident("attribute") {
        match macro_utils::unwrap_option(&field.ty) {
            Some(inner) => Role::Attribute { inner: inner.clone(), optional: true },
            None => Role::Attribute { inner: field.ty.clone(), optional: false },
        }
    } else if attr.path().is_ident("reference") {
        let target = macro_utils::unwrap_option(&field.ty)
            .ok_or_else(|| syn::Error::new(field.ty.span(), "#[reference] field must be of type `Option<T>` where `T: Model`"))?;
        Role::Reference { target: target.clone() }
    } else if attr.path().is_ident("transient") {
        Role::Transient
    } else {
        collection_role(attr, &field_def)?
    };
    Ok(ParsingResult::Attribute(AttributeDef { field: field_def, role, indexed: indexed == 1 }))
}

/// `#[model(all_ids)]` on the struct.
fn parse_model_attrs(ast: &ItemStruct) -> Result<bool, syn::Error> {
    let mut all_ids = false;
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|nested| {
            if nested.path.is_ident("all_ids") {
                all_ids = true;
                Ok(())
            } else {
                Err(nested.error("unknown model option, expected `all_ids`"))
            }
        })?;
    }
    Ok(all_ids)
}

pub fn get_model_def(ast: &ItemStruct) -> Result<ModelDef, syn::Error> {
    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new(ast.generics.span(), "`#[derive(Model)]` does not support generic structs"));
    }
    let fields = match &ast.fields {
        Fields::Named(named) => &named.named,
        _ => return Err(syn::Error::new(ast.span(), "`#[derive(Model)]` only supports structs with named fields.")),
    };

    let mut id: Option<FieldDef> = None;
    let mut attributes = Vec::new();
    for field in fields.iter() {
        match parse_model_field(field)? {
            ParsingResult::Id(field_def) => {
                if id.is_some() {
                    return Err(syn::Error::new(field.span(), "Multiple `#[id]` fields found; only one is allowed"));
                }
                id = Some(field_def);
            }
            ParsingResult::Attribute(attribute) => attributes.push(attribute),
        }
    }
    let id = id.ok_or_else(|| syn::Error::new(ast.span(), "`#[id]` attribute not found on any field. Exactly one field must have `#[id]`."))?;

    Ok(ModelDef { name: ast.ident.clone(), all_ids: parse_model_attrs(ast)?, id, attributes })
}
