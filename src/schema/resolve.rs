use crate::error::ResolveError;
use crate::registry::{Registered, TypeRegistry};
use crate::types::{CollectionShape, TypeRef, Wrapper};

use super::Element;

/// A field declaration after resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    pub element: Element,
    pub collection: Option<CollectionShape>,
    pub optional: bool,
}

pub struct TypeResolver<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> TypeResolver<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, decl: &TypeRef) -> Result<Resolved, ResolveError> {
        match decl {
            TypeRef::Generic { wrapper, args } if wrapper.collection().is_some() => {
                let inner = single_arg(*wrapper, args)?;
                let (element, _) = self.resolve_element(inner)?;
                Ok(Resolved { element, collection: wrapper.collection(), optional: false })
            }
            TypeRef::Generic { wrapper, args } if wrapper.is_optional() => {
                let inner = optional_arg(*wrapper, args)?;
                let mut resolved = self.resolve(inner)?;
                resolved.optional = true;
                Ok(resolved)
            }
            other => {
                let (element, optional) = self.resolve_element(other)?;
                Ok(Resolved { element, collection: None, optional })
            }
        }
    }

    // Resolve a declaration that must not be a collection.
    fn resolve_element(&self, decl: &TypeRef) -> Result<(Element, bool), ResolveError> {
        match decl {
            TypeRef::Scalar(s) => Ok((Element::Scalar(*s), false)),
            TypeRef::Record(r) => Ok((Element::Record(*r), false)),
            TypeRef::Named(name) => {
                let element = match self.registry.lookup(name)? {
                    Registered::Record(r) => Element::Record(r),
                    Registered::Scalar(s) => Element::Scalar(s),
                };
                log::trace!("resolved forward reference `{name}` to {element:?}");
                Ok((element, false))
            }
            TypeRef::Generic { wrapper, args } if wrapper.is_optional() => {
                let (element, _) = self.resolve_element(optional_arg(*wrapper, args)?)?;
                Ok((element, true))
            }
            TypeRef::Generic { wrapper, .. } if wrapper.collection().is_some() => {
                Err(ResolveError::NestedCollection { wrapper: *wrapper })
            }
            TypeRef::Generic { wrapper, args } => Err(ResolveError::UnsupportedGeneric {
                wrapper: *wrapper,
                arity: args.len(),
            }),
        }
    }
}

fn single_arg(wrapper: Wrapper, args: &[TypeRef]) -> Result<&TypeRef, ResolveError> {
    match args {
        [inner] => Ok(inner),
        _ => Err(ResolveError::Arity { wrapper, arity: args.len() }),
    }
}

fn optional_arg(wrapper: Wrapper, args: &[TypeRef]) -> Result<&TypeRef, ResolveError> {
    match (wrapper, args) {
        (_, [inner]) => Ok(inner),
        (Wrapper::Union, _) => Err(ResolveError::UnsupportedUnion { arity: args.len() }),
        _ => Err(ResolveError::Arity { wrapper, arity: args.len() }),
    }
}
