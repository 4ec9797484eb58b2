use crate::{
    definition::{FieldSpec, TypeDefinition},
    descriptor::{FieldDescriptor, FieldType, TypeDescriptor, TypeKind},
    error::TypeResolutionError,
};
use dashmap::DashMap;
use tracing::{debug, trace};
use vtmem_utils::{
    sync::{Arc, RwLock},
    FieldIndex, TypeId,
};

/// Registry of every type known to a runtime.
///
/// Types are defined once and resolved by name or id afterwards. Defining the
/// same shape twice returns the original descriptor; resolution is safe from
/// any number of threads.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: DashMap<String, TypeId>,
    types: RwLock<Vec<Arc<TypeDescriptor>>>,
}

fn slot(id: TypeId) -> usize {
    (id.0 as usize).wrapping_sub(1)
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn define(&self, def: TypeDefinition) -> Result<Arc<TypeDescriptor>, TypeResolutionError> {
        let mut types = self.types.write();
        let existing = self.by_name.get(&def.name).map(|e| *e.value());
        let id = existing.unwrap_or(TypeId(types.len() as u32 + 1));

        let fields = self.resolve_fields(&def, id, &types)?;
        let kind = if def.is_value {
            TypeKind::Value
        } else {
            TypeKind::Identity
        };

        if let Some(id) = existing {
            let current = &types[slot(id)];
            if current.kind == kind
                && current.fields == fields
                && current.implicit_default == def.implicit_default
            {
                trace!("type {} already defined as {}", def.name, id);
                return Ok(Arc::clone(current));
            }
            return Err(TypeResolutionError::DuplicateType(def.name));
        }

        let lookup = |target: TypeId| types.get(slot(target));
        let flattenable = def.is_value
            && fields.iter().all(|f| match f.field_type {
                FieldType::Primitive(_) => true,
                FieldType::Reference(target) => {
                    f.null_restricted
                        && target != id
                        && lookup(target).is_some_and(|t| t.is_value_type() && t.flattenable)
                }
            });
        let zero_sized = flattenable
            && fields.iter().all(|f| match f.field_type {
                FieldType::Primitive(_) => false,
                FieldType::Reference(target) => lookup(target).is_some_and(|t| t.zero_sized),
            });

        let descriptor = Arc::new(TypeDescriptor::new(
            id,
            def.name.clone(),
            kind,
            fields,
            flattenable,
            zero_sized,
            def.is_value && def.implicit_default,
        ));
        debug!(
            "defined {} {} (flattenable: {}, zero-sized: {})",
            id, def.name, flattenable, zero_sized
        );
        types.push(Arc::clone(&descriptor));
        self.by_name.insert(def.name, id);
        Ok(descriptor)
    }

    fn resolve_fields(
        &self,
        def: &TypeDefinition,
        id: TypeId,
        types: &[Arc<TypeDescriptor>],
    ) -> Result<Vec<FieldDescriptor>, TypeResolutionError> {
        def.fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let (field_type, null_restricted) = match &field.spec {
                    FieldSpec::Primitive(p) => (FieldType::Primitive(*p), true),
                    FieldSpec::Reference {
                        type_name,
                        null_restricted,
                    } => {
                        let target = if *type_name == def.name {
                            id
                        } else {
                            self.by_name
                                .get(type_name)
                                .map(|e| *e.value())
                                .filter(|t| slot(*t) < types.len())
                                .ok_or_else(|| TypeResolutionError::UnresolvedFieldType {
                                    field: format!("{}.{}", def.name, field.name),
                                    target: type_name.clone(),
                                })?
                        };
                        (FieldType::Reference(target), *null_restricted)
                    }
                };
                Ok(FieldDescriptor {
                    owner: id,
                    name: field.name.clone(),
                    index: FieldIndex(index),
                    field_type,
                    null_restricted,
                })
            })
            .collect()
    }

    /// The array type `element[]`, or `element![]` when `null_restricted`.
    pub fn array_of(
        &self,
        element: TypeId,
        null_restricted: bool,
    ) -> Result<Arc<TypeDescriptor>, TypeResolutionError> {
        let element_type = self.get(element)?;
        if null_restricted && !element_type.is_value_type() {
            return Err(TypeResolutionError::InvalidArrayElement(
                element_type.name.clone(),
            ));
        }
        let name = format!(
            "{}{}[]",
            element_type.name,
            if null_restricted { "!" } else { "" }
        );

        let mut types = self.types.write();
        if let Some(id) = self.by_name.get(&name).map(|e| *e.value()) {
            return types
                .get(slot(id))
                .cloned()
                .ok_or(TypeResolutionError::InvalidHandle(id.0));
        }

        let id = TypeId(types.len() as u32 + 1);
        let descriptor = Arc::new(TypeDescriptor::new(
            id,
            name.clone(),
            TypeKind::Array {
                element,
                null_restricted,
            },
            vec![],
            false,
            false,
            false,
        ));
        debug!("defined {} {}", id, name);
        types.push(Arc::clone(&descriptor));
        self.by_name.insert(name, id);
        Ok(descriptor)
    }

    pub fn get(&self, id: TypeId) -> Result<Arc<TypeDescriptor>, TypeResolutionError> {
        self.types
            .read()
            .get(slot(id))
            .cloned()
            .ok_or(TypeResolutionError::InvalidHandle(id.0))
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<TypeDescriptor>, TypeResolutionError> {
        // Copy the id out so the map guard is released before the table lock is taken.
        let id = self
            .by_name
            .get(name)
            .map(|e| *e.value())
            .ok_or_else(|| TypeResolutionError::TypeNotFound(name.to_string()))?;
        self.get(id)
    }

    pub fn field<'a>(
        &self,
        owner: &'a TypeDescriptor,
        name: &str,
    ) -> Result<&'a FieldDescriptor, TypeResolutionError> {
        owner
            .field(name)
            .ok_or_else(|| TypeResolutionError::FieldNotFound {
                owner: owner.name.clone(),
                name: name.to_string(),
            })
    }

    /// Snapshot of every registered type, in definition order.
    pub fn types(&self) -> Vec<Arc<TypeDescriptor>> {
        self.types.read().clone()
    }
}
