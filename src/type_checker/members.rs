//! Struct layout and member resolution.

use std::rc::Rc;

use tracing::trace;

use crate::{
    ast::{
        ast::Ident,
        expressions::Expr,
        statements::{FnKind, StructDecl},
    },
    errors::errors::{Error, ErrorImpl},
    symbols::symbols::{FieldDef, GlobalId, ModuleScope, ResolveState},
    types::types::{AliasedType, StructId, Type},
    Span,
};

use super::{
    expr::{check_args, check_expr, check_place, coerce, place_value, Place},
    type_checker::TypeChecker,
    typed_ast::{Storage, StorageKind, TypedExpr, TypedExprKind},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemberLookup {
    Field(usize),
    Method(GlobalId),
    Static(GlobalId),
}

/// The object a member is looked up on.
enum Receiver {
    /// Address of the struct and whether it is a constant view.
    Pointer(TypedExpr, bool),
    /// A struct value with no storage behind it.
    Temporary(TypedExpr),
}

impl TypeChecker {
    /// Resolves the fields of a struct on first use. A struct reached again
    /// while its own fields are being resolved contains itself by value.
    pub fn complete_struct(&mut self, id: StructId, used_at: &Span) -> Result<(), Error> {
        let def = &self.structs[id.0];
        match def.state {
            ResolveState::Complete => return Ok(()),
            ResolveState::Resolving => {
                let name = def.display.to_string();
                let error = if def.instance {
                    ErrorImpl::CyclicTemplate { name }
                } else {
                    ErrorImpl::RecursiveStruct { name }
                };
                return Err(Error::new(error, used_at.clone()));
            }
            ResolveState::Declared => {}
        }

        self.structs[id.0].state = ResolveState::Resolving;
        let (decl, scope) = (Rc::clone(&self.structs[id.0].decl), Rc::clone(&self.structs[id.0].scope));
        let fields = self.detached(|checker| checker.resolve_fields(&decl, &scope))?;

        let mut seen: Vec<&Ident> = vec![];
        for global in &self.structs[id.0].member_order {
            let name = &self.globals[global.0].name;
            let previous = fields
                .iter()
                .map(|field| &field.name)
                .chain(seen.iter().copied())
                .find(|previous| previous.name == name.name);
            if let Some(previous) = previous {
                return Err(Error::new(
                    ErrorImpl::AlreadyExists {
                        kind: String::from("Member"),
                        name: name.name.clone(),
                    },
                    name.span.clone(),
                )
                .with_related("Already declared here", previous.span.clone()));
            }
            seen.push(name);
        }

        trace!(name = %self.structs[id.0].display, fields = fields.len(), "completed struct");
        let def = &mut self.structs[id.0];
        def.fields = fields;
        def.state = ResolveState::Complete;
        Ok(())
    }

    fn resolve_fields(&mut self, decl: &StructDecl, scope: &Rc<ModuleScope>) -> Result<Vec<FieldDef>, Error> {
        let mut fields: Vec<FieldDef> = vec![];
        for field in &decl.fields {
            if let Some(previous) = fields.iter().find(|previous| previous.name.name == field.name.name) {
                return Err(Error::new(
                    ErrorImpl::AlreadyExists {
                        kind: String::from("Property"),
                        name: field.name.name.clone(),
                    },
                    field.name.span.clone(),
                )
                .with_related("Already declared here", previous.name.span.clone()));
            }

            let declared = match &field.ty {
                Some(ty) => Some(self.resolve_type(ty, scope)?),
                None => None,
            };
            let default = match &field.value {
                Some(value) => Some(check_expr(self, value, declared.as_ref(), scope)?),
                None => None,
            };
            let ty = match (declared, &default) {
                (Some(ty), _) => ty,
                (None, Some(default)) => default.ty.clone(),
                (None, None) => {
                    return Err(Error::new(
                        ErrorImpl::MissingInitializer {
                            name: field.name.name.clone(),
                        },
                        field.name.span.clone(),
                    ));
                }
            };

            self.check_value_type(&ty, &field.name.span)?;
            self.require_complete(&ty, &field.name.span)?;
            if !ty.ty.is_copyable() {
                return Err(Error::new(
                    ErrorImpl::UniqueField { ty: ty.describe() },
                    field.name.span.clone(),
                ));
            }

            fields.push(FieldDef {
                name: field.name.clone(),
                constant: field.constant,
                ty,
                default,
            });
        }
        Ok(fields)
    }

    /// Layout size in bytes. Structs are packed: the sum of their fields.
    pub fn size_of(&self, ty: &Type) -> u64 {
        match ty {
            Type::Int(bits) => u64::from(*bits) / 8,
            Type::Bool => 1,
            Type::Void => 0,
            Type::Func(_) | Type::OwnerPointer { .. } | Type::SharedPointer { .. } => 8,
            Type::Array { size: None, .. } => 8,
            Type::Array { of, size: Some(size), .. } => size * self.size_of(&of.ty),
            Type::Struct(reference) => self.structs[reference.id.0]
                .fields
                .iter()
                .map(|field| self.size_of(&field.ty.ty))
                .sum(),
        }
    }

    /// Field first, then methods and statics.
    pub fn lookup_struct_member(&mut self, id: StructId, member: &Ident) -> Result<MemberLookup, Error> {
        self.complete_struct(id, &member.span)?;
        let def = &self.structs[id.0];
        if let Some((index, _)) = def.field(&member.name) {
            return Ok(MemberLookup::Field(index));
        }

        match def.members.get(&member.name) {
            Some(global) => match self.globals[global.0].fn_kind() {
                Some(FnKind::Static) => Ok(MemberLookup::Static(*global)),
                _ => Ok(MemberLookup::Method(*global)),
            },
            None => Err(Error::new(
                ErrorImpl::MemberNotFound {
                    member: member.name.clone(),
                    ty: def.display.to_string(),
                },
                member.span.clone(),
            )),
        }
    }

    /// Method of `id` named `name`, if any.
    pub fn find_method(&self, id: StructId, name: &str) -> Option<GlobalId> {
        self.structs[id.0].members.get(name).copied()
    }

    fn check_receiver(
        &mut self,
        base: &Expr,
        scope: &Rc<ModuleScope>,
    ) -> Result<(StructId, Receiver), Error> {
        let value = match check_place(self, base, false, scope)? {
            Place::Storage(storage) => match storage.ty.ty.struct_ref().map(|reference| reference.id) {
                Some(id) => {
                    let constant = storage.constant;
                    let pointer = Type::SharedPointer {
                        to: Box::new(storage.ty.clone()),
                        constant,
                    };
                    let span = storage.span.clone();
                    let address = TypedExpr::new(
                        TypedExprKind::AddressOf(Box::new(storage)),
                        pointer.into(),
                        span,
                    );
                    return Ok((id, Receiver::Pointer(address, constant)));
                }
                None => place_value(self, Place::Storage(storage))?,
            },
            place => place_value(self, place)?,
        };

        if let Some(reference) = value.ty.ty.struct_ref() {
            return Ok((reference.id, Receiver::Temporary(value)));
        }
        let pointee = value
            .ty
            .ty
            .pointee()
            .and_then(|(to, constant)| to.ty.struct_ref().map(|reference| (reference.id, constant)));
        match pointee {
            Some((id, constant)) => Ok((id, Receiver::Pointer(value, constant))),
            None => Err(Error::new(
                ErrorImpl::NotAStruct {
                    ty: value.ty.describe(),
                },
                base.span.clone(),
            )),
        }
    }

    fn field_place(&self, id: StructId, index: usize, receiver: Receiver, span: &Span) -> Place {
        let field = &self.structs[id.0].fields[index];
        match receiver {
            Receiver::Pointer(base, constant) => Place::Storage(Storage {
                kind: StorageKind::Field {
                    base: Box::new(base),
                    id,
                    index,
                },
                ty: field.ty.clone(),
                constant: constant || field.constant,
                span: span.clone(),
            }),
            Receiver::Temporary(base) => Place::Value(TypedExpr::new(
                TypedExprKind::ExtractField {
                    base: Box::new(base),
                    index,
                },
                field.ty.clone(),
                span.clone(),
            )),
        }
    }

    /// `base.member` outside of call position.
    pub fn check_member(
        &mut self,
        base: &Expr,
        member: &Ident,
        span: &Span,
        scope: &Rc<ModuleScope>,
    ) -> Result<Place, Error> {
        let (id, receiver) = self.check_receiver(base, scope)?;
        match self.lookup_struct_member(id, member)? {
            MemberLookup::Field(index) => Ok(self.field_place(id, index, receiver, span)),
            MemberLookup::Static(global) => {
                let ty = self.global_type(global, span)?;
                Ok(Place::Value(TypedExpr::new(
                    TypedExprKind::Function(global),
                    ty,
                    span.clone(),
                )))
            }
            MemberLookup::Method(_) => Err(Error::new(ErrorImpl::ExpectedVariable, span.clone())),
        }
    }

    /// `base.member(args)`: a bound method call with the receiver passed as
    /// a shared pointer, a static call, or a call through a field.
    pub fn check_method_call(
        &mut self,
        base: &Expr,
        member: &Ident,
        args: &[Expr],
        span: &Span,
        scope: &Rc<ModuleScope>,
    ) -> Result<TypedExpr, Error> {
        let (id, receiver) = self.check_receiver(base, scope)?;
        let (callee, prefix) = match self.lookup_struct_member(id, member)? {
            MemberLookup::Field(index) => {
                let place = self.field_place(id, index, receiver, &member.span);
                (place_value(self, place)?, vec![])
            }
            MemberLookup::Static(global) => {
                let ty = self.global_type(global, &member.span)?;
                (
                    TypedExpr::new(TypedExprKind::Function(global), ty, member.span.clone()),
                    vec![],
                )
            }
            MemberLookup::Method(global) => {
                let (pointer, constant) = match receiver {
                    Receiver::Pointer(pointer, constant) => (pointer, constant),
                    Receiver::Temporary(_) => {
                        return Err(Error::new(ErrorImpl::ExpectedVariable, base.span.clone()));
                    }
                };
                let method = &self.globals[global.0];
                if constant && method.fn_kind() == Some(FnKind::Method) {
                    return Err(Error::new(
                        ErrorImpl::ConstReceiver {
                            method: method.display.clone(),
                        },
                        member.span.clone(),
                    ));
                }

                let ty = self.global_type(global, &member.span)?;
                let this = match &ty.ty {
                    Type::Func(func) => func.params.first().cloned(),
                    _ => None,
                };
                let receiver = match this {
                    Some(this) => coerce(pointer, &this)?,
                    None => pointer,
                };
                (
                    TypedExpr::new(TypedExprKind::Function(global), ty, member.span.clone()),
                    vec![receiver],
                )
            }
        };

        let func = match &callee.ty.ty {
            Type::Func(func) => func.clone(),
            _ => {
                return Err(Error::new(
                    ErrorImpl::NotCallable {
                        ty: callee.ty.describe(),
                    },
                    callee.span.clone(),
                ));
            }
        };
        let args = check_args(self, &func, prefix, args, span, scope)?;
        Ok(TypedExpr::new(
            TypedExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            AliasedType::clone(&func.returns),
            span.clone(),
        ))
    }
}
