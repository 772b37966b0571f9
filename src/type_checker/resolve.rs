//! Name and type resolution.
//!
//! Value names resolve through the open block scopes innermost-first, then
//! the fields of `this` inside methods, then the current package and
//! finally the imported packages. Qualified paths name a package member or
//! a struct member directly. Type names additionally see the template
//! bindings of the current scope and the builtin types.

use std::rc::Rc;

use crate::{
    ast::{
        ast::{path_span, path_to_string, Ident},
        statements::VarDecl,
        types::{TypeExpr, TypeExprKind},
    },
    errors::errors::{Error, ErrorImpl},
    symbols::{
        scope::LocalId,
        symbols::{AliasId, GlobalId, MacroId, MacroParamDef, ModuleScope, PackageMember, ResolveState, TemplateEntity},
    },
    types::types::{primitive, AliasedType, ConstValue, FuncType, StructId, Type},
    Span,
};

use super::{expr::check_expr, type_checker::TypeChecker};

/// What a value path refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Symbol {
    Local(LocalId),
    Global(GlobalId),
    /// Field `index` of `this`, named without the receiver.
    Field {
        this: LocalId,
        id: StructId,
        index: usize,
    },
}

impl TypeChecker {
    /// Member visible by simple name: the current package, then imports.
    fn lookup_member(&self, scope: &ModuleScope, name: &str) -> Option<PackageMember> {
        std::iter::once(&scope.package)
            .chain(scope.imports.iter())
            .find_map(|package| self.packages[package.0].names.get(name).copied())
    }

    /// Member named by a one or two segment path.
    fn lookup_path(&self, path: &[Ident], scope: &ModuleScope) -> Result<Option<PackageMember>, Error> {
        match path {
            [name] => Ok(self.lookup_member(scope, &name.name)),
            [package, name] => match self.find_package(&package.name) {
                Some(package) => Ok(self.packages[package.0].names.get(&name.name).copied()),
                None => Err(Error::new(
                    ErrorImpl::UnknownPackage {
                        name: package.name.clone(),
                    },
                    package.span.clone(),
                )),
            },
            _ => Ok(None),
        }
    }

    pub fn resolve_type(&mut self, ty: &TypeExpr, scope: &Rc<ModuleScope>) -> Result<AliasedType, Error> {
        match &ty.kind {
            TypeExprKind::Named { path, args } => self.resolve_named_type(path, args, &ty.span, scope),
            TypeExprKind::Owner { to, constant } => Ok(AliasedType::new(Type::OwnerPointer {
                to: Box::new(self.resolve_type(to, scope)?),
                constant: *constant,
            })),
            TypeExprKind::Shared { to, constant } => Ok(AliasedType::new(Type::SharedPointer {
                to: Box::new(self.resolve_type(to, scope)?),
                constant: *constant,
            })),
            TypeExprKind::Array { of, constant, size } => {
                let element = self.resolve_type(of, scope)?;
                self.check_value_type(&element, &of.span)?;
                let size = match size {
                    Some(size) => {
                        let value = check_expr(self, size, Some(&AliasedType::new(Type::i64())), scope)?;
                        match value.constant {
                            Some(ConstValue::Int(size)) if size >= 0 => Some(size as u64),
                            _ => return Err(Error::new(ErrorImpl::InvalidArraySize, size.span.clone())),
                        }
                    }
                    None => None,
                };
                if size.is_some() {
                    self.require_complete(&element, &of.span)?;
                }
                Ok(AliasedType::new(Type::Array {
                    of: Box::new(element),
                    constant: *constant,
                    size,
                }))
            }
            TypeExprKind::Func {
                params,
                vararg,
                returns,
            } => {
                let params = params
                    .iter()
                    .map(|param| self.resolve_type(param, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AliasedType::new(Type::Func(FuncType {
                    params,
                    vararg: *vararg,
                    returns: Box::new(self.resolve_type(returns, scope)?),
                })))
            }
        }
    }

    fn resolve_named_type(
        &mut self,
        path: &[Ident],
        args: &[TypeExpr],
        span: &Span,
        scope: &Rc<ModuleScope>,
    ) -> Result<AliasedType, Error> {
        if let ([name], true) = (path, args.is_empty()) {
            if let Some(bound) = scope.bindings.get(&name.name) {
                return Ok(bound.clone());
            }
            if let Some(ty) = primitive(&name.name) {
                return Ok(AliasedType::new(ty));
            }
        }

        let name = path_to_string(path);
        let not_a_template = |name: String| Error::new(ErrorImpl::NotATemplate { name }, span.clone());
        match self.lookup_path(path, scope)? {
            Some(PackageMember::Struct(id)) if args.is_empty() => Ok(self.struct_type(id)),
            Some(PackageMember::Alias(id)) if args.is_empty() => self.resolve_alias(id, span),
            Some(PackageMember::Struct(_)) | Some(PackageMember::Alias(_)) => Err(not_a_template(name)),
            Some(PackageMember::Template(template)) => {
                if args.is_empty() {
                    return Err(Error::new(ErrorImpl::MissingTemplateArguments { name }, span.clone()));
                }
                let args = args
                    .iter()
                    .map(|arg| self.resolve_type(arg, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                match self.instantiate(template, args, span)? {
                    TemplateEntity::Struct(id) => Ok(self.struct_type(id)),
                    TemplateEntity::Global(_) => Err(Error::new(ErrorImpl::UnknownType { name }, span.clone())),
                }
            }
            Some(PackageMember::Global(_)) | None => {
                Err(Error::new(ErrorImpl::UnknownType { name }, span.clone()))
            }
        }
    }

    pub fn resolve_alias(&mut self, id: AliasId, used_at: &Span) -> Result<AliasedType, Error> {
        let alias = &self.aliases[id.0];
        match alias.state {
            ResolveState::Complete => {
                if let Some(resolved) = &alias.resolved {
                    return Ok(resolved.clone());
                }
            }
            ResolveState::Resolving => {
                return Err(Error::new(
                    ErrorImpl::CyclicDefinition {
                        name: alias.display.to_string(),
                    },
                    used_at.clone(),
                ));
            }
            ResolveState::Declared => {}
        }

        self.aliases[id.0].state = ResolveState::Resolving;
        let (target, scope) = (self.aliases[id.0].target.clone(), Rc::clone(&self.aliases[id.0].scope));
        let ty = self.detached(|checker| checker.resolve_type(&target, &scope))?;
        let resolved = AliasedType::aliased(ty.ty, Rc::clone(&self.aliases[id.0].display));

        let alias = &mut self.aliases[id.0];
        alias.resolved = Some(resolved.clone());
        alias.state = ResolveState::Complete;
        Ok(resolved)
    }

    /// Types that can be held by a variable, field or parameter.
    pub fn check_value_type(&self, ty: &AliasedType, span: &Span) -> Result<(), Error> {
        match ty.ty {
            Type::Void => Err(Error::new(
                ErrorImpl::IllegalType { ty: ty.describe() },
                span.clone(),
            )),
            _ => Ok(()),
        }
    }

    /// Completes every struct `ty` contains by value.
    pub fn require_complete(&mut self, ty: &AliasedType, span: &Span) -> Result<(), Error> {
        match &ty.ty {
            Type::Struct(reference) => self.complete_struct(reference.id, span),
            Type::Array { of, size: Some(_), .. } => {
                let of = (**of).clone();
                self.require_complete(&of, span)
            }
            _ => Ok(()),
        }
    }

    /// Resolves a value path, instantiating templates named with arguments.
    pub fn resolve_path(
        &mut self,
        path: &[Ident],
        args: &[TypeExpr],
        scope: &Rc<ModuleScope>,
    ) -> Result<Symbol, Error> {
        let span = path_span(path);
        let name = path_to_string(path);
        let undefined = || Error::new(ErrorImpl::UndefinedVariable { name: name.clone() }, span.clone());

        if !args.is_empty() {
            return match self.lookup_path(path, scope)? {
                Some(PackageMember::Template(template)) => {
                    let args = args
                        .iter()
                        .map(|arg| self.resolve_type(arg, scope))
                        .collect::<Result<Vec<_>, _>>()?;
                    match self.instantiate(template, args, &span)? {
                        TemplateEntity::Global(id) => Ok(Symbol::Global(id)),
                        TemplateEntity::Struct(_) => Err(undefined()),
                    }
                }
                Some(_) => Err(Error::new(ErrorImpl::NotATemplate { name: name.clone() }, span.clone())),
                None => Err(undefined()),
            };
        }

        if let [ident] = path {
            if let Some(frame) = self.frames.last() {
                if let Some(local) = frame.lookup(&ident.name) {
                    return Ok(Symbol::Local(local));
                }
                if let Some((this, id)) = frame.receiver {
                    if let Some((index, _)) = self.structs[id.0].field(&ident.name) {
                        return Ok(Symbol::Field { this, id, index });
                    }
                }
            }
        }

        // `pkg::name`, `Struct::member` or `pkg::Struct::member`
        let member = match path {
            [_] => self.lookup_member(scope, &path[0].name),
            [first, second] => match self.find_package(&first.name) {
                Some(package) => self.packages[package.0].names.get(&second.name).copied(),
                None => return self.struct_member_path(&path[..1], second, scope),
            },
            [_, _, member] => return self.struct_member_path(&path[..2], member, scope),
            _ => None,
        };

        match member {
            Some(PackageMember::Global(id)) => Ok(Symbol::Global(id)),
            Some(PackageMember::Template(_)) => {
                Err(Error::new(ErrorImpl::MissingTemplateArguments { name: name.clone() }, span.clone()))
            }
            _ => Err(undefined()),
        }
    }

    /// `Struct::member` names a static function or a method.
    fn struct_member_path(
        &mut self,
        struct_path: &[Ident],
        member: &Ident,
        scope: &Rc<ModuleScope>,
    ) -> Result<Symbol, Error> {
        let span = path_span(struct_path);
        let id = match self.lookup_path(struct_path, scope)? {
            Some(PackageMember::Struct(id)) => id,
            Some(PackageMember::Alias(alias)) => match self.resolve_alias(alias, &span)?.ty {
                Type::Struct(reference) => reference.id,
                other => {
                    return Err(Error::new(ErrorImpl::NotAStruct { ty: other.to_string() }, span));
                }
            },
            _ => {
                return Err(Error::new(
                    ErrorImpl::UnknownType {
                        name: path_to_string(struct_path),
                    },
                    span,
                ));
            }
        };

        self.complete_struct(id, &span)?;
        match self.structs[id.0].members.get(&member.name) {
            Some(global) => Ok(Symbol::Global(*global)),
            None => Err(Error::new(
                ErrorImpl::MemberNotFound {
                    member: member.name.clone(),
                    ty: self.structs[id.0].display.to_string(),
                },
                member.span.clone(),
            )),
        }
    }

    /// Macros live in their own namespace per package.
    pub fn resolve_macro(&mut self, path: &[Ident], scope: &Rc<ModuleScope>) -> Result<MacroId, Error> {
        let found = match path {
            [name] => std::iter::once(&scope.package)
                .chain(scope.imports.iter())
                .find_map(|package| self.packages[package.0].macros.get(&name.name).copied()),
            [package, name] => match self.find_package(&package.name) {
                Some(package) => self.packages[package.0].macros.get(&name.name).copied(),
                None => {
                    return Err(Error::new(
                        ErrorImpl::UnknownPackage {
                            name: package.name.clone(),
                        },
                        package.span.clone(),
                    ));
                }
            },
            _ => None,
        };

        let id = found.ok_or_else(|| {
            Error::new(
                ErrorImpl::UndefinedMacro {
                    name: path_to_string(path),
                },
                path_span(path),
            )
        })?;
        self.resolve_macro_signature(id)?;
        Ok(id)
    }

    pub fn resolve_macro_signature(&mut self, id: MacroId) -> Result<(), Error> {
        if self.macros[id.0].state == ResolveState::Complete {
            return Ok(());
        }

        let (decl, scope) = (Rc::clone(&self.macros[id.0].decl), Rc::clone(&self.macros[id.0].scope));
        let mut params = vec![];
        for param in &decl.params {
            let ty = self.resolve_type(&param.ty, &scope)?;
            self.check_value_type(&ty, &param.ty.span)?;
            params.push(MacroParamDef {
                constant: param.constant,
                ty,
            });
        }
        let returns = match &decl.returns {
            Some(returns) => self.resolve_type(returns, &scope)?,
            None => AliasedType::void(),
        };

        let def = &mut self.macros[id.0];
        def.params = params;
        def.returns = returns;
        def.state = ResolveState::Complete;
        Ok(())
    }

    /// Type and folded value of a package-level variable. Initializers must
    /// be compile-time constants.
    pub(crate) fn resolve_global_variable(
        &mut self,
        decl: &VarDecl,
        scope: &Rc<ModuleScope>,
    ) -> Result<(AliasedType, Option<ConstValue>), Error> {
        let declared = match &decl.ty {
            Some(ty) => Some(self.resolve_type(ty, scope)?),
            None => None,
        };

        let value = match &decl.value {
            Some(value) => {
                let typed = check_expr(self, value, declared.as_ref(), scope)?;
                match typed.constant {
                    Some(constant) => Some((typed.ty, constant)),
                    None => return Err(Error::new(ErrorImpl::ExpectedConstant, value.span.clone())),
                }
            }
            None => None,
        };

        let (ty, value) = match (declared, value) {
            (Some(ty), value) => (ty, value.map(|(_, value)| value)),
            (None, Some((ty, value))) => (ty, Some(value)),
            (None, None) => {
                return Err(Error::new(
                    ErrorImpl::MissingInitializer {
                        name: decl.name.name.clone(),
                    },
                    decl.name.span.clone(),
                ));
            }
        };
        self.check_value_type(&ty, &decl.name.span)?;
        self.require_complete(&ty, &decl.name.span)?;
        Ok((ty, value))
    }
}
