use std::rc::Rc;

use tracing::trace;

use crate::{
    ast::statements::Item,
    errors::errors::{Error, ErrorImpl},
    symbols::symbols::{ModuleScope, PackageMember, TemplateEntity, TemplateId, TemplateInstance},
    types::types::AliasedType,
    Span,
};

use super::type_checker::{InstanceNames, TypeChecker};

impl TypeChecker {
    /// Returns the instance of `template` for `args`, creating it on the
    /// first request.
    ///
    /// A new instance is recorded in the cache before its signature is
    /// resolved, so self references through pointers and recursive calls
    /// reach the same entity. An instance that needs its own completed
    /// signature while it is still being resolved is a cycle. Nesting is
    /// bounded by `max_instantiation_depth`.
    pub fn instantiate(
        &mut self,
        template: TemplateId,
        args: Vec<AliasedType>,
        span: &Span,
    ) -> Result<TemplateEntity, Error> {
        let def = &self.templates[template.0];
        let package_name = self.packages[def.package.0].name.clone();
        let name = format!("{}::{}", package_name, def.name);

        if args.len() != def.params.len() {
            return Err(Error::new(
                ErrorImpl::TemplateArity {
                    name,
                    expected: def.params.len(),
                    received: args.len(),
                },
                span.clone(),
            ));
        }

        if let Some(entity) = def.find_instance(&args) {
            trace!(template = %name, "instance cache hit");
            return Ok(entity);
        }

        let limit = self.options.max_instantiation_depth;
        if self.instantiation_depth() >= limit {
            return Err(Error::new(ErrorImpl::InstantiationDepth { name, limit }, span.clone()));
        }

        let shown = format!(
            "{}<{}>",
            name,
            args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>().join(", ")
        );
        let scope = Rc::new(ModuleScope {
            package: def.package,
            imports: def.scope.imports.clone(),
            bindings: def
                .params
                .iter()
                .map(|param| param.name.clone())
                .zip(args.iter().cloned())
                .collect(),
        });
        let item = Rc::clone(&def.item);

        self.instance_counter += 1;
        trace!(instance = %shown, number = self.instance_counter, "instantiating");
        let names = InstanceNames {
            ir_suffix: self.instance_counter,
            display: shown,
        };

        // Bodies declared here are lowered one level deeper than this point.
        self.in_progress.push((template, args.clone()));
        let resolved = self.declare_instance(template, name, &item, &scope, names, args, span);
        self.in_progress.pop();
        resolved
    }

    #[allow(clippy::too_many_arguments)]
    fn declare_instance(
        &mut self,
        template: TemplateId,
        name: String,
        item: &Item,
        scope: &Rc<ModuleScope>,
        names: InstanceNames,
        args: Vec<AliasedType>,
        span: &Span,
    ) -> Result<TemplateEntity, Error> {
        let entity = match self.declare_item(item, scope, Some(names))? {
            Some(PackageMember::Struct(id)) => TemplateEntity::Struct(id),
            Some(PackageMember::Global(id)) => TemplateEntity::Global(id),
            _ => {
                return Err(Error::new(ErrorImpl::NotATemplate { name }, span.clone()));
            }
        };

        self.templates[template.0].instances.push(TemplateInstance { args, entity });

        self.detached(|checker| match entity {
            TemplateEntity::Struct(id) => checker.complete_struct(id, span),
            TemplateEntity::Global(id) => checker.global_type(id, span).map(|_| ()),
        })?;

        Ok(entity)
    }
}
