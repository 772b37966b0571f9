use std::rc::Rc;

use crate::{
    ast::ast::Ident,
    types::types::{AliasedType, ConstValue, StructId},
    Span,
};

use super::symbols::{GlobalId, ModuleScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(pub usize);

/// Ownership state of a local holding a unique value.
#[derive(Debug, Clone, PartialEq)]
pub enum Ownership {
    /// Copyable, or not yet holding a value.
    Unset,
    Owns,
    /// Moved out at the given site.
    Moved(Span),
}

#[derive(Debug, Clone)]
pub struct Local {
    pub name: Ident,
    pub ty: AliasedType,
    pub constant: bool,
    pub ownership: Ownership,
    /// Known value of a constant local.
    pub value: Option<ConstValue>,
    /// Index of the declaring block.
    pub depth: usize,
}

impl Local {
    pub fn owns(&self) -> bool {
        self.ownership == Ownership::Owns
    }
}

/// One lexical block of the function being lowered.
#[derive(Debug, Default)]
pub struct BlockFrame {
    pub locals: Vec<LocalId>,
    pub returned: bool,
    pub break_from: Option<LoopId>,
    /// Moves of locals declared outside the innermost loop, made on a path
    /// that has not left the loop yet.
    pub loop_moves: Vec<(LocalId, Span)>,
}

impl BlockFrame {
    pub fn terminated(&self) -> bool {
        self.returned || self.break_from.is_some()
    }
}

#[derive(Debug)]
pub struct LoopFrame {
    pub id: LoopId,
    pub label: Option<String>,
    /// Index of the loop body in the block stack.
    pub body_depth: usize,
    pub has_break: bool,
}

/// Lowering state of one function body.
#[derive(Debug)]
pub struct FunctionFrame {
    pub global: GlobalId,
    pub name: String,
    pub scope: Rc<ModuleScope>,
    pub returns: AliasedType,
    pub locals: Vec<Local>,
    pub blocks: Vec<BlockFrame>,
    pub loops: Vec<LoopFrame>,
    /// `this` and its struct, inside methods.
    pub receiver: Option<(LocalId, StructId)>,
    /// Nesting count of statically unreachable regions being lowered.
    pub unreachable: usize,
}

impl FunctionFrame {
    pub fn new(global: GlobalId, name: String, scope: Rc<ModuleScope>, returns: AliasedType) -> Self {
        FunctionFrame {
            global,
            name,
            scope,
            returns,
            locals: vec![],
            blocks: vec![],
            loops: vec![],
            receiver: None,
            unreachable: 0,
        }
    }

    pub fn local(&self, id: LocalId) -> &Local {
        &self.locals[id.0]
    }

    pub fn local_mut(&mut self, id: LocalId) -> &mut Local {
        &mut self.locals[id.0]
    }

    /// Innermost-first search through the open blocks.
    pub fn lookup(&self, name: &str) -> Option<LocalId> {
        self.blocks
            .iter()
            .rev()
            .flat_map(|block| block.locals.iter().rev())
            .copied()
            .find(|id| self.locals[id.0].name.name == name)
    }

    /// Owning locals of `blocks[from..]`, innermost block first and in
    /// reverse declaration order.
    pub fn owned_since(&self, from: usize) -> Vec<LocalId> {
        self.blocks[from..]
            .iter()
            .rev()
            .flat_map(|block| block.locals.iter().rev())
            .copied()
            .filter(|id| self.locals[id.0].owns())
            .collect()
    }

    /// Whether the local was declared outside loop `index`.
    pub fn outlives_loop(&self, id: LocalId, index: usize) -> bool {
        self.locals[id.0].depth < self.loops[index].body_depth
    }

    pub fn top_block(&mut self) -> &mut BlockFrame {
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }
}
