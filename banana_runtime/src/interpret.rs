use std::{
    cell::RefCell,
    mem,
    ops::ControlFlow,
    path::{Path, PathBuf},
    rc::Rc,
};

use banana_syntax::{
    ast::{AssignOp, BinOp, ElseCase, Ident, IfCase, Node, NodeKind, SwitchCase},
    error::Error,
    position::Span,
    stack::ensure_sufficient_stack,
};
use log::debug;

use crate::{
    environment::Env,
    error::{Exception, Fault},
    host::{Console, Workspace},
    members, module,
    ops::{self, list_of},
    types::{Callable, Func, List, Object, Value},
};

/// Nested user calls allowed before a RecursionError.
pub const MAX_CALL_DEPTH: usize = 10_000;

pub struct Interpreter {
    console: Box<dyn Console>,
    workspace: Rc<dyn Workspace>,
    /// Names of the calls and modules being evaluated, outermost first
    contexts: Vec<String>,
    /// Loops enclosing the current point within the current call
    loop_depth: usize,
    /// Scripts whose import is in progress
    importing: Vec<PathBuf>,
}

impl Interpreter {
    pub fn new(console: Box<dyn Console>, workspace: Rc<dyn Workspace>) -> Self {
        Self {
            console,
            workspace,
            contexts: vec!["<program>".to_string()],
            loop_depth: 0,
            importing: Vec::default(),
        }
    }

    pub fn console(&mut self) -> &mut dyn Console {
        self.console.as_mut()
    }

    pub fn workspace(&self) -> Rc<dyn Workspace> {
        Rc::clone(&self.workspace)
    }

    /// Evaluates a parsed program in `env`. A top-level `return` ends the
    /// program early with its value.
    pub fn interpret(&mut self, root: &Node, env: &Rc<RefCell<Env>>) -> Result<Value, Error> {
        match self.visit(root, env) {
            Ok(value) | Err(Exception::Return(value)) => Ok(value),
            Err(Exception::Error(e)) => Err(e),
            Err(Exception::Break | Exception::Continue) => {
                unreachable!("loop signals are rejected outside of loops")
            }
        }
    }

    pub(crate) fn is_importing(&self, path: &Path) -> bool {
        self.importing.iter().any(|p| p == path)
    }

    /// Runs an imported script as its own top level.
    pub(crate) fn interpret_module(
        &mut self,
        path: PathBuf,
        name: &str,
        root: &Node,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Error> {
        self.importing.push(path);
        self.contexts.push(format!("<module {name}>"));
        let loop_depth = mem::take(&mut self.loop_depth);
        let result = self.interpret(root, env);
        self.loop_depth = loop_depth;
        self.contexts.pop();
        self.importing.pop();
        result
    }

    fn visit(&mut self, node: &Node, env: &Rc<RefCell<Env>>) -> Result<Value, Exception> {
        ensure_sufficient_stack(|| self.visit_node(node, env))
    }

    fn visit_node(&mut self, node: &Node, env: &Rc<RefCell<Env>>) -> Result<Value, Exception> {
        match &node.kind {
            NodeKind::Number(n) => Ok(Value::Number(*n)),
            NodeKind::Str(s) => Ok(Value::Str(s.clone())),
            NodeKind::Boolean(b) => Ok(Value::Boolean(*b)),
            NodeKind::Null => Ok(Value::Null),
            NodeKind::List(items) => Ok(list_of(self.visit_all(items, env)?)),
            NodeKind::Object(entries) => self.visit_object(entries, env),
            NodeKind::Access(ident) => env
                .borrow()
                .get(&ident.name)
                .ok_or_else(|| Fault::Undefined(ident.name.clone()).at(&ident.span)),
            NodeKind::Member { target, member } => {
                let receiver = self.visit(target, env)?;
                members::lookup(&receiver, &member.name).map_err(|f| f.at(&member.span))
            }
            NodeKind::Assign {
                ident,
                op,
                value,
                declare,
                is_public,
            } => {
                if *declare {
                    let value = self.visit(value, env)?;
                    env.borrow_mut().set(&ident.name, value.clone(), *is_public);
                    Ok(value)
                } else {
                    self.visit_update(ident, *op, value, env)
                }
            }
            NodeKind::MemberAssign { path, op, value } => {
                self.visit_member_assign(path, *op, value, env)
            }
            NodeKind::Binary { lhs, op, rhs } => self.visit_binary(lhs, *op, rhs, env),
            NodeKind::Unary { op, operand } => {
                let value = self.visit(operand, env)?;
                ops::unary(*op, &value).map_err(|f| f.at(&operand.span))
            }
            NodeKind::If { cases, else_case } => self.visit_if(cases, else_case.as_deref(), env),
            NodeKind::Switch {
                subject,
                cases,
                default,
            } => self.visit_switch(subject, cases, default.as_deref(), env),
            NodeKind::ForCount {
                ident,
                start,
                end,
                step,
                body,
                is_block,
            } => self.visit_for_count(ident, start, end, step.as_deref(), body, *is_block, env),
            NodeKind::ForOfList {
                ident,
                list,
                body,
                is_block,
            } => {
                let Value::List(items) = self.visit(list, env)? else {
                    return Err(Fault::type_error("Expected list").at(&list.span));
                };
                self.visit_for_of_list(ident, &items, body, *is_block, env)
            }
            NodeKind::ForOfObject {
                key,
                value,
                object,
                body,
                is_block,
            } => {
                let Value::Object(entries) = self.visit(object, env)? else {
                    return Err(Fault::type_error("Expected object").at(&object.span));
                };
                self.visit_for_of_object(key, value, &entries, body, *is_block, env)
            }
            NodeKind::While {
                condition,
                body,
                is_block,
            } => self.visit_while(condition, body, *is_block, env),
            NodeKind::Func(def) => {
                let func = Value::Func(Func {
                    def: Rc::clone(def),
                    env: Rc::clone(env),
                });
                if let Some(name) = &def.name {
                    env.borrow_mut().set(&name.name, func.clone(), def.is_public);
                }
                Ok(func)
            }
            NodeKind::Call { callee, args } => self.visit_call(callee, args, &node.span, env),
            NodeKind::Import { lib, alias } => {
                let Value::Str(lib) = self.visit(lib, env)? else {
                    return Err(Fault::type_error("Lib name must be string").at(&node.span));
                };
                let exports = module::load(self, &lib).map_err(|f| f.at(&node.span))?;
                env.borrow_mut().set(&alias.name, Value::Object(exports), false);
                Ok(Value::Null)
            }
            NodeKind::Return(value) => {
                let value = match value {
                    Some(value) => self.visit(value, env)?,
                    None => Value::Null,
                };
                Err(Exception::Return(value))
            }
            NodeKind::Break if self.loop_depth == 0 => {
                Err(Fault::OutsideLoop("break").at(&node.span))
            }
            NodeKind::Break => Err(Exception::Break),
            NodeKind::Continue if self.loop_depth == 0 => {
                Err(Fault::OutsideLoop("continue").at(&node.span))
            }
            NodeKind::Continue => Err(Exception::Continue),
            NodeKind::Block(statements) => Ok(list_of(self.visit_all(statements, env)?)),
        }
    }

    fn visit_all(&mut self, nodes: &[Node], env: &Rc<RefCell<Env>>) -> Result<Vec<Value>, Exception> {
        let mut values = Vec::with_capacity(nodes.len());
        for node in nodes {
            values.push(self.visit(node, env)?);
        }
        Ok(values)
    }

    fn visit_object(
        &mut self,
        entries: &[(Ident, Node)],
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        let object = Object::default();
        for (key, value) in entries {
            let value = self.visit(value, env)?;
            object.set(&key.name, value);
        }
        Ok(Value::Object(object))
    }

    /// `x = v`, `x += v` and `x -= v`. The name must already be bound
    /// somewhere up the chain; the new value is written into the current
    /// scope with the visibility it had.
    fn visit_update(
        &mut self,
        ident: &Ident,
        op: AssignOp,
        value: &Node,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        let existing = env
            .borrow()
            .lookup(&ident.name)
            .ok_or_else(|| Fault::Undefined(ident.name.clone()).at(&ident.span))?;
        let rhs = self.visit(value, env)?;
        let updated = assign(op, &existing.value, rhs).map_err(|f| f.at(&value.span))?;
        env.borrow_mut()
            .set(&ident.name, updated.clone(), existing.is_public);
        Ok(updated)
    }

    fn visit_member_assign(
        &mut self,
        path: &[Ident],
        op: AssignOp,
        value: &Node,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        let [first, middle @ .., last] = path else {
            unreachable!("member assignment paths have at least two segments")
        };
        let root = env
            .borrow()
            .get(&first.name)
            .ok_or_else(|| Fault::Undefined(first.name.clone()).at(&first.span))?;
        let mut object = expect_object(root, first)?;
        for segment in middle {
            let next = object
                .get(&segment.name)
                .ok_or_else(|| Fault::Undefined(segment.name.clone()).at(&segment.span))?;
            object = expect_object(next, segment)?;
        }
        let rhs = self.visit(value, env)?;
        let updated = match op {
            AssignOp::Set => rhs,
            _ => {
                let old = object
                    .get(&last.name)
                    .ok_or_else(|| Fault::Undefined(last.name.clone()).at(&last.span))?;
                assign(op, &old, rhs).map_err(|f| f.at(&value.span))?
            }
        };
        object.set(&last.name, updated.clone());
        Ok(updated)
    }

    fn visit_binary(
        &mut self,
        lhs: &Node,
        op: BinOp,
        rhs: &Node,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        // `and`/`or` evaluate both operands too
        let left = self.visit(lhs, env)?;
        let right = self.visit(rhs, env)?;
        ops::binary(op, &left, &right).map_err(|f| f.at(&rhs.span))
    }

    fn visit_if(
        &mut self,
        cases: &[IfCase],
        else_case: Option<&ElseCase>,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        for case in cases {
            if self.visit(&case.condition, env)?.is_truthy() {
                let value = self.visit(&case.body, env)?;
                return Ok(if case.is_block { Value::Null } else { value });
            }
        }
        match else_case {
            Some(case) => {
                let value = self.visit(&case.body, env)?;
                Ok(if case.is_block { Value::Null } else { value })
            }
            None => Ok(Value::Null),
        }
    }

    fn visit_switch(
        &mut self,
        subject: &Node,
        cases: &[SwitchCase],
        default: Option<&Node>,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        let subject = self.visit(subject, env)?;
        for case in cases {
            if self.visit(&case.pattern, env)? == subject {
                self.visit(&case.body, env)?;
                return Ok(Value::Null);
            }
        }
        if let Some(body) = default {
            self.visit(body, env)?;
        }
        Ok(Value::Null)
    }

    /// Runs one loop iteration. `Continue(None)` means the body skipped the
    /// rest of the iteration.
    fn visit_loop_body(
        &mut self,
        body: &Node,
        env: &Rc<RefCell<Env>>,
    ) -> Result<ControlFlow<(), Option<Value>>, Exception> {
        self.loop_depth += 1;
        let result = self.visit(body, env);
        self.loop_depth -= 1;
        match result {
            Ok(value) => Ok(ControlFlow::Continue(Some(value))),
            Err(Exception::Continue) => Ok(ControlFlow::Continue(None)),
            Err(Exception::Break) => Ok(ControlFlow::Break(())),
            Err(e) => Err(e),
        }
    }

    fn expect_number(&mut self, node: &Node, env: &Rc<RefCell<Env>>) -> Result<f64, Exception> {
        match self.visit(node, env)? {
            Value::Number(n) => Ok(n),
            _ => Err(Fault::type_error("Expected number").at(&node.span)),
        }
    }

    /// The counter lives in the enclosing scope, so closures made in the
    /// body all observe its final value.
    #[allow(clippy::too_many_arguments)]
    fn visit_for_count(
        &mut self,
        ident: &Ident,
        start: &Node,
        end: &Node,
        step: Option<&Node>,
        body: &Node,
        is_block: bool,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        let mut i = self.expect_number(start, env)?;
        let end = self.expect_number(end, env)?;
        let step = match step {
            Some(step) => self.expect_number(step, env)?,
            None => 1.0,
        };
        let mut elements = Vec::default();
        while if step >= 0.0 { i < end } else { i > end } {
            env.borrow_mut().set(&ident.name, Value::Number(i), false);
            i += step;
            match self.visit_loop_body(body, env)? {
                ControlFlow::Continue(Some(value)) => elements.push(value),
                ControlFlow::Continue(None) => {}
                ControlFlow::Break(()) => return Ok(Value::Null),
            }
        }
        env.borrow_mut().set(&ident.name, Value::Number(i), false);
        Ok(loop_result(elements, is_block))
    }

    /// Walks the live list, so elements appended by the body are visited.
    fn visit_for_of_list(
        &mut self,
        ident: &Ident,
        items: &List,
        body: &Node,
        is_block: bool,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        let mut elements = Vec::default();
        let mut index = 0;
        while let Some(item) = items.get(index) {
            index += 1;
            env.borrow_mut().set(&ident.name, item, false);
            match self.visit_loop_body(body, env)? {
                ControlFlow::Continue(Some(value)) => elements.push(value),
                ControlFlow::Continue(None) => {}
                ControlFlow::Break(()) => return Ok(Value::Null),
            }
        }
        Ok(loop_result(elements, is_block))
    }

    fn visit_for_of_object(
        &mut self,
        key: &Ident,
        value: &Ident,
        object: &Object,
        body: &Node,
        is_block: bool,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        let mut elements = Vec::default();
        for (k, v) in object.entries() {
            {
                let mut env = env.borrow_mut();
                env.set(&key.name, Value::Str(k), false);
                env.set(&value.name, v, false);
            }
            match self.visit_loop_body(body, env)? {
                ControlFlow::Continue(Some(value)) => elements.push(value),
                ControlFlow::Continue(None) => {}
                ControlFlow::Break(()) => return Ok(Value::Null),
            }
        }
        Ok(loop_result(elements, is_block))
    }

    fn visit_while(
        &mut self,
        condition: &Node,
        body: &Node,
        is_block: bool,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        let mut elements = Vec::default();
        while self.visit(condition, env)?.is_truthy() {
            match self.visit_loop_body(body, env)? {
                ControlFlow::Continue(Some(value)) => elements.push(value),
                ControlFlow::Continue(None) => {}
                ControlFlow::Break(()) => return Ok(Value::Null),
            }
        }
        Ok(loop_result(elements, is_block))
    }

    fn visit_call(
        &mut self,
        callee: &Node,
        args: &[Node],
        span: &Span,
        env: &Rc<RefCell<Env>>,
    ) -> Result<Value, Exception> {
        let value = self.visit(callee, env)?;
        let args = self.visit_all(args, env)?;
        let callable: &dyn Callable = match &value {
            Value::Func(func) => func,
            Value::NativeFunc(func) => func,
            other => return Err(Fault::IllegalOperation(other.type_name()).at(&callee.span)),
        };
        let args = callable.bind_args(args).map_err(|f| f.at(span))?;
        if self.contexts.len() > MAX_CALL_DEPTH {
            return Err(Fault::Recursion(MAX_CALL_DEPTH).at(span));
        }

        let caller = self.contexts.last().cloned().unwrap_or_default();
        self.contexts.push(callable.name().to_string());
        let loop_depth = mem::take(&mut self.loop_depth);
        let result = callable.call(self, args, span);
        self.loop_depth = loop_depth;
        self.contexts.pop();
        result.map_err(|e| match e {
            Exception::Error(e) => Exception::Error(e.with_frame(&caller, span.clone())),
            other => other,
        })
    }

    /// Binds the arguments in a child of the closure's environment and runs
    /// the body. `=>` bodies return their value, block bodies need `return`.
    pub(crate) fn call_func(
        &mut self,
        func: &Func,
        args: Vec<Value>,
        span: &Span,
    ) -> Result<Value, Exception> {
        debug!("Call {} at {span}", func.name());
        let call_env = Env::with_parent(Rc::clone(&func.env));
        {
            let mut call_env = call_env.borrow_mut();
            for (param, value) in func.def.params.iter().zip(args) {
                call_env.set(&param.ident.name, value, false);
            }
        }
        match self.visit(&func.def.body, &call_env) {
            Ok(value) if func.def.auto_return => Ok(value),
            Ok(_) => Ok(Value::Null),
            Err(Exception::Return(value)) => Ok(value),
            Err(e) => Err(e),
        }
    }
}

fn assign(op: AssignOp, old: &Value, rhs: Value) -> Result<Value, Fault> {
    match op {
        AssignOp::Set => Ok(rhs),
        AssignOp::Add => ops::add(old, &rhs),
        AssignOp::Subtract => ops::subtract(old, &rhs),
    }
}

fn expect_object(value: Value, ident: &Ident) -> Result<Object, Exception> {
    match value {
        Value::Object(object) => Ok(object),
        _ => Err(Fault::type_error(format!("'{}' is not an object", ident.name)).at(&ident.span)),
    }
}

fn loop_result(elements: Vec<Value>, is_block: bool) -> Value {
    if is_block {
        Value::Null
    } else {
        list_of(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CapturedConsole, MemoryWorkspace};
    use banana_syntax::{error::ErrorKind, parse_file, position::SourceFile};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn eval(source: &str) -> Result<Value, Error> {
        let root = parse_file(&SourceFile::new("<test>", source))?;
        let mut interpreter = Interpreter::new(
            Box::new(CapturedConsole::default()),
            Rc::new(MemoryWorkspace::default()),
        );
        interpreter.interpret(&root, &Env::new())
    }

    /// The value of the last statement.
    fn last(source: &str) -> Value {
        let Value::List(values) = eval(source).unwrap() else {
            panic!("program did not evaluate to a statement list");
        };
        let len = values.len();
        values.get(len - 1).unwrap()
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[rstest]
    #[case("1 + 2 * 3", num(7.0))]
    #[case("(1 + 2) * 3", num(9.0))]
    #[case("2 ^ 3 ^ 2", num(512.0))]
    #[case("-2 ^ 2", num(-4.0))]
    #[case("1 < 2 and 2 < 3", Value::Boolean(true))]
    #[case("not 1 == 2", Value::Boolean(true))]
    #[case("null or 0", Value::Boolean(true))]
    fn expressions(#[case] source: &str, #[case] expected: Value) {
        assert_eq!(last(source), expected);
    }

    #[test]
    fn update_requires_a_binding() {
        let err = eval("y = 1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Name);
        assert_eq!(err.message, "'y' is not defined");
    }

    #[test]
    fn update_writes_the_current_scope() {
        let source = "let x = 1\nfunc f() => x += 1\nf()\nx";
        assert_eq!(last(source), num(1.0));
        assert_eq!(last("let x = 1\nx += 2\nx"), num(3.0));
    }

    #[test]
    fn logical_operators_evaluate_both_sides() {
        let err = eval("false and undefined_name").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Name);
        let source = "let hits = {n: 0}\nfunc bump() => hits.n += 1\ntrue or bump()\nfalse and bump()\nhits.n";
        assert_eq!(last(source), num(2.0));
        assert_eq!(last("true or 0"), Value::Boolean(true));
        assert_eq!(last("1 and \"x\""), Value::Boolean(true));
    }

    #[test]
    fn inline_and_block_loops() {
        assert_eq!(
            last("for i = 0 to 3 then i * 2"),
            list_of(vec![num(0.0), num(2.0), num(4.0)])
        );
        assert_eq!(last("for i = 3 to 0 step -1 then i"), list_of(vec![num(3.0), num(2.0), num(1.0)]));
        assert_eq!(last("for i = 0 to 3 then\ni\nend"), Value::Null);
        assert_eq!(last("let i = 0\nwhile i < 2 then i += 1"), list_of(vec![num(1.0), num(2.0)]));
    }

    #[test]
    fn continue_skips_and_break_stops() {
        let source = "for i = 0 to 5 then if i == 2 then continue else i";
        assert_eq!(
            last(source),
            list_of(vec![num(0.0), num(1.0), num(3.0), num(4.0)])
        );
        assert_eq!(last("for i = 0 to 5 then if i == 2 then break else i"), Value::Null);
        assert_eq!(last("let n = 0\nwhile true then\nn += 1\nif n == 4 then break\nend\nn"), num(4.0));
    }

    #[test]
    fn loop_counter_must_be_a_number() {
        let err = eval("for i = \"a\" to 3 then i").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.message, "Expected number");
    }

    #[test]
    fn break_inside_a_function_is_not_inside_the_loop() {
        let err = eval("func f()\nbreak\nend\nfor i = 0 to 2 then f()").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSyntax);
        assert_eq!(err.trace.len(), 1);
    }

    #[test]
    fn top_level_return_ends_the_program() {
        assert_eq!(eval("let x = 1\nreturn x + 1\nundefined").unwrap(), num(2.0));
    }

    #[test]
    fn block_functions_need_return() {
        let source = "func f(a)\na * 2\nend\nfunc g(a)\nreturn a * 2\nend\n[f(2), g(2)]";
        assert_eq!(last(source), list_of(vec![Value::Null, num(4.0)]));
    }

    #[test]
    fn calling_a_non_function_fails() {
        let err = eval("let x = 1\nx()").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalOperation);
    }

    #[test]
    fn errors_collect_call_frames() {
        let source = "func inner() => 1 / 0\nfunc outer() => inner()\nouter()";
        let err = eval(source).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        let contexts: Vec<&str> = err.trace.iter().map(|f| f.context.as_str()).collect();
        assert_eq!(contexts, vec!["outer", "<program>"]);
    }

    #[test]
    fn member_assignment_needs_objects() {
        let err = eval("let a = 1\na.b = 2").unwrap_err();
        assert_eq!(err.message, "'a' is not an object");
        let err = eval("let a = {b: 1}\na.b.c = 2").unwrap_err();
        assert_eq!(err.message, "'b' is not an object");
        assert_eq!(last("let a = {b: {c: 1}}\na.b.c += 4\na.b.c"), num(5.0));
    }

    #[test]
    fn object_loop_binds_key_and_value() {
        assert_eq!(
            last("for k, v of {a: 1, b: 2} then k + v"),
            list_of(vec![Value::Str("a1".to_string()), Value::Str("b2".to_string())])
        );
        let err = eval("for k, v of [1] then k").unwrap_err();
        assert_eq!(err.message, "Expected object");
    }
}
