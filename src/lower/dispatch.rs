use crate::descriptor::{MethodDescriptor, StackType};
use crate::diagnostics::CompileError;
use crate::instr::{DispatchKind, InvokeInstr, Receiver};
use crate::mangle;

use super::LowerContext;

impl LowerContext<'_> {
    pub(super) fn lower_invoke(&mut self, call: &InvokeInstr) -> Result<(), CompileError> {
        let desc = MethodDescriptor::parse(&call.descriptor)?;
        if !call.literal_args.is_empty() && call.literal_args.len() != desc.params.len() {
            return Err(CompileError::unsupported(format!(
                "{}.{}{} has {} literal argument slots for {} parameters",
                call.owner,
                call.name,
                call.descriptor,
                call.literal_args.len(),
                desc.params.len()
            )));
        }
        let is_static = call.kind == DispatchKind::Static;
        if is_static && call.receiver != Receiver::Stack {
            return Err(CompileError::unsupported(format!(
                "static call {}.{} with a receiver override",
                call.owner, call.name
            )));
        }

        // Pop in reverse declaration order, remembering what to release.
        let mut decls: Vec<(StackType, String)> = Vec::new();
        let mut args = vec![String::new(); desc.params.len()];
        let mut releases: Vec<String> = Vec::new();
        for (i, param) in desc.params.iter().enumerate().rev() {
            if let Some(Some(literal)) = call.literal_args.get(i) {
                args[i] = literal.clone();
                continue;
            }
            let ty = self.stack_type_of(param)?;
            let name = format!("__arg{i}");
            if ty == StackType::Object {
                releases.push(name.clone());
            }
            args[i] = name.clone();
            decls.push((ty, name));
        }
        let receiver = if is_static {
            None
        } else {
            Some(match &call.receiver {
                Receiver::Stack => {
                    decls.push((StackType::Object, "__receiver".to_string()));
                    releases.push("__receiver".to_string());
                    "__receiver".to_string()
                }
                Receiver::Literal(expr) => expr.clone(),
                Receiver::CurrentObject => self.receiver_this("self call")?.to_string(),
            })
        };

        let braced = !decls.is_empty();
        if braced {
            self.open_block();
            for (ty, name) in &decls {
                self.pop_into(*ty, name);
            }
        }
        if call.receiver == Receiver::Stack && !is_static {
            self.line("CHECK_NULL(__receiver);");
        }

        if call.owner.starts_with('[') && call.name == "clone" {
            // cloneArray allocates, so the copy arrives owned.
            let source = receiver.as_deref().unwrap_or("__receiver");
            let copy = format!("cloneArray(threadStateData, {source})");
            if call.discard_result {
                self.line(format!("RELEASE({copy});"));
            } else {
                self.line(format!("PUSH_OBJ({copy});"));
            }
        } else {
            let mut params = vec!["threadStateData".to_string()];
            params.extend(receiver);
            params.extend(args);
            let target = self.call_target(call, &desc);
            let expr = format!("{target}({})", params.join(", "));
            match desc.ret.stack_type() {
                Some(ty) if !call.discard_result => self.push_value(ty, &expr),
                _ => self.line(format!("{expr};")),
            }
        }

        for name in releases {
            self.line(format!("RELEASE({name});"));
        }
        if braced {
            self.close_block();
        }
        Ok(())
    }

    /// The C function to call: the mangled symbol directly for static and
    /// special calls, the `virtual_` stub for virtual and interface calls.
    fn call_target(&mut self, call: &InvokeInstr, desc: &MethodDescriptor) -> String {
        match call.kind {
            DispatchKind::Static => {
                let owner = self.resolver.static_method_owner(&call.owner, &call.name, &call.descriptor);
                mangle::method_symbol(&owner, &call.name, desc)
            }
            DispatchKind::Special => mangle::method_symbol(&call.owner, &call.name, desc),
            DispatchKind::Virtual | DispatchKind::Interface => {
                let symbol = mangle::method_symbol(&call.owner, &call.name, desc);
                self.unit.record_virtual_call(&symbol);
                self.virtual_calls.insert(symbol.clone());
                format!("virtual_{symbol}")
            }
        }
    }
}
