use std::collections::{BTreeSet, HashSet};
use std::fmt::Write as _;

use serde::Serialize;

use crate::config::LowerOptions;
use crate::descriptor::{MethodDescriptor, StackType};
use crate::diagnostics::CompileError;
use crate::hierarchy::StaticOwnerResolver;
use crate::input::{self, Program};
use crate::instr::{Instr, InstrList};
use crate::lower::{self, LowerContext, MethodInfo};
use crate::reduce;
use crate::unit::{PoolEntry, TranslationUnit};

/// Header every generated unit includes first.
pub const RUNTIME_HEADER: &str = "bcnative_runtime.h";

#[derive(Debug, Clone)]
pub struct LoweredMethod {
    pub symbol: String,
    /// The complete C function definition.
    pub code: String,
    /// Mangled names of classes the function references.
    pub dependencies: BTreeSet<String>,
    pub virtual_calls: BTreeSet<String>,
    pub folds: usize,
}

/// Lower one method whose instruction list was built against `unit` (try
/// regions registered, literals interned).
pub fn lower_method(
    mut list: InstrList,
    method: &MethodInfo,
    unit: &mut TranslationUnit,
    resolver: &dyn StaticOwnerResolver,
    options: &LowerOptions,
) -> Result<LoweredMethod, CompileError> {
    let symbol = method.symbol()?;
    lower_method_inner(&mut list, method, &symbol, unit, resolver, options)
        .map_err(|e| e.in_method(&symbol))
}

fn lower_method_inner(
    list: &mut InstrList,
    method: &MethodInfo,
    symbol: &str,
    unit: &mut TranslationUnit,
    resolver: &dyn StaticOwnerResolver,
    options: &LowerOptions,
) -> Result<LoweredMethod, CompileError> {
    let folds = if options.reduce { reduce::reduce(list) } else { 0 };
    mark_labels(list, unit)?;

    let mut dependencies = BTreeSet::new();
    for instr in list.iter() {
        instr.collect_dependencies(&mut dependencies);
    }

    let locals = lower::collect_locals(list, method)?;
    let body = LowerContext::new(list, unit, method, resolver, &locals)
        .with_annotations(options.annotate)
        .lower_body()?;

    let desc = MethodDescriptor::parse(&method.descriptor)?;
    let mut code = String::new();
    let mut params = vec!["THREAD_STATE".to_string()];
    if !method.is_static {
        params.push("JAVA_OBJECT __this".to_string());
    }
    params.extend(
        locals
            .iter()
            .filter(|l| l.param.as_deref().is_some_and(|p| p != "__this"))
            .map(|l| format!("{} {}", l.ty.c_type(), lower::param_name(l.slot))),
    );
    let _ = writeln!(code, "{} {}({}) {{", desc.ret.c_type(), symbol, params.join(", "));
    let _ = writeln!(code, "    DEFINE_METHOD_STACK({}, {});", method.max_stack, method.max_locals);
    for local in &locals {
        let init = match (&local.param, local.ty) {
            (Some(param), StackType::Object) => format!("RETAIN({param})"),
            (Some(param), _) => param.clone(),
            (None, ty) => ty.zero_value().to_string(),
        };
        let _ = writeln!(code, "    {} {} = {};", local.ty.c_type(), local.name, init);
    }
    for region in unit.try_regions() {
        let _ = writeln!(code, "    int __try_offset_{};", region.seq);
    }
    code.push_str(&body.code);
    code.push_str("}\n");

    tracing::debug!(method = %symbol, folds, instructions = list.len(), "lowered method");
    Ok(LoweredMethod {
        symbol: symbol.to_string(),
        code,
        dependencies,
        virtual_calls: body.virtual_calls,
        folds,
    })
}

/// Mark every branch and switch target as referenced, rejecting targets and
/// try-region labels that are not defined in the method.
fn mark_labels(list: &InstrList, unit: &mut TranslationUnit) -> Result<(), CompileError> {
    let mut defined = HashSet::new();
    for label in list.labels() {
        if !defined.insert(label) {
            return Err(CompileError::unsupported(format!("label_{label} is defined twice")));
        }
    }
    let mut targets = Vec::new();
    for instr in list.iter() {
        match instr {
            Instr::Jump(j) => targets.push(j.target),
            Instr::Switch(s) => {
                targets.extend(s.targets.iter().copied());
                targets.extend(s.default);
            }
            _ => {}
        }
    }
    for region in unit.try_regions() {
        targets.extend([region.start, region.end, region.handler]);
    }
    for target in targets {
        if !defined.contains(&target) {
            return Err(CompileError::unsupported(format!(
                "jump target label_{target} does not exist in this method"
            )));
        }
        unit.mark_label_referenced(target);
    }
    Ok(())
}

/// A method that could not be lowered in keep-going mode.
#[derive(Debug)]
pub struct SkippedMethod {
    pub method: String,
    pub error: CompileError,
}

/// Everything produced for one input program.
#[derive(Debug)]
pub struct LoweredUnit {
    pub methods: Vec<LoweredMethod>,
    pub dependencies: BTreeSet<String>,
    pub virtual_calls: BTreeSet<String>,
    pub constant_pool: Vec<PoolEntry>,
    pub skipped: Vec<SkippedMethod>,
}

/// Dependency and virtual-call lists handed to the link-time pruning stage.
#[derive(Debug, Serialize)]
pub struct UnitManifest<'a> {
    pub methods: Vec<&'a str>,
    pub dependencies: &'a BTreeSet<String>,
    pub virtual_calls: &'a BTreeSet<String>,
}

impl LoweredUnit {
    /// Full C text: includes, constant pool, then every function.
    pub fn to_c(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "#include \"{RUNTIME_HEADER}\"");
        for dep in &self.dependencies {
            let _ = writeln!(out, "#include \"{dep}.h\"");
        }
        if !self.constant_pool.is_empty() {
            out.push_str("\nstatic const char* const CONSTANT_POOL[] = {\n");
            for entry in &self.constant_pool {
                let text = match entry {
                    PoolEntry::String(s) | PoolEntry::Class(s) => s,
                };
                let _ = writeln!(out, "    {},", c_string_literal(text));
            }
            out.push_str("};\n");
        }
        for method in &self.methods {
            out.push('\n');
            out.push_str(&method.code);
        }
        out
    }

    pub fn manifest(&self) -> UnitManifest<'_> {
        UnitManifest {
            methods: self.methods.iter().map(|m| m.symbol.as_str()).collect(),
            dependencies: &self.dependencies,
            virtual_calls: &self.virtual_calls,
        }
    }
}

/// Lower every method with code in `program` against one translation unit.
pub fn lower_program(program: &Program, options: &LowerOptions) -> Result<LoweredUnit, CompileError> {
    let index = program.class_index();
    let mut unit = TranslationUnit::new();
    let mut methods = Vec::new();
    let mut skipped = Vec::new();

    for class in &program.classes {
        tracing::debug!(class = %class.name, methods = class.methods.len(), "lowering class");
        for method in class.methods.iter().filter(|m| m.has_code()) {
            let info = method.info(&class.name);
            let label = info.symbol().unwrap_or_else(|_| info.display_name());
            unit.begin_method();
            let result = input::build_method(method, &mut unit)
                .map_err(|e| e.in_method(&label))
                .and_then(|list| lower_method(list, &info, &mut unit, &index, options));
            match result {
                Ok(lowered) => methods.push(lowered),
                Err(error) if options.keep_going => {
                    tracing::warn!(method = %info.display_name(), %error, "skipping method");
                    skipped.push(SkippedMethod { method: info.display_name(), error });
                }
                Err(error) => return Err(error),
            }
        }
    }

    let dependencies = methods.iter().flat_map(|m| m.dependencies.iter().cloned()).collect();
    Ok(LoweredUnit {
        methods,
        dependencies,
        virtual_calls: unit.virtual_calls().clone(),
        constant_pool: unit.constant_pool().entries().to_vec(),
        skipped,
    })
}

/// Quote `text` as a C string literal. Non-printable and non-ASCII bytes use
/// three-digit octal escapes, which cannot run into a following character.
pub fn c_string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for byte in text.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            // `??` sequences would otherwise form trigraphs.
            b'?' => out.push_str("\\?"),
            0x20..=0x7e => out.push(byte as char),
            other => {
                let _ = write!(out, "\\{other:03o}");
            }
        }
    }
    out.push('"');
    out
}
