use crate::diagnostics::CompileError;

/// A JVM type as written in a descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JvmType {
    Int,
    Long,
    Float,
    Double,
    Byte,
    Char,
    Short,
    Boolean,
    Void,
    /// Internal class name, e.g. `java/lang/String`.
    Reference(String),
    Array(Box<JvmType>),
}

/// The five slot kinds of the typed runtime operand stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StackType {
    Int,
    Long,
    Float,
    Double,
    Object,
}

/// Element types the runtime's typed array accessors understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Float,
    Double,
    Long,
    Int,
    Byte,
    Char,
    Short,
    Object,
}

impl JvmType {
    pub fn stack_type(&self) -> Option<StackType> {
        match self {
            JvmType::Int | JvmType::Byte | JvmType::Char | JvmType::Short | JvmType::Boolean => {
                Some(StackType::Int)
            }
            JvmType::Long => Some(StackType::Long),
            JvmType::Float => Some(StackType::Float),
            JvmType::Double => Some(StackType::Double),
            JvmType::Reference(_) | JvmType::Array(_) => Some(StackType::Object),
            JvmType::Void => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JvmType::Reference(_) | JvmType::Array(_))
    }

    /// Number of JVM local-variable slots a value of this type occupies.
    pub fn slot_width(&self) -> u16 {
        match self {
            JvmType::Long | JvmType::Double => 2,
            JvmType::Void => 0,
            _ => 1,
        }
    }

    /// The C type used for parameters and return values of this type.
    pub fn c_type(&self) -> &'static str {
        match self {
            JvmType::Int => "JAVA_INT",
            JvmType::Long => "JAVA_LONG",
            JvmType::Float => "JAVA_FLOAT",
            JvmType::Double => "JAVA_DOUBLE",
            JvmType::Byte => "JAVA_BYTE",
            JvmType::Char => "JAVA_CHAR",
            JvmType::Short => "JAVA_SHORT",
            JvmType::Boolean => "JAVA_BOOLEAN",
            JvmType::Void => "JAVA_VOID",
            JvmType::Reference(_) | JvmType::Array(_) => "JAVA_OBJECT",
        }
    }

    pub fn to_descriptor(&self) -> String {
        match self {
            JvmType::Int => "I".into(),
            JvmType::Long => "J".into(),
            JvmType::Float => "F".into(),
            JvmType::Double => "D".into(),
            JvmType::Byte => "B".into(),
            JvmType::Char => "C".into(),
            JvmType::Short => "S".into(),
            JvmType::Boolean => "Z".into(),
            JvmType::Void => "V".into(),
            JvmType::Reference(name) => format!("L{};", name),
            JvmType::Array(inner) => format!("[{}", inner.to_descriptor()),
        }
    }
}

impl StackType {
    /// Suffix of the runtime's typed push/pop macros (`PUSH_INT`, `POP_OBJ`).
    pub fn macro_suffix(self) -> &'static str {
        match self {
            StackType::Int => "INT",
            StackType::Long => "LONG",
            StackType::Float => "FLOAT",
            StackType::Double => "DOUBLE",
            StackType::Object => "OBJ",
        }
    }

    pub fn c_type(self) -> &'static str {
        match self {
            StackType::Int => "JAVA_INT",
            StackType::Long => "JAVA_LONG",
            StackType::Float => "JAVA_FLOAT",
            StackType::Double => "JAVA_DOUBLE",
            StackType::Object => "JAVA_OBJECT",
        }
    }

    /// Prefix of generated local variable names (`ilocals_3_`).
    pub fn local_prefix(self) -> char {
        match self {
            StackType::Int => 'i',
            StackType::Long => 'l',
            StackType::Float => 'f',
            StackType::Double => 'd',
            StackType::Object => 'o',
        }
    }

    pub fn zero_value(self) -> &'static str {
        match self {
            StackType::Object => "JAVA_NULL",
            _ => "0",
        }
    }
}

impl ElementType {
    pub fn macro_suffix(self) -> &'static str {
        match self {
            ElementType::Float => "FLOAT",
            ElementType::Double => "DOUBLE",
            ElementType::Long => "LONG",
            ElementType::Int => "INT",
            ElementType::Byte => "BYTE",
            ElementType::Char => "CHAR",
            ElementType::Short => "SHORT",
            ElementType::Object => "OBJECT",
        }
    }

    pub fn stack_type(self) -> StackType {
        match self {
            ElementType::Float => StackType::Float,
            ElementType::Double => StackType::Double,
            ElementType::Long => StackType::Long,
            ElementType::Int | ElementType::Byte | ElementType::Char | ElementType::Short => {
                StackType::Int
            }
            ElementType::Object => StackType::Object,
        }
    }
}

/// Parse a single type descriptor starting at byte `pos`.
/// Returns the type and the position just past it.
pub fn parse_type_at(desc: &str, pos: usize) -> Option<(JvmType, usize)> {
    let bytes = desc.as_bytes();
    if pos >= bytes.len() {
        return None;
    }
    match bytes[pos] {
        b'B' => Some((JvmType::Byte, pos + 1)),
        b'C' => Some((JvmType::Char, pos + 1)),
        b'D' => Some((JvmType::Double, pos + 1)),
        b'F' => Some((JvmType::Float, pos + 1)),
        b'I' => Some((JvmType::Int, pos + 1)),
        b'J' => Some((JvmType::Long, pos + 1)),
        b'S' => Some((JvmType::Short, pos + 1)),
        b'Z' => Some((JvmType::Boolean, pos + 1)),
        b'V' => Some((JvmType::Void, pos + 1)),
        b'L' => {
            let end = desc[pos..].find(';')? + pos;
            if end == pos + 1 {
                return None;
            }
            Some((JvmType::Reference(desc[pos + 1..end].to_string()), end + 1))
        }
        b'[' => {
            let (inner, next) = parse_type_at(desc, pos + 1)?;
            if inner == JvmType::Void {
                return None;
            }
            Some((JvmType::Array(Box::new(inner)), next))
        }
        _ => None,
    }
}

/// Parse a complete field descriptor.
pub fn parse_field_descriptor(desc: &str) -> Result<JvmType, CompileError> {
    match parse_type_at(desc, 0) {
        Some((ty, end)) if end == desc.len() && ty != JvmType::Void => Ok(ty),
        _ => Err(CompileError::unsupported(format!("malformed field descriptor '{desc}'"))),
    }
}

/// A parsed method descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<JvmType>,
    pub ret: JvmType,
}

impl MethodDescriptor {
    pub fn parse(desc: &str) -> Result<Self, CompileError> {
        let malformed =
            || CompileError::unsupported(format!("malformed method descriptor '{desc}'"));
        if !desc.starts_with('(') {
            return Err(malformed());
        }
        let mut pos = 1;
        let mut params = Vec::new();
        loop {
            match desc.as_bytes().get(pos) {
                Some(b')') => {
                    pos += 1;
                    break;
                }
                Some(_) => {
                    let (ty, next) = parse_type_at(desc, pos).ok_or_else(malformed)?;
                    if ty == JvmType::Void {
                        return Err(malformed());
                    }
                    params.push(ty);
                    pos = next;
                }
                None => return Err(malformed()),
            }
        }
        let (ret, end) = parse_type_at(desc, pos).ok_or_else(malformed)?;
        if end != desc.len() {
            return Err(malformed());
        }
        Ok(MethodDescriptor { params, ret })
    }

    pub fn returns_value(&self) -> bool {
        self.ret != JvmType::Void
    }
}

/// Strip array prefixes from a descriptor or internal name and return the
/// referenced class, recursively unwrapping nested arrays. `None` means the
/// innermost element is primitive; callers fall back to [`primitive_c_name`].
pub fn element_class_name(name: &str) -> Option<&str> {
    if let Some(rest) = name.strip_prefix('[') {
        return element_class_name(rest);
    }
    if let Some(inner) = name.strip_prefix('L').and_then(|r| r.strip_suffix(';')) {
        return Some(inner);
    }
    if name.len() == 1 && primitive_c_name(name.as_bytes()[0]).is_some() {
        return None;
    }
    Some(name)
}

/// C name of a primitive descriptor character, used for primitive array
/// class identities (`class_array1__JAVA_INT`).
pub fn primitive_c_name(tag: u8) -> Option<&'static str> {
    match tag {
        b'I' => Some("JAVA_INT"),
        b'J' => Some("JAVA_LONG"),
        b'F' => Some("JAVA_FLOAT"),
        b'D' => Some("JAVA_DOUBLE"),
        b'B' => Some("JAVA_BYTE"),
        b'C' => Some("JAVA_CHAR"),
        b'S' => Some("JAVA_SHORT"),
        b'Z' => Some("JAVA_BOOLEAN"),
        _ => None,
    }
}

/// Whether `name` is usable as a type operand: an array descriptor, or a
/// plain internal class name.
pub fn is_type_name(name: &str) -> bool {
    if name.starts_with('[') {
        return parse_field_descriptor(name).is_ok();
    }
    !name.is_empty() && !name.contains([';', '['])
}

/// Number of leading `[` in a descriptor.
pub fn array_dimensions(desc: &str) -> usize {
    desc.bytes().take_while(|b| *b == b'[').count()
}

/// Element type of a fully stripped array descriptor (`I`, `Ljava/lang/String;`).
pub fn element_type_of(desc: &str) -> Result<ElementType, CompileError> {
    let stripped = desc.trim_start_matches('[');
    let ty = match stripped.as_bytes().first() {
        Some(b'F') => ElementType::Float,
        Some(b'D') => ElementType::Double,
        Some(b'J') => ElementType::Long,
        Some(b'I') => ElementType::Int,
        Some(b'B') | Some(b'Z') => ElementType::Byte,
        Some(b'C') => ElementType::Char,
        Some(b'S') => ElementType::Short,
        Some(b'L') | Some(b'[') => ElementType::Object,
        _ => {
            return Err(CompileError::unsupported(format!("no element type in '{desc}'")));
        }
    };
    Ok(ty)
}
