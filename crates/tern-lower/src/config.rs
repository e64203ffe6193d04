use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use tern_typeck::{CheckConfig, FunctionInfo, Type, TypeParam};

/// Functions whose calls are never considered pure.
const DEFAULT_IO_FUNCTIONS: &[&str] = &["print", "println", "read_line", "read_file", "write_file"];

/// Settings for one run of the lowering pipeline.
#[derive(Clone, Debug)]
pub struct LowerConfig {
    /// Name given to the IR module. Defaults to the AST module's name.
    pub module_name: Option<SmolStr>,
    pub check: CheckConfig,
    pub io_functions: HashSet<SmolStr>,
    pub stdlib: StdlibMetadata,
}

impl LowerConfig {
    pub fn new() -> Self {
        Self {
            module_name: None,
            check: CheckConfig::default(),
            io_functions: DEFAULT_IO_FUNCTIONS.iter().map(|n| SmolStr::new(n)).collect(),
            stdlib: StdlibMetadata::default(),
        }
    }

    pub fn with_module_name(mut self, name: impl Into<SmolStr>) -> Self {
        self.module_name = Some(name.into());
        self
    }

    pub fn with_check(mut self, check: CheckConfig) -> Self {
        self.check = check;
        self
    }

    pub fn with_io_function(mut self, name: impl Into<SmolStr>) -> Self {
        self.io_functions.insert(name.into());
        self
    }

    pub fn with_stdlib(mut self, stdlib: StdlibMetadata) -> Self {
        self.stdlib = stdlib;
        self
    }
}

impl Default for LowerConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Standard library metadata ────────────────────────────────────

/// A type exported by a standard library module.
#[derive(Clone, Debug)]
pub struct StdlibType {
    pub name: SmolStr,
    pub type_params: Vec<TypeParam>,
    pub ty: Type,
}

/// The exports of one importable standard library module.
#[derive(Clone, Debug, Default)]
pub struct StdlibModule {
    pub functions: Vec<FunctionInfo>,
    pub types: Vec<StdlibType>,
}

impl StdlibModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(mut self, info: FunctionInfo) -> Self {
        self.functions.push(info);
        self
    }

    pub fn ty(mut self, name: impl Into<SmolStr>, type_params: Vec<TypeParam>, ty: Type) -> Self {
        self.types.push(StdlibType {
            name: name.into(),
            type_params,
            ty,
        });
        self
    }

    pub fn exports(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name) || self.types.iter().any(|t| t.name == name)
    }
}

/// Signatures provided by the standard library. Registration is done by the
/// caller; the pipeline only consumes this description.
#[derive(Clone, Debug, Default)]
pub struct StdlibMetadata {
    pub modules: HashMap<SmolStr, StdlibModule>,
    /// Functions available without any import.
    pub prelude: Vec<FunctionInfo>,
}

impl StdlibMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, path: impl Into<SmolStr>, module: StdlibModule) -> Self {
        self.modules.insert(path.into(), module);
        self
    }

    pub fn with_prelude(mut self, info: FunctionInfo) -> Self {
        self.prelude.push(info);
        self
    }

    pub fn module(&self, path: &str) -> Option<&StdlibModule> {
        self.modules.get(path)
    }
}
