use mlua::{Lua, MultiValue, Table, Value};

/// Builds the value `require(name)` returns for a statically linked module.
pub type ModuleInit = fn(&Lua) -> mlua::Result<Value>;

pub struct PreloadBuilder {
    modules: Vec<(&'static str, ModuleInit)>,
}

impl PreloadBuilder {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    pub fn with_module(mut self, name: &'static str, init: ModuleInit) -> Self {
        self.modules.push((name, init));
        self
    }

    pub fn build(self) -> Preload {
        Preload {
            modules: self.modules,
        }
    }
}

impl Default for PreloadBuilder {
    /// Modules linked into this binary. None ship by default; embedders add
    /// theirs here.
    fn default() -> Self {
        Self::new()
    }
}

/// Statically linked modules, made available to `require` without touching disk.
pub struct Preload {
    modules: Vec<(&'static str, ModuleInit)>,
}

impl Preload {
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modules.iter().map(|(name, _)| *name)
    }

    /// Stores one loader per module in `package.preload`.
    ///
    /// Must run after the standard libraries are registered.
    ///
    /// # Errors
    /// Returns an error if `package.preload` is missing or a loader cannot be created.
    pub fn attach(&self, lua: &Lua) -> mlua::Result<()> {
        if self.modules.is_empty() {
            return Ok(());
        }
        let package: Table = lua.globals().get("package")?;
        let preload: Table = package.get("preload")?;
        for &(name, init) in &self.modules {
            let loader = lua.create_function(move |lua, _: MultiValue| init(lua))?;
            preload.set(name, loader)?;
        }
        Ok(())
    }
}

impl Default for Preload {
    fn default() -> Self {
        PreloadBuilder::default().build()
    }
}
