/// Failures of the boundary planner core.
///
/// All of these are deterministic functions of the input: nothing is retried
/// and a run either completes for every requested root or not at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A module lists a dependency that no descriptor provides.
    #[error("module '{module}' depends on unknown module '{dependency}'")]
    UnresolvedDependency { module: String, dependency: String },

    /// Two descriptors share a name.
    #[error("module '{name}' is declared more than once")]
    DuplicateModule { name: String },

    /// The build requested no root modules, so there is nothing to build.
    #[error("no modules selected: need at least one root module to plan")]
    EmptySelection,

    /// A requested root does not exist in the registry.
    #[error("selected module '{name}' is not declared in the manifest")]
    UnknownRootName { name: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
