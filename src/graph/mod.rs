//! Build-rule dependency graph.
//!
//! [`RuleGraph`] is the backend-agnostic model populated during the
//! configuration pass. It owns every [`Rule`], [`UtilityTarget`] and
//! [`Target`], indexes rules by output for constant-time lookup, and records
//! which directory scope each entry was added in so backends can render one
//! build fragment per directory.
//!
//! Iteration always follows insertion order. Make dialects pick the default
//! target and resolve symbolic targets by position, so the graph never
//! reorders its contents.
//!
//! # Examples
//!
//! ```
//! use camino::{Utf8Path, Utf8PathBuf};
//! use kiln::graph::{Rule, RuleGraph};
//!
//! let mut graph = RuleGraph::new();
//! let rule = Rule::new(
//!     vec![Utf8PathBuf::from("out.txt")],
//!     vec![vec!["cp".into(), "in.txt".into(), "out.txt".into()]],
//! )
//! .with_inputs(vec![Utf8PathBuf::from("in.txt")]);
//! let id = graph.add_rule(rule).expect("first rule");
//! assert_eq!(graph.resolve_dependents(Utf8Path::new("out.txt")), Some(id));
//! ```

mod cycle;
mod error;

use std::collections::{HashMap, HashSet};
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

pub use error::GraphError;

use crate::sources::SourceRegistry;

/// One command invocation: program followed by its arguments.
pub type CommandLine = Vec<String>;

/// Handle to a [`Rule`] stored in a [`RuleGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(usize);

/// Handle to a [`UtilityTarget`] stored in a [`RuleGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtilityId(usize);

/// Handle to a [`Target`] stored in a [`RuleGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(usize);

impl RuleId {
    /// Position of the rule in insertion order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule #{}", self.0)
    }
}

/// A unit of build work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Files produced by the rule; the first one is the primary output.
    pub outputs: Vec<Utf8PathBuf>,
    /// Files the rule reads.
    pub inputs: Vec<Utf8PathBuf>,
    /// Directory the commands run in; `None` runs them where make runs.
    pub working_dir: Option<Utf8PathBuf>,
    /// Command invocations executed in order.
    pub commands: Vec<CommandLine>,
    /// Message echoed when the rule runs.
    pub comment: Option<String>,
    /// Rebuild on every run, for rules without a real output file.
    pub always_build: bool,
}

impl Rule {
    /// Create a rule with outputs and commands; everything else empty.
    #[must_use]
    pub const fn new(outputs: Vec<Utf8PathBuf>, commands: Vec<CommandLine>) -> Self {
        Self {
            outputs,
            inputs: Vec::new(),
            working_dir: None,
            commands,
            comment: None,
            always_build: false,
        }
    }

    /// Set the rule inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<Utf8PathBuf>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the comment echoed when the rule runs.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Mark the rule as always out of date.
    #[must_use]
    pub fn always_build(mut self, always: bool) -> Self {
        self.always_build = always;
        self
    }

    /// The first declared output.
    #[must_use]
    pub fn primary_output(&self) -> Option<&Utf8Path> {
        self.outputs.first().map(Utf8PathBuf::as_path)
    }
}

/// A named aggregate with no file output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtilityTarget {
    /// Name, unique among utilities and targets.
    pub name: String,
    /// Paths or target names this utility depends on.
    pub depends: Vec<Utf8PathBuf>,
    /// Whether the utility is considered out of date on every run.
    pub always_out_of_date: bool,
}

/// A named real target built from a list of sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Name, unique among utilities and targets.
    pub name: String,
    /// Source files, including generated ones.
    pub sources: Vec<Utf8PathBuf>,
}

/// Entry recorded in a [`DirectoryScope`], in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeItem {
    /// A build rule.
    Rule(RuleId),
    /// A real target.
    Target(TargetId),
    /// A utility target.
    Utility(UtilityId),
}

/// Everything one directory contributed to the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryScope {
    path: Utf8PathBuf,
    items: Vec<ScopeItem>,
}

impl DirectoryScope {
    /// Directory path relative to the project root (`.` for the root).
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Entries in the order they were added.
    #[must_use]
    pub fn items(&self) -> &[ScopeItem] {
        &self.items
    }
}

/// Findings from [`RuleGraph::analyse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphReport {
    /// `(rule output, input)` pairs whose input is neither produced by a
    /// rule nor a registered source. Backends treat such inputs as external
    /// files.
    pub dangling: Vec<(Utf8PathBuf, Utf8PathBuf)>,
}

/// The rule graph of one configuration pass.
#[derive(Debug, Default)]
pub struct RuleGraph {
    rules: Vec<Rule>,
    outputs: HashMap<Utf8PathBuf, RuleId>,
    utilities: Vec<UtilityTarget>,
    targets: Vec<Target>,
    names: HashSet<String>,
    scopes: Vec<DirectoryScope>,
    current: Option<usize>,
}

impl RuleGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record subsequent additions in the scope for `path`, creating it on
    /// first use.
    pub fn enter_directory(&mut self, path: impl Into<Utf8PathBuf>) {
        let path = path.into();
        let index = if let Some(index) = self.scopes.iter().position(|s| s.path == path) {
            index
        } else {
            self.scopes.push(DirectoryScope {
                path,
                items: Vec::new(),
            });
            self.scopes.len() - 1
        };
        self.current = Some(index);
    }

    fn record(&mut self, item: ScopeItem) {
        if self.current.is_none() {
            self.enter_directory(".");
        }
        if let Some(scope) = self.current.and_then(|i| self.scopes.get_mut(i)) {
            scope.items.push(item);
        }
    }

    /// Add a rule.
    ///
    /// The graph is unchanged when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EmptyOutputs`] or [`GraphError::EmptyCommand`]
    /// for an incomplete rule, [`GraphError::RepeatedOutput`] when the rule
    /// lists an output twice, and [`GraphError::DuplicateOutput`] when another
    /// rule already produces one of its outputs.
    pub fn add_rule(&mut self, rule: Rule) -> Result<RuleId, GraphError> {
        let Some(primary) = rule.outputs.first() else {
            return Err(GraphError::EmptyOutputs);
        };
        if rule.commands.is_empty() || rule.commands.iter().any(Vec::is_empty) {
            return Err(GraphError::EmptyCommand {
                output: primary.clone(),
            });
        }
        let mut seen = HashSet::new();
        for output in &rule.outputs {
            if let Some(existing) = self.outputs.get(output) {
                return Err(GraphError::DuplicateOutput {
                    output: output.clone(),
                    existing: *existing,
                });
            }
            if !seen.insert(output) {
                return Err(GraphError::RepeatedOutput {
                    output: output.clone(),
                });
            }
        }

        let id = RuleId(self.rules.len());
        for output in &rule.outputs {
            self.outputs.insert(output.clone(), id);
        }
        debug!(%id, output = %primary, inputs = rule.inputs.len(), "registered rule");
        self.rules.push(rule);
        self.record(ScopeItem::Rule(id));
        Ok(id)
    }

    fn claim_name(&mut self, name: &str) -> Result<(), GraphError> {
        if self.names.contains(name) {
            return Err(GraphError::DuplicateName {
                name: name.to_owned(),
            });
        }
        self.names.insert(name.to_owned());
        Ok(())
    }

    /// Add a named utility target.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateName`] when the name is already used by
    /// a utility or a real target; the graph is unchanged in that case.
    pub fn add_utility_target(
        &mut self,
        name: &str,
        depends: Vec<Utf8PathBuf>,
        always_out_of_date: bool,
    ) -> Result<UtilityId, GraphError> {
        self.claim_name(name)?;
        let id = UtilityId(self.utilities.len());
        debug!(name, depends = depends.len(), "registered utility target");
        self.utilities.push(UtilityTarget {
            name: name.to_owned(),
            depends,
            always_out_of_date,
        });
        self.record(ScopeItem::Utility(id));
        Ok(id)
    }

    /// Add a named real target.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateName`] when the name is already used.
    pub fn add_target(
        &mut self,
        name: &str,
        sources: Vec<Utf8PathBuf>,
    ) -> Result<TargetId, GraphError> {
        self.claim_name(name)?;
        let id = TargetId(self.targets.len());
        debug!(name, sources = sources.len(), "registered target");
        self.targets.push(Target {
            name: name.to_owned(),
            sources,
        });
        self.record(ScopeItem::Target(id));
        Ok(id)
    }

    /// The rule producing `output`, if any.
    ///
    /// Renderers use this to tell graph-internal paths from external files.
    #[must_use]
    pub fn resolve_dependents(&self, output: &Utf8Path) -> Option<RuleId> {
        self.outputs.get(output).copied()
    }

    /// Whether `name` is used by a utility or a real target.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Look up a rule.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.0)
    }

    /// Look up a utility target.
    #[must_use]
    pub fn utility(&self, id: UtilityId) -> Option<&UtilityTarget> {
        self.utilities.get(id.0)
    }

    /// Look up a real target.
    #[must_use]
    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(id.0)
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId(i), r))
    }

    /// Utility targets in insertion order.
    pub fn utilities(&self) -> impl Iterator<Item = &UtilityTarget> {
        self.utilities.iter()
    }

    /// Real targets in insertion order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    /// Directory scopes in first-entry order.
    #[must_use]
    pub fn scopes(&self) -> &[DirectoryScope] {
        &self.scopes
    }

    /// Number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Number of utility targets.
    #[must_use]
    pub fn utility_count(&self) -> usize {
        self.utilities.len()
    }

    /// Check the graph for cycles and report dangling inputs.
    ///
    /// An input is dangling when no rule produces it and `sources` does not
    /// know it either. Dangling inputs are legal but reported so they are
    /// never silently masked.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CircularDependency`] when rules form a cycle.
    pub fn analyse(&self, sources: &SourceRegistry) -> Result<GraphReport, GraphError> {
        let report = cycle::analyse(self);
        if let Some(cycle) = report.cycle {
            return Err(GraphError::CircularDependency { cycle });
        }
        let dangling: Vec<_> = report
            .missing_dependencies
            .into_iter()
            .filter(|(_, input)| !sources.contains_path(input))
            .collect();
        for (output, input) in &dangling {
            warn!(%output, %input, "rule input is neither generated nor a known source");
        }
        Ok(GraphReport { dangling })
    }
}
