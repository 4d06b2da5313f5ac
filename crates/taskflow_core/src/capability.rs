//! Capability negotiation for optional source operations.
//!
//! # Responsibility
//! - Probe a source for the optional operations it currently provides.
//! - Evaluate capability requirements written as a disjunction of
//!   conjunctions over capability literals.
//! - Gate operator calls before any side effect happens.
//!
//! # Invariants
//! - The feature vector is probed on every check and never cached; sources
//!   may toggle optional operations during the process lifetime.
//! - A requirement with no clauses is never satisfied; an empty clause is
//!   always satisfied.

use crate::error::{OperatorError, OperatorResult};
use crate::source::Source;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::str::FromStr;

/// Optional source capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// `A1`: bulk listing by kind.
    Listing,
    /// `R1`: task to board lookup; a task has at most one board.
    TaskUniqueBoard,
    /// `R2`: step to flow lookup; a step has at most one flow.
    StepUniqueFlow,
    /// `ST1`: step to tasks lookup.
    StepTasks,
}

impl Capability {
    /// Stable short code used in requirement expressions and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Listing => CAPABILITY_LISTING,
            Self::TaskUniqueBoard => CAPABILITY_TASK_UNIQUE_BOARD,
            Self::StepUniqueFlow => CAPABILITY_STEP_UNIQUE_FLOW,
            Self::StepTasks => CAPABILITY_STEP_TASKS,
        }
    }

    pub fn all() -> [Capability; 4] {
        [
            Self::Listing,
            Self::TaskUniqueBoard,
            Self::StepUniqueFlow,
            Self::StepTasks,
        ]
    }
}

pub const CAPABILITY_LISTING: &str = "A1";
pub const CAPABILITY_TASK_UNIQUE_BOARD: &str = "R1";
pub const CAPABILITY_STEP_UNIQUE_FLOW: &str = "R2";
pub const CAPABILITY_STEP_TASKS: &str = "ST1";

/// A capability that must be present, or must be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    pub capability: Capability,
    pub present: bool,
}

impl Literal {
    pub const fn present(capability: Capability) -> Self {
        Self {
            capability,
            present: true,
        }
    }

    pub const fn absent(capability: Capability) -> Self {
        Self {
            capability,
            present: false,
        }
    }

    pub fn holds_in(&self, set: &CapabilitySet) -> bool {
        set.contains(self.capability) == self.present
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.present {
            f.write_str(self.capability.as_str())
        } else {
            write!(f, "!{}", self.capability.as_str())
        }
    }
}

/// Parses one literal such as `R2` or `!ST1`.
pub fn parse_literal(value: &str) -> Result<Literal, CapabilityParseError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(CapabilityParseError::EmptyLiteral);
    }
    let (present, code) = match normalized.strip_prefix('!') {
        Some(rest) => (false, rest.trim_start()),
        None => (true, normalized),
    };
    let capability = match code {
        CAPABILITY_LISTING => Capability::Listing,
        CAPABILITY_TASK_UNIQUE_BOARD => Capability::TaskUniqueBoard,
        CAPABILITY_STEP_UNIQUE_FLOW => Capability::StepUniqueFlow,
        CAPABILITY_STEP_TASKS => Capability::StepTasks,
        other => {
            return Err(CapabilityParseError::UnsupportedCapability(
                other.to_string(),
            ))
        }
    };
    Ok(Literal {
        capability,
        present,
    })
}

/// Literal parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityParseError {
    EmptyLiteral,
    UnsupportedCapability(String),
}

impl Display for CapabilityParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLiteral => write!(f, "capability literal must not be empty"),
            Self::UnsupportedCapability(value) => {
                write!(f, "capability is unsupported: {value}")
            }
        }
    }
}

impl Error for CapabilityParseError {}

/// Requirement in disjunctive normal form: clauses are ORed, the literals of
/// each clause are ANDed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    clauses: &'static [&'static [Literal]],
}

impl Requirement {
    pub const fn any_of(clauses: &'static [&'static [Literal]]) -> Self {
        Self { clauses }
    }

    pub fn clauses(&self) -> &'static [&'static [Literal]] {
        self.clauses
    }

    pub fn is_satisfied_by(&self, set: &CapabilitySet) -> bool {
        self.clauses
            .iter()
            .any(|clause| clause.iter().all(|literal| literal.holds_in(set)))
    }
}

impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, clause) in self.clauses.iter().enumerate() {
            if index > 0 {
                f.write_str(" | ")?;
            }
            f.write_str("(")?;
            for (position, literal) in clause.iter().enumerate() {
                if position > 0 {
                    f.write_str(" & ")?;
                }
                write!(f, "{literal}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// `A1`
pub const LISTING: Requirement = Requirement::any_of(&[&[Literal::present(Capability::Listing)]]);
/// `R1`
pub const TASK_UNIQUE_BOARD: Requirement =
    Requirement::any_of(&[&[Literal::present(Capability::TaskUniqueBoard)]]);
/// `R2`
pub const STEP_UNIQUE_FLOW: Requirement =
    Requirement::any_of(&[&[Literal::present(Capability::StepUniqueFlow)]]);
/// `ST1`
pub const STEP_TASKS: Requirement =
    Requirement::any_of(&[&[Literal::present(Capability::StepTasks)]]);
/// `(!R2) | (ST1)`: steps may change flow when flow membership is not unique
/// or when the tasks using a step can be listed.
pub const STEP_REPARENTING: Requirement = Requirement::any_of(&[
    &[Literal::absent(Capability::StepUniqueFlow)],
    &[Literal::present(Capability::StepTasks)],
]);

/// Snapshot of the capabilities a source provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet {
    pub listing: bool,
    pub task_unique_board: bool,
    pub step_unique_flow: bool,
    pub step_tasks: bool,
}

impl CapabilitySet {
    /// Every capability present.
    pub fn full() -> Self {
        Self {
            listing: true,
            task_unique_board: true,
            step_unique_flow: true,
            step_tasks: true,
        }
    }

    /// Reads the optional operations `source` exposes right now.
    pub fn probe(source: &dyn Source) -> Self {
        Self {
            listing: source.lister().is_some(),
            task_unique_board: source.task_boards().is_some(),
            step_unique_flow: source.step_flows().is_some(),
            step_tasks: source.step_tasks().is_some(),
        }
    }

    pub fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::Listing => self.listing,
            Capability::TaskUniqueBoard => self.task_unique_board,
            Capability::StepUniqueFlow => self.step_unique_flow,
            Capability::StepTasks => self.step_tasks,
        }
    }

    pub fn with(mut self, capability: Capability, present: bool) -> Self {
        match capability {
            Capability::Listing => self.listing = present,
            Capability::TaskUniqueBoard => self.task_unique_board = present,
            Capability::StepUniqueFlow => self.step_unique_flow = present,
            Capability::StepTasks => self.step_tasks = present,
        }
        self
    }

    /// True when every capability of `other` is also present here.
    pub fn is_superset_of(&self, other: &CapabilitySet) -> bool {
        Capability::all()
            .into_iter()
            .all(|capability| !other.contains(capability) || self.contains(capability))
    }
}

impl Display for CapabilitySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, capability) in Capability::all().into_iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            let literal = Literal {
                capability,
                present: self.contains(capability),
            };
            write!(f, "{literal}")?;
        }
        Ok(())
    }
}

/// Parses the displayed form, e.g. `A1, !R1, R2, ST1`. Capabilities not
/// mentioned are absent; later literals win.
impl FromStr for CapabilitySet {
    type Err = CapabilityParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }
        value.split(',').try_fold(Self::default(), |set, code| {
            let literal = parse_literal(code)?;
            Ok(set.with(literal.capability, literal.present))
        })
    }
}

/// Capability gate bound to one source.
#[derive(Clone, Copy)]
pub struct CapabilityRegistry<'a> {
    source: &'a dyn Source,
}

impl<'a> CapabilityRegistry<'a> {
    pub fn new(source: &'a dyn Source) -> Self {
        Self { source }
    }

    /// Current feature vector, probed fresh.
    pub fn current(&self) -> CapabilitySet {
        CapabilitySet::probe(self.source)
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.current().contains(capability)
    }

    /// Fails with `NotImplemented` unless `required` holds right now.
    pub fn check(&self, required: &Requirement) -> OperatorResult<()> {
        let current = self.current();
        if required.is_satisfied_by(&current) {
            return Ok(());
        }
        warn!(
            "event=capability_denied module=capability status=error required={} current={}",
            required, current
        );
        Err(OperatorError::NotImplemented {
            required: *required,
            current,
        })
    }

    /// Runs `f` only when `required` holds; its result passes through as is.
    pub fn require<T, F>(&self, required: &Requirement, f: F) -> OperatorResult<T>
    where
        F: FnOnce() -> OperatorResult<T>,
    {
        self.check(required)?;
        f()
    }

    /// Async form of [`CapabilityRegistry::require`]. The future is neither
    /// built nor polled when the requirement fails.
    pub async fn require_async<T, F, Fut>(&self, required: &Requirement, f: F) -> OperatorResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = OperatorResult<T>>,
    {
        self.check(required)?;
        f().await
    }
}

#[cfg(test)]
mod tests {
    use super::{
        parse_literal, Capability, CapabilityParseError, CapabilitySet, Literal, Requirement,
        LISTING, STEP_REPARENTING,
    };

    #[test]
    fn parses_all_literals() {
        for capability in Capability::all() {
            let present = parse_literal(capability.as_str()).expect("present literal");
            assert_eq!(present, Literal::present(capability));
            let absent =
                parse_literal(&format!("!{}", capability.as_str())).expect("absent literal");
            assert_eq!(absent, Literal::absent(capability));
        }
    }

    #[test]
    fn rejects_empty_and_unknown_literals() {
        assert_eq!(
            parse_literal("  ").expect_err("empty literal must fail"),
            CapabilityParseError::EmptyLiteral
        );
        assert_eq!(
            parse_literal("r2").expect_err("lowercase literal must fail"),
            CapabilityParseError::UnsupportedCapability("r2".to_string())
        );
    }

    #[test]
    fn literal_display_matches_parse() {
        let literal = Literal::absent(Capability::StepTasks);
        assert_eq!(literal.to_string(), "!ST1");
        assert_eq!(parse_literal(&literal.to_string()).expect("reparse"), literal);
    }

    #[test]
    fn step_reparenting_matrix() {
        for step_unique_flow in [false, true] {
            for step_tasks in [false, true] {
                let set = CapabilitySet::default()
                    .with(Capability::StepUniqueFlow, step_unique_flow)
                    .with(Capability::StepTasks, step_tasks);
                assert_eq!(
                    STEP_REPARENTING.is_satisfied_by(&set),
                    !step_unique_flow || step_tasks,
                    "R2={step_unique_flow} ST1={step_tasks}"
                );
            }
        }
    }

    #[test]
    fn empty_requirement_is_never_satisfied_and_empty_clause_always_is() {
        let nothing = Requirement::any_of(&[]);
        let anything = Requirement::any_of(&[&[]]);
        assert!(!nothing.is_satisfied_by(&CapabilitySet::full()));
        assert!(anything.is_satisfied_by(&CapabilitySet::default()));
    }

    #[test]
    fn display_lists_every_flag() {
        let set = CapabilitySet::default()
            .with(Capability::Listing, true)
            .with(Capability::StepUniqueFlow, true);
        assert_eq!(set.to_string(), "A1, !R1, R2, !ST1");
        assert_eq!(STEP_REPARENTING.to_string(), "(!R2) | (ST1)");
        assert_eq!(LISTING.to_string(), "(A1)");
    }

    #[test]
    fn positive_requirements_are_monotonic() {
        const REQUIREMENT: Requirement = Requirement::any_of(&[
            &[
                Literal::present(Capability::Listing),
                Literal::present(Capability::StepTasks),
            ],
            &[Literal::present(Capability::TaskUniqueBoard)],
        ]);
        let requirement = REQUIREMENT;
        let all_sets: Vec<CapabilitySet> = (0..16u8)
            .map(|bits| {
                Capability::all()
                    .into_iter()
                    .enumerate()
                    .fold(CapabilitySet::default(), |set, (index, capability)| {
                        set.with(capability, bits & (1 << index) != 0)
                    })
            })
            .collect();
        for smaller in &all_sets {
            if !requirement.is_satisfied_by(smaller) {
                continue;
            }
            for larger in all_sets.iter().filter(|set| set.is_superset_of(smaller)) {
                assert!(requirement.is_satisfied_by(larger), "{smaller} -> {larger}");
            }
        }
    }

    #[test]
    fn capability_set_parses_its_display_form() {
        let set = CapabilitySet::full().with(Capability::TaskUniqueBoard, false);
        let parsed: CapabilitySet = set.to_string().parse().expect("displayed set");
        assert_eq!(parsed, set);

        let sparse: CapabilitySet = "ST1, A1".parse().expect("sparse set");
        assert_eq!(
            sparse,
            CapabilitySet::default()
                .with(Capability::Listing, true)
                .with(Capability::StepTasks, true)
        );
        assert_eq!("".parse::<CapabilitySet>(), Ok(CapabilitySet::default()));
        assert_eq!(
            "A1,,R2".parse::<CapabilitySet>(),
            Err(CapabilityParseError::EmptyLiteral)
        );
    }

    #[test]
    fn negative_literals_break_monotonicity() {
        let empty = CapabilitySet::default();
        let with_unique_flow = empty.with(Capability::StepUniqueFlow, true);
        assert!(with_unique_flow.is_superset_of(&empty));
        assert!(STEP_REPARENTING.is_satisfied_by(&empty));
        assert!(!STEP_REPARENTING.is_satisfied_by(&with_unique_flow));
    }
}
