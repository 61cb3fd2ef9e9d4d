//! Contract between the termination analysis and a ranking/witness synthesis backend.
//!
//! A backend hands out one synthesizer per attempt. The synthesizer is boxed and owned by
//! the attempt that requested it; dropping the box releases whatever the backend holds
//! for it (solver sessions, scratch files).

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use lrformal::prelude::{Formula, LinearExpr, LinearInequality, Variable};
use num_bigint::BigInt;
use num_traits::One;
use strum::EnumIs;

use crate::{
    config::{AnalysisType, SolverProfile, TerminationConfig},
    lasso::Lasso,
    provers::Solver,
    utils::error::{LrError, LrResult},
};

/// Shape of a candidate ranking function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RankingTemplate {
    /// A single affine function.
    Affine,
    /// `k >= 2` affine functions, each bounding the decrease of the next.
    Nested(usize),
}

impl RankingTemplate {
    /// 0 for the affine template, `k` for a nested one.
    pub fn degree(&self) -> usize {
        match self {
            RankingTemplate::Affine => 0,
            RankingTemplate::Nested(k) => *k,
        }
    }

    /// Number of affine functions of an instance.
    pub fn size(&self) -> usize {
        match self {
            RankingTemplate::Affine => 1,
            RankingTemplate::Nested(k) => *k,
        }
    }

    pub fn is_nonlinear(&self) -> bool {
        self.degree() > 0
    }

    /// The affine template followed by nested templates of degree `2..=max_functions`.
    pub fn templates_up_to(max_functions: usize) -> Vec<Self> {
        std::iter::once(RankingTemplate::Affine)
            .chain((2..=max_functions).map(RankingTemplate::Nested))
            .collect()
    }
}

impl fmt::Display for RankingTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingTemplate::Affine => f.write_str("affine"),
            RankingTemplate::Nested(k) => write!(f, "{k}-nested"),
        }
    }
}

/// Affine function over program variable names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AffineFunction {
    expr: LinearExpr,
}

impl AffineFunction {
    /// `expr` must only mention uninstantiated variables.
    pub fn new(expr: LinearExpr) -> LrResult<Self> {
        if let Some(variable) = expr.variables().find(|v| v.index().is_some()) {
            return Err(LrError::InvalidArgument(format!(
                "affine function mentions the instance `{variable}`"
            )));
        }
        Ok(Self { expr })
    }

    pub fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.expr.variables().map(Variable::name)
    }

    /// The function over the instances of `state`; `None` when a name has no instance.
    pub fn instantiate(&self, state: &BTreeMap<String, Variable>) -> Option<LinearExpr> {
        let mapping = self
            .expr
            .variables()
            .map(|variable| Some((variable.clone(), state.get(variable.name())?.clone())))
            .collect::<Option<BTreeMap<_, _>>>()?;
        Some(self.expr.rename(&mapping))
    }
}

impl fmt::Display for AffineFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.fmt(f)
    }
}

/// Instance of a [`RankingTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingFunction {
    template: RankingTemplate,
    functions: Vec<AffineFunction>,
}

impl RankingFunction {
    pub fn new(template: RankingTemplate, functions: Vec<AffineFunction>) -> LrResult<Self> {
        if functions.len() != template.size() {
            return Err(LrError::InvalidArgument(format!(
                "{template} template needs {} functions, got {}",
                template.size(),
                functions.len()
            )));
        }
        Ok(Self {
            template,
            functions,
        })
    }

    pub fn template(&self) -> RankingTemplate {
        self.template
    }

    pub fn functions(&self) -> &[AffineFunction] {
        &self.functions
    }

    pub fn variable_names(&self) -> BTreeSet<&str> {
        self.functions
            .iter()
            .flat_map(AffineFunction::variable_names)
            .collect()
    }

    /// Condition under which a step from `pre` to `post` decreases the function:
    ///
    /// ```text
    /// f0(pre) - f0(post) >= 1
    /// fi(pre) - fi(post) + f(i-1)(pre) >= 1     for 0 < i < k
    /// f(k-1)(pre) >= 1
    /// ```
    ///
    /// `None` when one of the states lacks an instance for a mentioned name.
    pub fn decrease_condition(
        &self,
        pre: &BTreeMap<String, Variable>,
        post: &BTreeMap<String, Variable>,
    ) -> Option<Formula> {
        let before = self
            .functions
            .iter()
            .map(|function| function.instantiate(pre))
            .collect::<Option<Vec<_>>>()?;
        let after = self
            .functions
            .iter()
            .map(|function| function.instantiate(post))
            .collect::<Option<Vec<_>>>()?;

        let mut conjuncts = Vec::with_capacity(before.len() + 1);
        for (i, (pre_value, post_value)) in before.iter().zip(&after).enumerate() {
            let mut decrease = pre_value - post_value;
            if i > 0 {
                decrease = &decrease + &before[i - 1];
            }
            conjuncts.push(at_least_one(decrease));
        }
        conjuncts.push(at_least_one(before.last()?.clone()));
        Some(Formula::and(conjuncts))
    }
}

fn at_least_one(expr: LinearExpr) -> Formula {
    LinearInequality::non_strict(&expr - &LinearExpr::constant(BigInt::one())).to_formula()
}

impl fmt::Display for RankingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.template)?;
        for (i, function) in self.functions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{function}")?;
        }
        f.write_str(")")
    }
}

/// `function >= 0`, or `function > 0` when strict, over program variable names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SupportingInvariant {
    pub function: AffineFunction,
    pub strict: bool,
}

impl SupportingInvariant {
    pub fn instantiate(&self, state: &BTreeMap<String, Variable>) -> Option<Formula> {
        let expr = self.function.instantiate(state)?;
        Some(LinearInequality::new(expr, self.strict).to_formula())
    }
}

impl fmt::Display for SupportingInvariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = if self.strict { ">" } else { ">=" };
        write!(f, "{} {op} 0", self.function)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationArgument {
    pub ranking_function: RankingFunction,
    pub supporting_invariants: Vec<SupportingInvariant>,
}

impl fmt::Display for TerminationArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ranking_function)?;
        for invariant in &self.supporting_invariants {
            write!(f, " given {invariant}")?;
        }
        Ok(())
    }
}

/// Program state over variable names.
pub type State = BTreeMap<String, BigInt>;

/// Witness of an infinite execution of the loop.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum NonTerminationArgument {
    /// States `initial`, `honda + sum(lambda_i^t * ray_i)` for `t >= 0`.
    Geometric {
        initial: State,
        honda: State,
        rays: Vec<State>,
        lambdas: Vec<BigInt>,
    },
    /// Reachable `initial` state inside a set the loop can never leave.
    RecurrentSet { initial: State, set: Formula },
}

impl NonTerminationArgument {
    pub fn initial_state(&self) -> &State {
        match self {
            NonTerminationArgument::Geometric { initial, .. }
            | NonTerminationArgument::RecurrentSet { initial, .. } => initial,
        }
    }
}

fn write_state(f: &mut fmt::Formatter<'_>, state: &State) -> fmt::Result {
    f.write_str("{")?;
    for (i, (name, value)) in state.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{name} = {value}")?;
    }
    f.write_str("}")
}

impl fmt::Display for NonTerminationArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonTerminationArgument::Geometric {
                initial,
                honda,
                rays,
                lambdas,
            } => {
                f.write_str("geometric from ")?;
                write_state(f, initial)?;
                f.write_str(" via ")?;
                write_state(f, honda)?;
                for (ray, lambda) in rays.iter().zip(lambdas) {
                    write!(f, " + {lambda}^t * ")?;
                    write_state(f, ray)?;
                }
                Ok(())
            }
            NonTerminationArgument::RecurrentSet { initial, set } => {
                f.write_str("recurrent set ")?;
                write!(f, "{set}")?;
                f.write_str(" entered at ")?;
                write_state(f, initial)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum SynthesisResult {
    Sat,
    Unsat,
    Unknown,
}

/// Solver preferences of one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub analysis_type: AnalysisType,
    pub external_solver: bool,
    pub external_solver_command: String,
}

impl Preferences {
    pub fn from_profile(profile: &SolverProfile, config: &TerminationConfig) -> Self {
        Self {
            analysis_type: profile.analysis_type,
            external_solver: profile.external_solver,
            external_solver_command: config.external_solver_command.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationSettings {
    pub template: RankingTemplate,
    pub non_strict_invariants: usize,
    pub strict_invariants: usize,
}

impl TerminationSettings {
    pub fn new(template: RankingTemplate, config: &TerminationConfig) -> Self {
        Self {
            template,
            non_strict_invariants: config.non_strict_invariants,
            strict_invariants: config.strict_invariants,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonTerminationSettings {
    pub eigenvectors: usize,
}

impl NonTerminationSettings {
    pub fn new(config: &TerminationConfig) -> Self {
        Self {
            eigenvectors: config.eigenvectors,
        }
    }
}

pub trait TerminationSynthesizer {
    fn synthesize(&mut self) -> LrResult<SynthesisResult>;

    fn synthesis_successful(&self) -> bool;

    /// Argument found by the last successful [`Self::synthesize`].
    fn argument(&self) -> Option<&TerminationArgument>;
}

pub trait NonTerminationSynthesizer {
    fn synthesize(&mut self) -> LrResult<SynthesisResult>;

    fn synthesis_successful(&self) -> bool;

    fn argument(&self) -> Option<&NonTerminationArgument>;
}

/// Factory of scoped synthesizers.
pub trait SynthesisBackend {
    fn termination_synthesizer<'a>(
        &'a self,
        lasso: &'a Lasso,
        solver: &'a dyn Solver,
        preferences: &Preferences,
        settings: &TerminationSettings,
    ) -> LrResult<Box<dyn TerminationSynthesizer + 'a>>;

    fn non_termination_synthesizer<'a>(
        &'a self,
        lasso: &'a Lasso,
        solver: &'a dyn Solver,
        preferences: &Preferences,
        settings: &NonTerminationSettings,
    ) -> LrResult<Box<dyn NonTerminationSynthesizer + 'a>>;

    /// Release everything the backend keeps between calls.
    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrformal::prelude::*;

    fn function(name: &str, constant: i64) -> AffineFunction {
        let expr = &LinearExpr::variable(Variable::new(name)) + &LinearExpr::constant(constant);
        AffineFunction::new(expr).unwrap()
    }

    fn states() -> (BTreeMap<String, Variable>, BTreeMap<String, Variable>) {
        (
            BTreeMap::from([
                ("x".to_string(), Variable::indexed("x", 1)),
                ("y".to_string(), Variable::indexed("y", 1)),
            ]),
            BTreeMap::from([
                ("x".to_string(), Variable::indexed("x", 2)),
                ("y".to_string(), Variable::indexed("y", 2)),
            ]),
        )
    }

    #[test]
    fn templates_grow_from_affine() {
        assert_eq!(RankingTemplate::templates_up_to(1), vec![RankingTemplate::Affine]);
        assert_eq!(
            RankingTemplate::templates_up_to(3),
            vec![
                RankingTemplate::Affine,
                RankingTemplate::Nested(2),
                RankingTemplate::Nested(3)
            ]
        );
        assert!(!RankingTemplate::Affine.is_nonlinear());
        assert_eq!(RankingTemplate::Nested(3).size(), 3);
    }

    #[test]
    fn affine_decrease_condition() {
        let (pre, post) = states();
        let ranking = RankingFunction::new(RankingTemplate::Affine, vec![function("x", 0)]).unwrap();
        let condition = ranking.decrease_condition(&pre, &post).unwrap();
        assert_eq!(condition.to_string(), "x@1 >= x@2 + 1 /\\ x@1 >= 1");
    }

    #[test]
    fn nested_decrease_condition_holds_on_a_lexicographic_step() {
        let (pre, post) = states();
        // y must drop; x may grow by less than y
        let ranking = RankingFunction::new(
            RankingTemplate::Nested(2),
            vec![function("y", 0), function("x", 0)],
        )
        .unwrap();
        let condition = ranking.decrease_condition(&pre, &post).unwrap();

        let model = |x1: i64, y1: i64, x2: i64, y2: i64| {
            Model::from([
                (Variable::indexed("x", 1), BigInt::from(x1)),
                (Variable::indexed("y", 1), BigInt::from(y1)),
                (Variable::indexed("x", 2), BigInt::from(x2)),
                (Variable::indexed("y", 2), BigInt::from(y2)),
            ])
        };
        assert_eq!(condition.eval(&model(5, 3, 7, 2)), Some(true));
        assert_eq!(condition.eval(&model(5, 3, 7, 3)), Some(false));
        assert_eq!(condition.eval(&model(0, 3, -1, 2)), Some(false));
    }

    #[test]
    fn missing_instances_and_bad_shapes() {
        let (pre, _) = states();
        let ranking = RankingFunction::new(RankingTemplate::Affine, vec![function("z", 0)]).unwrap();
        assert!(ranking.decrease_condition(&pre, &pre).is_none());

        assert!(RankingFunction::new(RankingTemplate::Nested(2), vec![function("x", 0)]).is_err());
        assert!(AffineFunction::new(LinearExpr::variable(Variable::indexed("x", 1))).is_err());
    }
}
