//! Configuration of the termination analysis.
//!
//! The configuration is a TOML document; every key is optional and falls back to its
//! default.
//!
//! ```toml
//! nonStrictInvariants = 3
//! strictInvariants = 2
//! eigenvectors = 3
//! maxTemplateFunctions = 3
//! externalSolverCommand = "z3 -smt2 -in"
//! maxDnfClauses = 1000000
//! # dumpSynthesisQueries = "/tmp/lassos"
//!
//! [linear]
//! analysisType = "linear-with-guesses"
//! externalSolver = false
//!
//! [nonlinear]
//! analysisType = "linear-with-guesses"
//! externalSolver = false
//! ```

use std::path::{Path, PathBuf};

use lrformal::normalize::DEFAULT_MAX_DNF_CLAUSES;
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumIter};

use crate::{
    magic::{DEFAULT_EXTERNAL_SOLVER_COMMAND, ENV_CONFIG_PATH},
    utils::error::{LrError, LrResult},
};

/// Template search strategy of a synthesis call.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIs, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisType {
    /// Skip synthesis entirely.
    Disabled,
    Linear,
    #[default]
    LinearWithGuesses,
    Nonlinear,
}

impl AnalysisType {
    /// Whether the synthesizer may seed its search with guessed coefficients.
    pub fn wants_guesses(self) -> bool {
        matches!(self, AnalysisType::LinearWithGuesses | AnalysisType::Nonlinear)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverProfile {
    pub analysis_type: AnalysisType,
    /// Use an external solver process instead of the embedded one.
    pub external_solver: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TerminationConfig {
    /// Non-strict supporting invariants per synthesis step.
    pub non_strict_invariants: usize,
    /// Strict supporting invariants per synthesis step.
    pub strict_invariants: usize,
    /// Generalized eigenvectors of geometric non-termination arguments.
    pub eigenvectors: usize,
    /// Settings for affine templates.
    pub linear: SolverProfile,
    /// Settings for nested templates and non-termination synthesis.
    pub nonlinear: SolverProfile,
    pub external_solver_command: String,
    /// Largest nested template degree; the affine template is always tried first.
    pub max_template_functions: usize,
    /// Directory receiving a textual copy of every lasso before synthesis.
    pub dump_synthesis_queries: Option<PathBuf>,
    /// Clause bound of the DNF conversion.
    pub max_dnf_clauses: usize,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            non_strict_invariants: 3,
            strict_invariants: 2,
            eigenvectors: 3,
            linear: SolverProfile::default(),
            nonlinear: SolverProfile::default(),
            external_solver_command: DEFAULT_EXTERNAL_SOLVER_COMMAND.to_string(),
            max_template_functions: 3,
            dump_synthesis_queries: None,
            max_dnf_clauses: DEFAULT_MAX_DNF_CLAUSES,
        }
    }
}

impl TerminationConfig {
    /// Get the default path to the configuration file.
    pub fn default_path() -> PathBuf {
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            return config_path.into();
        }

        let mut path = PathBuf::new();

        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                path.push(appdata);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
                path.push(xdg_config_home);
            } else if let Ok(home) = std::env::var("HOME") {
                path.push(home);
                path.push(".config");
            }
        }

        path.push("lariat");
        path.push("termination.toml");
        path
    }

    pub fn from_toml_str(source: &str) -> LrResult<Self> {
        toml::from_str(source).map_err(|e| LrError::ConfigParseError {
            source: e,
            file: "<string>".to_string(),
        })
    }

    /// Load the configuration from a TOML file.
    pub fn load_from_toml(path: &Path) -> LrResult<Self> {
        let toml_str = std::fs::read_to_string(path)?;

        toml::from_str(&toml_str).map_err(|e| LrError::ConfigParseError {
            source: e,
            file: path.display().to_string(),
        })
    }

    /// Load the configuration from [`Self::default_path`], or the defaults when no file
    /// exists there.
    pub fn load_default() -> LrResult<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::load_from_toml(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_toml(&self, path: &Path) -> LrResult<()> {
        let toml_str = toml::to_string(self).map_err(|e| {
            LrError::InvalidArgument(format!(
                "Failed during serialization of TOML to path `{}`: {}",
                path.display(),
                e
            ))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn validate(&self) -> LrResult<()> {
        if self.max_template_functions == 0 {
            return Err(LrError::InvalidArgument(
                "maxTemplateFunctions must be at least 1".to_string(),
            ));
        }
        if self.max_dnf_clauses == 0 {
            return Err(LrError::InvalidArgument(
                "maxDnfClauses must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
