//! Command-line or environment options for Krylov solvers.
//!
//! Options live in an explicit [`OptionsDatabase`] handed to each solver, never in process-wide
//! state. Every key is looked up behind the solver's option prefix, so `-invert_ksp_rtol 1e-8`
//! only reaches the solver whose prefix is `invert_`.
//!
//! Recognised keys (after the prefix):
//!
//! | key | value | default |
//! |---|---|---|
//! | `ksp_type` | `gmres`, `cg`, `bcgs` (or `bicgstab`) | `gmres` |
//! | `ksp_rtol` | relative tolerance | `1e-5` |
//! | `ksp_atol` | absolute tolerance | `1e-50` |
//! | `ksp_divtol` | divergence tolerance | `1e5` |
//! | `ksp_max_it` | iteration limit | `10000` |
//! | `ksp_gmres_restart` | Krylov basis size before restart | `30` |
//! | `ksp_initial_guess_nonzero` | flag: keep the solution vector as initial guess | off |
//! | `ksp_monitor` | flag: log the residual every iteration | off |

use crate::context::ksp_context::SolverKind;
use crate::error::KError;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Environment variable read by [`OptionsDatabase::from_env`].
pub const OPTIONS_ENV_VAR: &str = "INVERTOP_OPTIONS";

/// Option store: keys without their leading dash, values absent for bare flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsDatabase {
    entries: BTreeMap<String, Option<String>>,
}

impl OptionsDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `-key value` pairs and bare `-flag` tokens. Tokens not starting with a dash and not
    /// following a key are ignored, as are negative numbers in key position.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut db = Self::new();
        let mut pending: Option<String> = None;
        for arg in args {
            let arg = arg.as_ref();
            match option_key(arg) {
                Some(key) => {
                    if let Some(flag) = pending.take() {
                        db.entries.insert(flag, None);
                    }
                    pending = Some(key.to_string());
                }
                None => {
                    if let Some(key) = pending.take() {
                        db.entries.insert(key, Some(arg.to_string()));
                    }
                }
            }
        }
        if let Some(flag) = pending {
            db.entries.insert(flag, None);
        }
        db
    }

    /// Parse the whitespace-separated contents of `INVERTOP_OPTIONS`; empty if unset.
    pub fn from_env() -> Self {
        match std::env::var(OPTIONS_ENV_VAR) {
            Ok(raw) => Self::from_args(raw.split_whitespace()),
            Err(_) => Self::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: Option<&str>) {
        let key = key.trim_start_matches('-');
        self.entries.insert(key.to_string(), value.map(str::to_string));
    }

    /// Value of `key`; `Some(None)` for a flag given without a value.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries.get(key).map(|v| v.as_deref())
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: &OptionsDatabase) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn parsed<V: FromStr>(&self, key: &str) -> Result<Option<V>, KError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(None) => Err(KError::BadOption { key: key.to_string(), value: String::new() }),
            Some(Some(raw)) => raw
                .parse::<V>()
                .map(Some)
                .map_err(|_| KError::BadOption { key: key.to_string(), value: raw.clone() }),
        }
    }

    fn flag(&self, key: &str) -> Result<Option<bool>, KError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(None) => Ok(Some(true)),
            Some(Some(raw)) => match raw.as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(KError::BadOption { key: key.to_string(), value: raw.clone() }),
            },
        }
    }
}

fn option_key(arg: &str) -> Option<&str> {
    let key = arg.strip_prefix('-')?;
    let key = key.strip_prefix('-').unwrap_or(key);
    match key.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => Some(key),
        _ => None,
    }
}

/// Typed solver settings. Defaults follow PETSc's KSP defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct KspOptions {
    /// Krylov method
    pub kind: SolverKind,
    /// Relative residual reduction
    pub rtol: f64,
    /// Absolute residual
    pub atol: f64,
    /// Residual growth treated as divergence
    pub divtol: f64,
    /// Iteration limit
    pub max_it: usize,
    /// GMRES restart length
    pub restart: usize,
    /// Use the incoming solution vector as initial guess instead of zero
    pub initial_guess_nonzero: bool,
    /// Log residual norms each iteration
    pub monitor: bool,
}

impl Default for KspOptions {
    fn default() -> Self {
        Self {
            kind: SolverKind::Gmres,
            rtol: 1e-5,
            atol: 1e-50,
            divtol: 1e5,
            max_it: 10_000,
            restart: 30,
            initial_guess_nonzero: false,
            monitor: false,
        }
    }
}

impl KspOptions {
    /// Overwrite every setting present in `db` under `prefix`.
    pub fn apply_database(&mut self, db: &OptionsDatabase, prefix: &str) -> Result<(), KError> {
        let key = |name: &str| format!("{prefix}{name}");
        if let Some(kind) = db.parsed::<SolverKind>(&key("ksp_type"))? {
            self.kind = kind;
        }
        if let Some(rtol) = db.parsed(&key("ksp_rtol"))? {
            self.rtol = rtol;
        }
        if let Some(atol) = db.parsed(&key("ksp_atol"))? {
            self.atol = atol;
        }
        if let Some(divtol) = db.parsed(&key("ksp_divtol"))? {
            self.divtol = divtol;
        }
        if let Some(max_it) = db.parsed(&key("ksp_max_it"))? {
            self.max_it = max_it;
        }
        if let Some(restart) = db.parsed(&key("ksp_gmres_restart"))? {
            self.restart = restart;
        }
        if let Some(nonzero) = db.flag(&key("ksp_initial_guess_nonzero"))? {
            self.initial_guess_nonzero = nonzero;
        }
        if let Some(monitor) = db.flag(&key("ksp_monitor"))? {
            self.monitor = monitor;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), KError> {
        if !(self.rtol >= 0.0 && self.atol >= 0.0 && self.divtol > 0.0) {
            return Err(KError::InvalidArgument(format!(
                "tolerances must be non-negative (rtol {}, atol {}, divtol {})",
                self.rtol, self.atol, self.divtol
            )));
        }
        if self.restart == 0 {
            return Err(KError::InvalidArgument("GMRES restart must be at least 1".into()));
        }
        Ok(())
    }
}
