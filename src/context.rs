use anyhow::{anyhow, bail, Context as _, Result};
use regex::Regex;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::config::DEFAULT_MANIFEST;

pub const MANIFEST_ENV: &str = "SVCPLAN_MANIFEST";
pub const SELECT_ENV: &str = "SVCPLAN_SELECT";

/// Process environment plus the input paths located for this invocation.
#[derive(Debug, Clone)]
pub struct ContextEnv {
    vars: BTreeMap<String, String>,
    cwd: PathBuf,
    token: Regex,

    manifest_path: Option<PathBuf>,
    manifest_dir: Option<PathBuf>,
}

impl ContextEnv {
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("could not determine working directory")?;
        Ok(Self::with_vars(std::env::vars().collect(), cwd))
    }

    pub fn with_vars(vars: BTreeMap<String, String>, cwd: PathBuf) -> Self {
        Self {
            vars,
            cwd,
            token: Regex::new(r"\{([^{}]*)\}").expect("token pattern is valid"),
            manifest_path: None,
            manifest_dir: None,
        }
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest_path.as_deref()
    }

    /// Directory relative paths are resolved against; the working directory
    /// until a manifest has been located.
    pub fn base_dir(&self) -> &Path {
        self.manifest_dir.as_deref().unwrap_or(&self.cwd)
    }

    /// Manifest path precedence:
    /// 1) CLI --manifest (must exist)
    /// 2) SVCPLAN_MANIFEST (must exist)
    /// 3) ./apps.toml (must exist)
    pub fn locate_manifest(&mut self, cli: Option<&PathBuf>) -> Result<PathBuf> {
        if let Some(p) = cli {
            let p = self.absolute(p);
            if !p.exists() {
                bail!("--manifest was provided but file does not exist: {}", p.display());
            }
            self.set_manifest_path(p.clone());
            return Ok(p);
        }

        if let Some(p) = self.get_env_path(MANIFEST_ENV) {
            if !p.exists() {
                bail!("{MANIFEST_ENV} is set but file does not exist: {}", p.display());
            }
            self.set_manifest_path(p.clone());
            return Ok(p);
        }

        let p = self.cwd.join(DEFAULT_MANIFEST);
        if !p.exists() {
            bail!(
                "no manifest found at {} (pass --manifest or set {MANIFEST_ENV})",
                p.display()
            );
        }
        self.set_manifest_path(p.clone());
        Ok(p)
    }

    /// Selection path precedence: CLI, then SVCPLAN_SELECT. None if neither.
    pub fn locate_selection(&self, cli: Option<&PathBuf>) -> Result<Option<PathBuf>> {
        let p = match cli {
            Some(p) => self.absolute(p),
            None => match self.get_env_path(SELECT_ENV) {
                Some(p) => p,
                None => return Ok(None),
            },
        };
        if !p.exists() {
            bail!("selection file does not exist: {}", p.display());
        }
        Ok(Some(p))
    }

    /// Expands `{manifest_dir}`, `{cwd}` and `{env.NAME}` tokens.
    pub fn expand(&self, input: &str) -> Result<String> {
        // Fast path
        if !input.contains('{') && !input.contains('}') {
            return Ok(input.to_string());
        }

        let mut out = String::with_capacity(input.len());
        let mut last = 0;

        for caps in self.token.captures_iter(input) {
            let whole = caps.get(0).ok_or_else(|| anyhow!("empty token match"))?;
            let token = &caps[1];
            let repl = self
                .token_value(token)
                .ok_or_else(|| anyhow!("unknown token: {{{token}}} in: {input}"))?;

            out.push_str(literal(input, &input[last..whole.start()])?);
            out.push_str(&repl);
            last = whole.end();
        }
        out.push_str(literal(input, &input[last..])?);

        Ok(out)
    }

    /// Expands tokens and anchors relative results at [`Self::base_dir`].
    pub fn resolve_path(&self, raw: &str) -> Result<PathBuf> {
        let expanded = self.expand(raw)?;
        let p = PathBuf::from(expanded);
        if p.is_absolute() {
            Ok(p)
        } else {
            Ok(self.base_dir().join(p))
        }
    }

    fn token_value(&self, token: &str) -> Option<String> {
        if let Some(name) = token.strip_prefix("env.") {
            return self.vars.get(name).cloned();
        }

        match token {
            "manifest_dir" => Some(self.base_dir().to_string_lossy().to_string()),
            "cwd" => Some(self.cwd.to_string_lossy().to_string()),
            _ => None,
        }
    }

    fn set_manifest_path(&mut self, path: PathBuf) {
        self.manifest_dir = path.parent().map(Path::to_path_buf);
        self.manifest_path = Some(path);
    }

    fn get_env_path(&self, key: &str) -> Option<PathBuf> {
        self.vars
            .get(key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| self.absolute(Path::new(s)))
    }

    fn absolute(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.cwd.join(p)
        }
    }
}

// text between tokens must not hold a stray brace
fn literal<'s>(input: &str, segment: &'s str) -> Result<&'s str> {
    if segment.contains('{') || segment.contains('}') {
        bail!("unbalanced braces in: {input}");
    }
    Ok(segment)
}
