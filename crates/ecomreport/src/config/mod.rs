use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};

pub const DATABASE_ENV_VAR: &str = "ECOMREPORT_DATABASE";
pub const DEFAULT_DATABASE_FILE: &str = "ecommerce.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub home_dir: PathBuf,
    pub cwd: PathBuf,
    pub out_dir: PathBuf,
    pub database: PathBuf,
}

impl RuntimePaths {
    #[must_use]
    pub fn report_json(&self) -> PathBuf {
        self.out_dir.join("report.json")
    }

    #[must_use]
    pub fn charts_dir(&self) -> PathBuf {
        self.out_dir.join("charts")
    }
}

/// Resolves the output directory and database file for one invocation.
///
/// `home_dir` and `cwd` must be absolute. Overrides accept `~`/`~/...`
/// (expanded against `home_dir`) and relative paths (joined onto `cwd`).
pub fn resolve_runtime_paths(
    home_dir: &Path,
    cwd: &Path,
    out_dir_override: Option<&Path>,
    database_override: Option<&Path>,
) -> Result<RuntimePaths> {
    if !home_dir.is_absolute() {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    let home_dir = normalize_lexical(home_dir);
    let cwd = normalize_lexical(cwd);
    let out_dir = match out_dir_override {
        Some(path) => resolve_user_path(path, &home_dir, &cwd)?,
        None => home_dir.join(".ecomreport").join("output"),
    };
    let database = match database_override {
        Some(path) => resolve_user_path(path, &home_dir, &cwd)?,
        None => cwd.join(DEFAULT_DATABASE_FILE),
    };

    Ok(RuntimePaths {
        home_dir,
        cwd,
        out_dir: normalize_lexical(&out_dir),
        database: normalize_lexical(&database),
    })
}

fn resolve_user_path(path: &Path, home_dir: &Path, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::resolve_runtime_paths;
    use std::path::Path;

    #[test]
    fn defaults_out_dir_under_home_and_database_under_cwd() {
        let paths = resolve_runtime_paths(
            Path::new("/home/analyst"),
            Path::new("/work/reports"),
            None,
            None,
        )
        .expect("paths should resolve");

        assert_eq!(paths.out_dir, Path::new("/home/analyst/.ecomreport/output"));
        assert_eq!(paths.database, Path::new("/work/reports/ecommerce.sqlite"));
        assert_eq!(
            paths.report_json(),
            Path::new("/home/analyst/.ecomreport/output/report.json")
        );
        assert_eq!(
            paths.charts_dir(),
            Path::new("/home/analyst/.ecomreport/output/charts")
        );
    }

    #[test]
    fn expands_tilde_database_override() {
        let paths = resolve_runtime_paths(
            Path::new("/home/analyst"),
            Path::new("/work/reports"),
            None,
            Some(Path::new("~/data/olist.sqlite")),
        )
        .expect("tilde override should resolve");

        assert_eq!(paths.database, Path::new("/home/analyst/data/olist.sqlite"));
    }

    #[test]
    fn resolves_relative_out_dir_against_cwd() {
        let paths = resolve_runtime_paths(
            Path::new("/home/analyst"),
            Path::new("/work/reports"),
            Some(Path::new("./runs/../runs/latest")),
            None,
        )
        .expect("relative override should resolve");

        assert_eq!(paths.out_dir, Path::new("/work/reports/runs/latest"));
    }

    #[test]
    fn rejects_relative_cwd() {
        let err = resolve_runtime_paths(Path::new("/home/analyst"), Path::new("work"), None, None)
            .expect_err("relative cwd must fail");

        assert!(
            err.to_string().contains("cwd must be absolute"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn rejects_tilde_username_syntax() {
        let err = resolve_runtime_paths(
            Path::new("/home/analyst"),
            Path::new("/work/reports"),
            None,
            Some(Path::new("~someone/db.sqlite")),
        )
        .expect_err("~username syntax must fail");

        assert!(
            err.to_string()
                .contains("unsupported home expansion syntax"),
            "unexpected error: {err}"
        );
    }
}
