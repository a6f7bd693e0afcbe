// src/workflow/command.rs

//! Command-line evaluation for workflow jobs.
//!
//! Job commands are templates. Before submission they get `{key}` values
//! from `cmdvals`, shell syntax for `<ENV:VAR>` references, concrete paths for
//! `<FILE:key>` tokens, and a trailer that writes the success/failure marker
//! to stderr.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::workflow::model::{JobSpec, RunSection};

/// First token of the last stderr line written by a successful job.
pub const SUCCESS_MARKER: &str = "success";
/// First token of the last stderr line written by a failed job.
pub const FAILURE_MARKER: &str = "failure";

/// `<FILE:key>` that resolves to a job's private staged repository copy.
pub const STAGED_REPO_KEY: &str = "stagedRepo";

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<ENV:([^>]+)>").expect("static regex is valid")
});

static CMDVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid")
});

/// Replace `<ENV:VAR>` with `${VAR}` throughout the string.
pub fn fix_env_var_syntax(command: &str) -> String {
    ENV_VAR.replace_all(command, "$${$1}").into_owned()
}

/// Replace `{key}` with `cmdvals[key]`; unknown keys are left as they are.
pub fn substitute_cmdvals(command: &str, cmdvals: &BTreeMap<String, String>) -> String {
    CMDVAL
        .replace_all(command, |caps: &regex::Captures<'_>| {
            cmdvals
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Replace whitespace-delimited `<FILE:key>` tokens with `file_paths[key]`.
///
/// Tokens with no matching key are kept verbatim. Whitespace is normalised
/// to single spaces.
pub fn insert_file_paths(command: &str, file_paths: &BTreeMap<String, String>) -> String {
    const START: &str = "<FILE:";
    const END: &str = ">";

    command
        .split_whitespace()
        .map(|token| {
            token
                .strip_prefix(START)
                .and_then(|rest| rest.strip_suffix(END))
                .and_then(|key| file_paths.get(key))
                .map(String::as_str)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fully evaluate a job template (cmdvals, env vars, file paths), without the
/// success/failure trailer.
pub fn evaluate(spec: &JobSpec, staged_repo: Option<&str>) -> String {
    let mut file_paths = spec.inputs.clone();
    if let Some(repo) = staged_repo {
        file_paths.insert(STAGED_REPO_KEY.to_string(), repo.to_string());
    }
    let command = substitute_cmdvals(&spec.cmd, &spec.cmdvals);
    let command = fix_env_var_syntax(&command);
    insert_file_paths(&command, &file_paths)
}

/// Full shell command line for a workflow job.
pub fn job_command_line(spec: &JobSpec, run: &RunSection, staged_repo: Option<&str>) -> String {
    let body = evaluate(spec, staged_repo);
    let mut command = format!(
        "{body} && >&2 echo {SUCCESS_MARKER} || (>&2 echo {FAILURE_MARKER}; false)"
    );
    if let Some(prefix) = run.command_prepend.as_deref().filter(|p| !p.trim().is_empty()) {
        command = format!("{prefix} {command}");
    }
    command
}

/// Shell command copying the staging template into a job's private copy.
///
/// Files already present in the destination are not overwritten.
pub fn staging_command(source: &str, dest: &str) -> String {
    format!(
        "mkdir -p '{dest}' && for f in '{source}'/*; do \
         [ -e \"$f\" ] || continue; \
         t='{dest}'/\"$(basename \"$f\")\"; \
         [ -e \"$t\" ] || cp -r \"$f\" \"$t\"; done"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn env_vars_become_shell_references() {
        assert_eq!(
            fix_env_var_syntax("run --home <ENV:HOME> --x <ENV:X_Y>"),
            "run --home ${HOME} --x ${X_Y}"
        );
    }

    #[test]
    fn cmdvals_substitute_known_keys_only() {
        let vals = map(&[("visit", "42")]);
        assert_eq!(
            substitute_cmdvals("isr --visit {visit} --det {detector}", &vals),
            "isr --visit 42 --det {detector}"
        );
    }

    #[test]
    fn file_tokens_are_replaced_by_path() {
        let paths = map(&[("butlerConfig", "/repo/butler.yaml")]);
        assert_eq!(
            insert_file_paths("run  -b <FILE:butlerConfig>   <FILE:missing>", &paths),
            "run -b /repo/butler.yaml <FILE:missing>"
        );
    }

    #[test]
    fn command_line_carries_markers_and_prefix() {
        let spec = JobSpec {
            cmd: "run -b <FILE:stagedRepo> --v {v}".into(),
            cmdvals: map(&[("v", "1")]),
            ..Default::default()
        };
        let run = RunSection {
            name: "r".into(),
            submit_dir: PathBuf::from("s"),
            repository: PathBuf::from("repo"),
            output_collection: "out".into(),
            init_job: None,
            command_prepend: Some("time".into()),
            monitoring_db: PathBuf::from("m.jsonl"),
            staging_dir: None,
            finalize_command: None,
            task_order: Vec::new(),
        };
        assert_eq!(
            job_command_line(&spec, &run, Some("/tmp_repos/a")),
            "time run -b /tmp_repos/a --v 1 && >&2 echo success || (>&2 echo failure; false)"
        );
    }
}
