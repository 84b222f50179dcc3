//! Dockerfile serialization.
//!
//! Projects an instruction sequence onto Dockerfile syntax, one instruction
//! per record, in append order. Multi-line shell commands are joined with
//! backslash continuations and `&&` chaining.

use crate::renderer::instruction::Instruction;
use crate::renderer::package_install_command;
use crate::template::PkgManager;

const INDENT: usize = 4;

/// Render the instruction sequence as Dockerfile text.
pub(crate) fn render(instructions: &[Instruction], pkg_manager: PkgManager) -> String {
    let parts: Vec<String> = instructions
        .iter()
        .map(|instruction| render_instruction(instruction, pkg_manager))
        .collect();
    parts.join("\n")
}

fn render_instruction(instruction: &Instruction, pkg_manager: PkgManager) -> String {
    match instruction {
        Instruction::Add {
            sources,
            destination,
        } => format!("ADD {}", file_list(sources, destination)),
        Instruction::Arg { key, value } => match value {
            Some(value) => format!("ARG {key}={value}"),
            None => format!("ARG {key}"),
        },
        Instruction::Copy {
            sources,
            destination,
            from,
            chown,
        } => {
            let mut s = String::from("COPY ");
            if let Some(from) = from {
                s.push_str(&format!("--from={from} "));
            }
            if let Some(chown) = chown {
                s.push_str(&format!("--chown={chown} "));
            }
            s.push_str(&file_list(sources, destination));
            s
        }
        Instruction::Entrypoint { args } => {
            format!("ENTRYPOINT [\"{}\"]", args.join("\", \""))
        }
        Instruction::Env { pairs } => {
            let assignments: Vec<String> = pairs
                .iter()
                .map(|(key, value)| format!("{key}=\"{value}\""))
                .collect();
            format!("ENV {}", assignments.join(" \\\n    "))
        }
        Instruction::From { base_image, alias } => match alias {
            Some(alias) => format!("FROM {base_image} AS {alias}"),
            None => format!("FROM {base_image}"),
        },
        Instruction::Install { packages, opts } => {
            let command = package_install_command(pkg_manager, packages, opts.as_deref());
            indent_run_instruction(&format!("RUN {command}"))
        }
        Instruction::Label { pairs } => {
            let assignments: Vec<String> = pairs
                .iter()
                .map(|(key, value)| format!("{key}=\"{value}\""))
                .collect();
            format!("LABEL {}", assignments.join(" \\\n      "))
        }
        Instruction::Run { command } => indent_run_instruction(&format!("RUN {command}")),
        Instruction::User { name } => format!("USER {name}"),
        Instruction::Workdir { path } => format!("WORKDIR {path}"),
    }
}

/// Dockerfile JSON-array form for COPY/ADD, one path per continuation line.
fn file_list(sources: &[String], destination: &str) -> String {
    let mut paths: Vec<&str> = sources.iter().map(String::as_str).collect();
    paths.push(destination);
    format!("[\"{}\"]", paths.join("\", \\\n      \""))
}

/// Join a multi-line shell command into one Dockerfile `RUN` instruction.
///
/// Lines that do not start with a shell continuation token are chained with
/// `&&`; every non-final line gets a trailing backslash. Comment lines are
/// left alone.
fn indent_run_instruction(instruction: &str) -> String {
    let lines: Vec<&str> = instruction.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for (i, raw) in lines.iter().enumerate() {
        let mut line = raw.trim_end().to_string();
        let is_last = i == lines.len() - 1;
        let already_continuation = ["&&", "&", "||", "|", "fi"]
            .iter()
            .any(|token| line.starts_with(token));
        let is_comment = line.starts_with('#');
        let previous_continuation =
            i > 0 && (lines[i - 1].trim_end().ends_with('\\') || lines[i - 1].starts_with("if"));

        if i > 0 {
            if !already_continuation && !previous_continuation && !is_comment {
                line = format!("&& {line}");
            }
            let indent = if !already_continuation && previous_continuation {
                INDENT + 3
            } else {
                INDENT
            };
            line = format!("{}{line}", " ".repeat(indent));
        }
        if !is_last && !line.ends_with('\\') && !is_comment {
            line.push_str(" \\");
        }
        out.push(line);
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_run_is_untouched() {
        assert_eq!(indent_run_instruction("RUN echo foobar"), "RUN echo foobar");
    }

    #[test]
    fn multi_line_run_is_chained() {
        let joined = indent_run_instruction("RUN echo hello\necho world");
        assert_eq!(joined, "RUN echo hello \\\n    && echo world");
    }

    #[test]
    fn continuation_lines_are_not_chained() {
        let joined = indent_run_instruction("RUN echo hello\n|| echo fallback");
        assert_eq!(joined, "RUN echo hello \\\n    || echo fallback");
    }

    #[test]
    fn lines_after_backslash_are_indented_deeper() {
        let joined = indent_run_instruction("RUN apt-get install -y \\\n    curl\nrm -rf /tmp/x");
        assert_eq!(
            joined,
            "RUN apt-get install -y \\\n           curl \\\n    && rm -rf /tmp/x"
        );
    }

    #[test]
    fn install_record_renders_apt_command() {
        let rendered = render(
            &[Instruction::Install {
                packages: vec!["curl".into()],
                opts: None,
            }],
            PkgManager::Apt,
        );
        assert_eq!(
            rendered,
            "RUN apt-get update -qq \\\n    && apt-get install -y -q --no-install-recommends \\\n           curl \\\n    && rm -rf /var/lib/apt/lists/*"
        );
    }

    #[test]
    fn install_record_renders_yum_command() {
        let rendered = render(
            &[Instruction::Install {
                packages: vec!["python".into()],
                opts: None,
            }],
            PkgManager::Yum,
        );
        assert_eq!(
            rendered,
            "RUN yum install -y -q \\\n           python \\\n    && yum clean all \\\n    && rm -rf /var/cache/yum/*"
        );
    }

    #[test]
    fn copy_renders_json_array_with_options() {
        let rendered = render(
            &[Instruction::Copy {
                sources: vec!["foo/bar/baz.txt".into(), "foo/baz/cat.txt".into()],
                destination: "/opt/".into(),
                from: Some("builder".into()),
                chown: Some("neuro".into()),
            }],
            PkgManager::Apt,
        );
        assert_eq!(
            rendered,
            "COPY --from=builder --chown=neuro [\"foo/bar/baz.txt\", \\\n      \"foo/baz/cat.txt\", \\\n      \"/opt/\"]"
        );
    }

    #[test]
    fn env_renders_multi_key_instruction() {
        let rendered = render(
            &[Instruction::Env {
                pairs: vec![
                    ("PATH".into(), "$PATH:/opt/foo/bin".into()),
                    ("LANG".into(), "C.UTF-8".into()),
                ],
            }],
            PkgManager::Apt,
        );
        assert_eq!(
            rendered,
            "ENV PATH=\"$PATH:/opt/foo/bin\" \\\n    LANG=\"C.UTF-8\""
        );
    }

    #[test]
    fn entrypoint_renders_exec_form() {
        let rendered = render(
            &[Instruction::Entrypoint {
                args: vec!["echo".into(), "foo bar".into()],
            }],
            PkgManager::Apt,
        );
        assert_eq!(rendered, "ENTRYPOINT [\"echo\", \"foo bar\"]");
    }

    #[test]
    fn from_renders_stage_alias() {
        let rendered = render(
            &[Instruction::From {
                base_image: "alpine".into(),
                alias: Some("builder".into()),
            }],
            PkgManager::Apt,
        );
        assert_eq!(rendered, "FROM alpine AS builder");
    }

    #[test]
    fn instructions_render_in_append_order() {
        let rendered = render(
            &[
                Instruction::From {
                    base_image: "alpine".into(),
                    alias: None,
                },
                Instruction::Arg {
                    key: "FOO".into(),
                    value: None,
                },
                Instruction::Workdir {
                    path: "/opt/work".into(),
                },
                Instruction::User {
                    name: "nonroot".into(),
                },
            ],
            PkgManager::Apt,
        );
        assert_eq!(
            rendered,
            "FROM alpine\nARG FOO\nWORKDIR /opt/work\nUSER nonroot"
        );
    }
}
