//! Replay script parsing.
//!
//! One step per line. Blank lines and `#` comments are skipped. A line is
//! one of:
//!
//! - a bare tool name, resolved through [`ToolResolver`]
//!   (`mcp__starlog__check`, `fly`, `read_file`, ...)
//! - a flight entry name followed by a config name (`start debug_flight_config`)
//! - `exit` to leave the current top frame, or `exit <frame-id>`
//! - a JSON [`Operation`] object (`{"op": "exit_flight", "frame": 2}`)
//!
//! Flight config names are checked against `tools.flight_config_suffix`
//! in both the word and JSON forms.

use anyhow::{Context, Result, bail};
use starnav_engine::{FrameId, Operation, ToolResolver};

/// What a script line asks the engine to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptStep {
    Op(Operation),
    /// Exit whatever frame is on top when the step runs.
    ExitTop,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptLine {
    /// 1-based line number in the source
    pub number: usize,
    pub step: ScriptStep,
}

pub fn parse_script(source: &str, resolver: &ToolResolver) -> Result<Vec<ScriptLine>> {
    let mut lines = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        if let Some(step) = parse_line(raw, resolver).with_context(|| format!("line {number}"))? {
            lines.push(ScriptLine { number, step });
        }
    }
    Ok(lines)
}

/// Parse a single line; `None` for blank lines and comments.
pub fn parse_line(raw: &str, resolver: &ToolResolver) -> Result<Option<ScriptStep>> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    if line.starts_with('{') {
        let op: Operation =
            serde_json::from_str(line).context("invalid JSON operation")?;
        if let Operation::StartFlight { config: Some(name) } = &op {
            resolver.check_flight_config(name)?;
        }
        return Ok(Some(ScriptStep::Op(op)));
    }

    let mut words = line.split_whitespace();
    let (Some(name), arg, None) = (words.next(), words.next(), words.next()) else {
        bail!("expected `<tool> [argument]`, got `{line}`");
    };

    if name == "exit" {
        return match arg {
            None => Ok(Some(ScriptStep::ExitTop)),
            Some(id) => {
                let raw_id: u64 = id
                    .parse()
                    .with_context(|| format!("invalid frame id `{id}`"))?;
                Ok(Some(ScriptStep::Op(Operation::ExitFlight {
                    frame: FrameId::new(raw_id),
                })))
            }
        };
    }

    match (resolver.resolve(name), arg) {
        (Operation::StartFlight { .. }, config) => {
            Ok(Some(ScriptStep::Op(resolver.start_flight(config)?)))
        }
        (op, None) => Ok(Some(ScriptStep::Op(op))),
        (op, Some(extra)) => bail!("`{op}` takes no argument, got `{extra}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(line: &str) -> Option<ScriptStep> {
        parse_line(line, &ToolResolver::default()).expect("parse")
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("# orient first"), None);
    }

    #[test]
    fn resolves_namespaced_tools() {
        assert_eq!(
            parse("mcp__starlog__check"),
            Some(ScriptStep::Op(Operation::Check))
        );
        assert_eq!(
            parse("read_file"),
            Some(ScriptStep::Op(Operation::Other {
                tool: "read_file".to_string()
            }))
        );
    }

    #[test]
    fn start_takes_optional_config() {
        assert_eq!(
            parse("start_flight_config debug_flight_config"),
            Some(ScriptStep::Op(Operation::StartFlight {
                config: Some("debug_flight_config".to_string())
            }))
        );
        assert_eq!(
            parse("start"),
            Some(ScriptStep::Op(Operation::StartFlight { config: None }))
        );
    }

    #[test]
    fn flight_config_names_need_suffix() {
        let resolver = ToolResolver::default();
        let err = parse_line("start debug", &resolver).unwrap_err();
        assert_eq!(
            err.to_string(),
            "flight config `debug` must end with `_flight_config`"
        );
        assert!(parse_line("start _flight_config", &resolver).is_err());
        assert!(
            parse_line(
                r#"{"op": "start_flight", "config": "debug"}"#,
                &resolver
            )
            .is_err()
        );
        assert_eq!(
            parse(r#"{"op": "start_flight", "config": "debug_flight_config"}"#),
            Some(ScriptStep::Op(Operation::StartFlight {
                config: Some("debug_flight_config".to_string())
            }))
        );
    }

    #[test]
    fn empty_suffix_accepts_any_config_name() {
        let resolver = ToolResolver::new(&starnav_engine::config::ToolsConfig {
            flight_config_suffix: String::new(),
            ..Default::default()
        });
        assert_eq!(
            parse_line("start debug", &resolver).expect("parse"),
            Some(ScriptStep::Op(Operation::StartFlight {
                config: Some("debug".to_string())
            }))
        );
    }

    #[test]
    fn exit_forms() {
        assert_eq!(parse("exit"), Some(ScriptStep::ExitTop));
        assert_eq!(
            parse("exit 3"),
            Some(ScriptStep::Op(Operation::ExitFlight {
                frame: FrameId::new(3)
            }))
        );
        assert!(parse_line("exit top", &ToolResolver::default()).is_err());
    }

    #[test]
    fn json_operation() {
        assert_eq!(
            parse(r#"{"op": "exit_flight", "frame": 2}"#),
            Some(ScriptStep::Op(Operation::ExitFlight {
                frame: FrameId::new(2)
            }))
        );
        assert!(parse_line(r#"{"op": "warp"}"#, &ToolResolver::default()).is_err());
    }

    #[test]
    fn rejects_arguments_on_gated_tools() {
        let err = parse_line("fly fast", &ToolResolver::default()).unwrap_err();
        assert!(err.to_string().contains("takes no argument"), "{err}");
        assert!(parse_line("fly fast now", &ToolResolver::default()).is_err());
    }

    #[test]
    fn script_errors_carry_line_numbers() {
        let err = parse_script("check\n\nexit nope\n", &ToolResolver::default()).unwrap_err();
        assert_eq!(err.to_string(), "line 3");

        let lines = parse_script("# header\ncheck\norient\n", &ToolResolver::default())
            .expect("parse");
        let numbers: Vec<usize> = lines.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![2, 3]);
    }
}
