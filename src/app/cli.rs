#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Setup,
    Ingest,
    Run,
    Approve,
    Reject,
    Status,
    Audit,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "setup" => CliVerb::Setup,
        "ingest" => CliVerb::Ingest,
        "run" => CliVerb::Run,
        "approve" => CliVerb::Approve,
        "reject" => CliVerb::Reject,
        "status" => CliVerb::Status,
        "audit" => CliVerb::Audit,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  setup                                Create the partition directories and default config".to_string(),
        "  ingest --kind <kind> [options] <text>  Create a task document in Needs_Action".to_string(),
        "      options: --keyword <sales|client|project>  --priority <high|medium|low>".to_string(),
        "               --source <name>  --id <task-id>".to_string(),
        "  run [description] [--max-iterations N]  Drive pending tasks until quiescent or capped".to_string(),
        "  approve <task-id>                    Move a pending draft to Approved".to_string(),
        "  reject <task-id>                     Move a pending draft to Rejected".to_string(),
        "  status                               Show task counts per partition".to_string(),
        "  audit summary [--days N]             Summarize recent audit entries (default 7 days)".to_string(),
        "  audit purge                          Delete audit day files past the retention horizon".to_string(),
        String::new(),
        "The store root defaults to the current directory; set DESKHAND_STORE to override."
            .to_string(),
    ]
}

pub fn help_text() -> String {
    cli_help_lines().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_verbs_parse() {
        assert_eq!(parse_cli_verb("setup"), CliVerb::Setup);
        assert_eq!(parse_cli_verb("run"), CliVerb::Run);
        assert_eq!(parse_cli_verb("audit"), CliVerb::Audit);
        assert_eq!(parse_cli_verb("--help"), CliVerb::Help);
        assert_eq!(parse_cli_verb("launch"), CliVerb::Unknown);
    }

    #[test]
    fn help_mentions_every_verb() {
        let help = help_text();
        for verb in ["setup", "ingest", "run", "approve", "reject", "status", "audit"] {
            assert!(help.contains(verb), "help missing verb {verb}");
        }
    }
}
