use crate::shared::ids::TaskId;
use crate::shared::serde_ext::classify_via_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Source/type tag set by the ingesting watcher. Classification happens once
/// at the ingest boundary; unrecognized values are carried as `Other` and
/// routed to the generic responder instead of failing the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    FacebookMessage,
    InstagramMessage,
    TwitterMention,
    LinkedinMessage,
    GmailMessage,
    WhatsappMessage,
    Other(String),
}

impl TaskKind {
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "facebook_message" => Self::FacebookMessage,
            "instagram_message" => Self::InstagramMessage,
            "twitter_mention" => Self::TwitterMention,
            "linkedin_message" => Self::LinkedinMessage,
            "gmail_message" => Self::GmailMessage,
            "whatsapp_message" => Self::WhatsappMessage,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::FacebookMessage => "facebook_message",
            Self::InstagramMessage => "instagram_message",
            Self::TwitterMention => "twitter_mention",
            Self::LinkedinMessage => "linkedin_message",
            Self::GmailMessage => "gmail_message",
            Self::WhatsappMessage => "whatsapp_message",
            Self::Other(raw) => raw.as_str(),
        };
        write!(f, "{label}")
    }
}

impl Serialize for TaskKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        classify_via_string(deserializer, TaskKind::classify)
    }
}

/// Classification label assigned by the watcher at creation time; immutable
/// thereafter. Unrecognized labels ingest as `General`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Keyword {
    Sales,
    Client,
    Project,
    #[default]
    General,
}

impl Keyword {
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sales" => Self::Sales,
            "client" => Self::Client,
            "project" => Self::Project,
            _ => Self::General,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Client => "client",
            Self::Project => "project",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<'de> Deserialize<'de> for Keyword {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        classify_via_string(deserializer, Keyword::classify)
    }
}

/// Informational only; does not affect processing order. Documented gap, not
/// an omission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err("priority must be one of: high, medium, low".to_string()),
        }
    }
}

/// Workflow stage recorded in the document; advances are driven by the stage
/// engine, never by hand-editing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Analysis,
    SkillExecution,
    HitlApproval,
    McpExecution,
    AuditLogging,
    Completion,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::SkillExecution => "skill_execution",
            Self::HitlApproval => "hitl_approval",
            Self::McpExecution => "mcp_execution",
            Self::AuditLogging => "audit_logging",
            Self::Completion => "completion",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completion)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub kind: TaskKind,
    #[serde(default)]
    pub keyword: Keyword,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDocument {
    pub id: TaskId,
    pub front: FrontMatter,
    pub body: String,
}

impl TaskDocument {
    pub fn parse(id: TaskId, raw: &str) -> Result<Self, String> {
        let (front, body) = split_front_matter(raw)?;
        Ok(Self { id, front, body })
    }

    pub fn render(&self) -> String {
        let yaml = serde_yaml::to_string(&self.front).unwrap_or_default();
        if self.body.is_empty() {
            format!("---\n{yaml}---\n")
        } else {
            format!("---\n{yaml}---\n\n{}", self.body)
        }
    }

    pub fn append_section(&mut self, text: &str) {
        if self.body.is_empty() {
            self.body = text.to_string();
        } else {
            self.body = format!("{}\n\n{}", self.body.trim_end(), text);
        }
    }
}

fn split_front_matter(raw: &str) -> Result<(FrontMatter, String), String> {
    let rest = raw
        .strip_prefix("---\n")
        .ok_or_else(|| "document must start with `---` front matter".to_string())?;
    let end = rest
        .find("\n---")
        .ok_or_else(|| "unterminated front matter block".to_string())?;
    let yaml = &rest[..end];
    let body = rest[end + 4..].trim_start_matches('\n').to_string();

    let front: FrontMatter = serde_yaml::from_str(yaml)
        .map_err(|err| format!("invalid front matter: {err}"))?;
    Ok((front, body))
}
